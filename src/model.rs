use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::color::Lab;
use crate::palette::{PaletteError, TonePalette};
use crate::skin::{self, SkinError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Undertone {
    Warm,
    Cool,
    Neutral,
}

impl Undertone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Undertone::Warm => "warm",
            Undertone::Cool => "cool",
            Undertone::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Undertone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Skin colour features the undertone model is trained on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Features {
    pub lightness: f32,
    /// CIE Lab hue angle in degrees.
    pub hue: f32,
    pub chroma: f32,
}

impl From<&Lab> for Features {
    fn from(lab: &Lab) -> Self {
        Self {
            lightness: lab.l,
            hue: lab.hue_degrees(),
            chroma: lab.chroma(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UndertoneClass {
    pub label: Undertone,
    pub centroid: Features,
}

/// Serialized nearest-centroid classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UndertoneModel {
    #[serde(default)]
    pub name: Option<String>,
    pub weights: Features,
    pub classes: Vec<UndertoneClass>,
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read model file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse model file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("model defines no classes")]
    NoClasses,
    #[error("model defines class {0} more than once")]
    DuplicateClass(Undertone),
    #[error("model weights must be finite and non-negative")]
    InvalidWeights,
}

#[derive(Debug, Error)]
pub enum PredictError {
    #[error(transparent)]
    Skin(#[from] SkinError),
    #[error(transparent)]
    Palette(#[from] PaletteError),
    #[error("tone palette is empty")]
    EmptyPalette,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TonePrediction {
    pub tone_label: String,
    /// Palette colour of the predicted band.
    pub tone_color: String,
    /// Mean sampled skin colour.
    pub skin_color: String,
    /// `100 - deltaE` to the matched band, clamped to `[0, 100]`.
    pub accuracy: f32,
}

#[derive(Debug)]
pub struct UndertonePredictor {
    model: UndertoneModel,
}

impl UndertonePredictor {
    pub fn new(model_path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let raw = fs::read_to_string(model_path)?;
        let model: UndertoneModel = serde_json::from_str(&raw)?;
        Self::from_model(model)
    }

    pub fn from_model(model: UndertoneModel) -> Result<Self, ModelError> {
        if model.classes.is_empty() {
            return Err(ModelError::NoClasses);
        }

        let mut seen = HashSet::new();
        for class in &model.classes {
            if !seen.insert(class.label) {
                return Err(ModelError::DuplicateClass(class.label));
            }
        }

        let w = &model.weights;
        if [w.lightness, w.hue, w.chroma]
            .iter()
            .any(|v| !v.is_finite() || *v < 0.0)
        {
            return Err(ModelError::InvalidWeights);
        }

        Ok(Self { model })
    }

    pub fn model(&self) -> &UndertoneModel {
        &self.model
    }

    pub fn predict_undertone(&self, image_path: &Path) -> Result<Undertone, PredictError> {
        let image = skin::load_image(image_path)?;
        let sample = skin::skin_color(&image)?;
        let features = Features::from(&sample.color.to_lab());
        Ok(self.classify(&features))
    }

    pub fn predict_tone(
        &self,
        image_path: &Path,
        palette: &TonePalette,
    ) -> Result<TonePrediction, PredictError> {
        let image = skin::load_image(image_path)?;
        let sample = skin::skin_color(&image)?;
        let found = palette
            .nearest(&sample.color.to_lab())
            .ok_or(PredictError::EmptyPalette)?;
        tracing::debug!(
            skin = %sample.color.to_hex(),
            coverage = sample.coverage,
            tone = found.label,
            distance = found.distance,
            "tone matched"
        );

        let accuracy = (100.0 - found.distance).clamp(0.0, 100.0);
        Ok(TonePrediction {
            tone_label: found.label.to_string(),
            tone_color: found.color.to_hex(),
            skin_color: sample.color.to_hex(),
            accuracy: (accuracy * 100.0).round() / 100.0,
        })
    }

    /// Like [`predict_tone`](Self::predict_tone), for callers holding raw
    /// colour and label lists.
    pub fn predict_tone_with<C, L>(
        &self,
        image_path: &Path,
        palette: &[C],
        labels: &[L],
    ) -> Result<TonePrediction, PredictError>
    where
        C: AsRef<str>,
        L: AsRef<str>,
    {
        let palette = TonePalette::new(palette, labels)?;
        self.predict_tone(image_path, &palette)
    }

    pub fn classify(&self, features: &Features) -> Undertone {
        let w = &self.model.weights;
        let mut best = (self.model.classes[0].label, f32::INFINITY);
        for class in &self.model.classes {
            let c = &class.centroid;
            let distance = w.lightness * (features.lightness - c.lightness).powi(2)
                + w.hue * hue_difference(features.hue, c.hue).powi(2)
                + w.chroma * (features.chroma - c.chroma).powi(2);
            if distance < best.1 {
                best = (class.label, distance);
            }
        }
        best.0
    }
}

fn hue_difference(a: f32, b: f32) -> f32 {
    let d = (a - b).abs() % 360.0;
    d.min(360.0 - d)
}
