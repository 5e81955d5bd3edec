use std::collections::HashSet;

use thiserror::Error;

use crate::color::{delta_e, ColorError, Lab, Rgb};

pub const DEFAULT_TONE_PALETTE: [&str; 6] = [
    "#533023", "#6C4131", "#A36F48", "#BF8861", "#ECD0BA", "#F8E5D6",
];
pub const DEFAULT_TONE_LABELS: [&str; 6] = [
    "deep",
    "medium-deep",
    "medium",
    "light-medium",
    "light",
    "fair",
];

#[derive(Debug, Error, PartialEq)]
pub enum PaletteError {
    #[error("palette is empty")]
    Empty,
    #[error("palette has {colors} colours but {labels} labels")]
    LengthMismatch { colors: usize, labels: usize },
    #[error("duplicate tone label: {0}")]
    DuplicateLabel(String),
    #[error(transparent)]
    Color(#[from] ColorError),
}

#[derive(Debug, Clone)]
struct Swatch {
    label: String,
    color: Rgb,
    lab: Lab,
}

/// Tone bands ordered from deepest to fairest.
#[derive(Debug, Clone)]
pub struct TonePalette {
    swatches: Vec<Swatch>,
}

/// Closest palette entry for a sampled colour.
#[derive(Debug, Clone, PartialEq)]
pub struct ToneMatch<'a> {
    pub label: &'a str,
    pub color: Rgb,
    pub distance: f32,
}

impl TonePalette {
    pub fn new<C, L>(colors: &[C], labels: &[L]) -> Result<Self, PaletteError>
    where
        C: AsRef<str>,
        L: AsRef<str>,
    {
        if colors.len() != labels.len() {
            return Err(PaletteError::LengthMismatch {
                colors: colors.len(),
                labels: labels.len(),
            });
        }
        if colors.is_empty() {
            return Err(PaletteError::Empty);
        }

        let mut seen = HashSet::new();
        let mut swatches = Vec::with_capacity(colors.len());
        for (hex, label) in colors.iter().zip(labels) {
            let label: &str = label.as_ref();
            if !seen.insert(label) {
                return Err(PaletteError::DuplicateLabel(label.to_string()));
            }
            let color = Rgb::from_hex(hex.as_ref())?;
            swatches.push(Swatch {
                label: label.to_string(),
                color,
                lab: color.to_lab(),
            });
        }
        Ok(Self { swatches })
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.swatches.iter().map(|s| s.label.as_str())
    }

    pub fn len(&self) -> usize {
        self.swatches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.swatches.is_empty()
    }

    /// Ties go to the earlier (deeper) entry.
    pub fn nearest(&self, sample: &Lab) -> Option<ToneMatch<'_>> {
        let mut best: Option<ToneMatch<'_>> = None;
        for swatch in &self.swatches {
            let distance = delta_e(sample, &swatch.lab);
            if best.as_ref().map_or(true, |b| distance < b.distance) {
                best = Some(ToneMatch {
                    label: &swatch.label,
                    color: swatch.color,
                    distance,
                });
            }
        }
        best
    }
}

impl Default for TonePalette {
    fn default() -> Self {
        let swatches = DEFAULT_TONE_PALETTE
            .iter()
            .zip(DEFAULT_TONE_LABELS)
            .filter_map(|(hex, label)| {
                let color = Rgb::from_hex(hex).ok()?;
                Some(Swatch {
                    label: label.to_string(),
                    color,
                    lab: color.to_lab(),
                })
            })
            .collect::<Vec<_>>();
        debug_assert_eq!(swatches.len(), DEFAULT_TONE_PALETTE.len());
        Self { swatches }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_palette_has_six_ordered_bands() {
        let palette = TonePalette::default();
        assert_eq!(palette.len(), 6);
        assert_eq!(
            palette.labels().collect::<Vec<_>>(),
            DEFAULT_TONE_LABELS.to_vec()
        );
    }

    #[test]
    fn exact_palette_colour_matches_its_label() {
        let palette = TonePalette::default();
        for (hex, label) in DEFAULT_TONE_PALETTE.iter().zip(DEFAULT_TONE_LABELS) {
            let lab = Rgb::from_hex(hex).unwrap().to_lab();
            let found = palette.nearest(&lab).unwrap();
            assert_eq!(found.label, label);
            assert_eq!(found.distance, 0.0);
            assert_eq!(found.color.to_hex(), *hex);
        }
    }

    #[test]
    fn near_colour_snaps_to_closest_band() {
        let palette = TonePalette::default();
        let lab = Rgb::new(0xA0, 0x70, 0x4A).to_lab();
        assert_eq!(palette.nearest(&lab).unwrap().label, "medium");
    }

    #[test]
    fn ties_resolve_to_deeper_entry() {
        let palette = TonePalette::new(&["#000000", "#000000"], &["deeper", "fairer"]).unwrap();
        let lab = Rgb::new(0, 0, 0).to_lab();
        assert_eq!(palette.nearest(&lab).unwrap().label, "deeper");
    }

    #[test]
    fn rejects_bad_palettes() {
        assert_eq!(
            TonePalette::new(&["#000000"], &["a", "b"]).unwrap_err(),
            PaletteError::LengthMismatch {
                colors: 1,
                labels: 2
            }
        );
        assert_eq!(
            TonePalette::new::<&str, &str>(&[], &[]).unwrap_err(),
            PaletteError::Empty
        );
        assert_eq!(
            TonePalette::new(&["#000000", "#FFFFFF"], &["a", "a"]).unwrap_err(),
            PaletteError::DuplicateLabel("a".into())
        );
        assert!(matches!(
            TonePalette::new(&["nope"], &["a"]).unwrap_err(),
            PaletteError::Color(_)
        ));
    }
}
