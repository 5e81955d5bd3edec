use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use image::ImageFormat;
use serde::Serialize;
use serde_json::{json, Value};
use tempfile::NamedTempFile;

use crate::error::ApiError;
use crate::model::{TonePrediction, Undertone, UndertonePredictor};
use crate::palette::TonePalette;
use crate::recommendation::{Recommendation, RecommendationTable};

const UPLOAD_FIELD: &str = "file";

/// Shared state handed to every request.
#[derive(Clone)]
pub struct AppState {
    predictor: Arc<UndertonePredictor>,
    palette: Arc<TonePalette>,
    recommendations: Arc<RecommendationTable>,
    upload_dir: Option<Arc<PathBuf>>,
    body_limit_bytes: usize,
}

impl AppState {
    pub fn new(predictor: UndertonePredictor, recommendations: RecommendationTable) -> Self {
        Self {
            predictor: Arc::new(predictor),
            palette: Arc::new(TonePalette::default()),
            recommendations: Arc::new(recommendations),
            upload_dir: None,
            body_limit_bytes: usize::MAX,
        }
    }

    pub fn with_palette(mut self, palette: TonePalette) -> Self {
        self.palette = Arc::new(palette);
        self
    }

    /// Per-request temp files go here instead of the system temp dir.
    pub fn with_upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.upload_dir = Some(Arc::new(dir.into()));
        self
    }

    fn temp_file(&self) -> std::io::Result<NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("upload-").suffix(".png");
        match self.upload_dir.as_deref() {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub undertone: Undertone,
    pub tone: TonePrediction,
    pub recommendations: Recommendation,
}

pub fn router(mut state: AppState, body_limit_bytes: usize) -> Router {
    state.body_limit_bytes = body_limit_bytes;
    Router::new()
        .route("/predict/", post(predict_handler))
        .route("/predict", post(predict_handler))
        .layer(DefaultBodyLimit::max(body_limit_bytes))
        .with_state(state)
        .route("/health", get(health_check))
}

#[tracing::instrument(skip_all)]
async fn predict_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let mut multipart =
        multipart.map_err(|rejection| ApiError::Unprocessable(rejection.body_text()))?;
    let image_data = read_upload(&mut multipart, state.body_limit_bytes).await?;

    tracing::info!(bytes = image_data.len(), "starting prediction");

    let worker = state.clone();
    let (undertone, tone) =
        tokio::task::spawn_blocking(move || run_prediction(&worker, &image_data))
            .await
            .map_err(|err| ApiError::Internal(err.to_string()))??;

    let recommendations = state
        .recommendations
        .get_recommendation(undertone, &tone.tone_label)
        .cloned()
        .ok_or_else(|| {
            ApiError::NotFound(format!(
                "No recommendation found for {} undertone and {} tone",
                undertone, tone.tone_label
            ))
        })?;

    tracing::info!(
        %undertone,
        tone = %tone.tone_label,
        accuracy = tone.accuracy,
        "prediction complete"
    );

    Ok(Json(PredictResponse {
        undertone,
        tone,
        recommendations,
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn read_upload(multipart: &mut Multipart, limit: usize) -> Result<Vec<u8>, ApiError> {
    loop {
        let field = multipart.next_field().await.map_err(|err| multipart_error(err, limit))?;
        let Some(field) = field else {
            return Err(ApiError::Unprocessable(format!(
                "multipart field {:?} is required",
                UPLOAD_FIELD
            )));
        };
        if field.name() == Some(UPLOAD_FIELD) {
            let bytes = field.bytes().await.map_err(|err| multipart_error(err, limit))?;
            return Ok(bytes.to_vec());
        }
    }
}

fn multipart_error(err: axum::extract::multipart::MultipartError, limit: usize) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(format!("request body exceeds {} bytes", limit))
    } else {
        ApiError::Unprocessable(err.body_text())
    }
}

/// Decodes the upload, writes it to a temp PNG and runs both predictors on
/// it. The temp file is removed on every path out of here.
fn run_prediction(
    state: &AppState,
    image_data: &[u8],
) -> Result<(Undertone, TonePrediction), ApiError> {
    let image = image::load_from_memory(image_data)?;
    let tmp = state.temp_file()?;
    let saved = image.save_with_format(tmp.path(), ImageFormat::Png);
    drop(image);

    let outcome = match saved {
        Ok(()) => predict_from_path(state, tmp.path()),
        Err(err) => Err(err.into()),
    };
    let removed = tmp.close();

    let prediction = outcome?;
    removed?;
    Ok(prediction)
}

fn predict_from_path(
    state: &AppState,
    path: &Path,
) -> Result<(Undertone, TonePrediction), ApiError> {
    let undertone = state.predictor.predict_undertone(path)?;
    let tone = state.predictor.predict_tone(path, &state.palette)?;
    Ok((undertone, tone))
}
