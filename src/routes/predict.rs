use crate::{
    detection::DetectionMode, predictor::PredictorError, server::SharedState,
    storage::StorageError,
};
use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde_json::json;
use std::time::Instant;
use thiserror::Error;
use tracing::instrument;

#[derive(Error, Debug)]
pub enum PredictError {
    #[error("No image uploaded")]
    MissingImage,
    #[error("invalid multipart body: {0}")]
    Multipart(#[from] MultipartError),
    #[error(transparent)]
    Predictor(#[from] PredictorError),
}

impl PredictError {
    fn status(&self) -> StatusCode {
        match self {
            PredictError::MissingImage => StatusCode::BAD_REQUEST,
            PredictError::Multipart(_) => StatusCode::BAD_REQUEST,
            PredictError::Predictor(PredictorError::Storage(StorageError::InvalidFilename)) => {
                StatusCode::BAD_REQUEST
            }
            PredictError::Predictor(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PredictError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("predict failed: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[instrument(skip(state, multipart))]
pub async fn predict(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<Response, PredictError> {
    state.metrics.record_request("/predict");
    let started = Instant::now();

    let mut mode = DetectionMode::default();
    let mut image: Option<(String, Bytes)> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "mode" => mode = DetectionMode::parse(&field.text().await?),
            "image" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await?;
                if !file_name.is_empty() {
                    image = Some((file_name, data));
                }
            }
            _ => {}
        }
    }

    let (file_name, data) = image.ok_or(PredictError::MissingImage)?;

    let payload = state.predictor.handle_predict(mode, &file_name, &data).await?;

    state
        .metrics
        .record_prediction_duration(started.elapsed().as_millis() as u64, "/predict");
    state
        .metrics
        .record_detections(payload.predictions.len() as u64, payload.mode.as_str());

    Ok(Json(payload).into_response())
}
