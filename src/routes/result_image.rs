use crate::{server::SharedState, storage::StorageError};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::instrument;

#[derive(Error, Debug)]
pub enum ResultImageError {
    #[error("no result image named {0}")]
    NotFound(String),
    #[error("failed to read result image: {0}")]
    Storage(StorageError),
    #[error("HTTP builder failed: {0}")]
    HttpBuilder(String),
}

impl IntoResponse for ResultImageError {
    fn into_response(self) -> Response {
        let status = match self {
            ResultImageError::NotFound(_) => StatusCode::NOT_FOUND,
            ResultImageError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ResultImageError::HttpBuilder(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[instrument(skip(state))]
pub async fn result_image(
    State(state): State<SharedState>,
    Path(filename): Path<String>,
) -> Result<Response, ResultImageError> {
    state.metrics.record_request("/result-image");

    let bytes = state.store.read_output(&filename).await.map_err(|err| match err {
        StorageError::NotFound(_) | StorageError::InvalidFilename => {
            ResultImageError::NotFound(filename.clone())
        }
        other => ResultImageError::Storage(other),
    })?;

    let response = Response::builder()
        .header(header::CONTENT_TYPE, content_type_for(&filename))
        .body(Body::from(bytes))
        .map_err(|e| ResultImageError::HttpBuilder(e.to_string()))?;

    Ok(response)
}

fn content_type_for(filename: &str) -> &'static str {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_follows_the_extension() {
        assert_eq!(content_type_for("leaf.jpg"), "image/jpeg");
        assert_eq!(content_type_for("leaf.JPEG"), "image/jpeg");
        assert_eq!(content_type_for("leaf.png"), "image/png");
        assert_eq!(content_type_for("leaf"), "application/octet-stream");
    }

    #[test]
    fn missing_images_map_to_not_found() {
        let response = ResultImageError::NotFound("leaf.jpg".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
