use crate::config::InferenceConfig;
use crate::detection::RawDetection;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::instrument;

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("failed to read image for inference: {0}")]
    ReadImage(#[from] std::io::Error),
    #[error("inference request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Unexpected result format")]
    UnexpectedFormat,
    #[error("malformed detection list: {0}")]
    MalformedDetections(#[from] serde_json::Error),
}

/// Seam to the remote detection model. Implemented over HTTP in production
/// and mocked in tests.
#[async_trait]
pub trait InferenceClient: Send + Sync + 'static {
    async fn infer(
        &self,
        image_path: &Path,
        model_id: &str,
    ) -> Result<Vec<RawDetection>, InferenceError>;
}

/// Talks to a hosted detection API: the image is POSTed as a multipart file
/// to `{base_url}/{model_id}` with the access key as a query parameter.
pub struct RemoteInferenceClient {
    base_url: String,
    api_key: String,
    client: Client,
}

impl RemoteInferenceClient {
    pub fn new(config: &InferenceConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            client,
        })
    }

    fn endpoint(&self, model_id: &str) -> String {
        format!("{}/{}", self.base_url, model_id)
    }
}

#[async_trait]
impl InferenceClient for RemoteInferenceClient {
    #[instrument(skip(self))]
    async fn infer(
        &self,
        image_path: &Path,
        model_id: &str,
    ) -> Result<Vec<RawDetection>, InferenceError> {
        let image = tokio::fs::read(image_path).await?;
        let file_name = image_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());

        let form = Form::new().part("file", Part::bytes(image).file_name(file_name));

        let response = self
            .client
            .post(self.endpoint(model_id))
            .query(&[("api_key", self.api_key.as_str())])
            .multipart(form)
            .send()
            .await?
            .error_for_status()?;

        let body: Value = response.json().await?;
        parse_predictions(body)
    }
}

/// Validates the remote payload. The top level must be an object; a missing
/// or non-array `predictions` key means no detections; array entries that
/// are not detection-shaped objects are rejected as a whole.
fn parse_predictions(body: Value) -> Result<Vec<RawDetection>, InferenceError> {
    let Value::Object(mut fields) = body else {
        return Err(InferenceError::UnexpectedFormat);
    };

    match fields.remove("predictions") {
        Some(list @ Value::Array(_)) => Ok(serde_json::from_value(list)?),
        _ => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelIds;
    use serde_json::json;

    fn test_config() -> InferenceConfig {
        InferenceConfig {
            base_url: "https://detect.example.com/".to_string(),
            api_key: "secret".to_string(),
            timeout_secs: 5,
            models: ModelIds {
                disease: "disease/1".to_string(),
                corn: "corn/1".to_string(),
            },
        }
    }

    #[test]
    fn endpoint_joins_base_url_and_model_id() {
        let client = RemoteInferenceClient::new(&test_config()).unwrap();
        assert_eq!(client.endpoint("maize-001/2"), "https://detect.example.com/maize-001/2");
    }

    #[test]
    fn parse_accepts_a_detection_list() {
        let body = json!({
            "predictions": [
                {"x": 100.0, "y": 100.0, "width": 40.0, "height": 20.0,
                 "class": "rust", "confidence": 0.87},
                {"x": 10.0, "y": 10.0, "width": 5.0,
                 "class": "smut", "confidence": 0.5},
            ]
        });

        let detections = parse_predictions(body).unwrap();
        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].class, "rust");
        // the second entry has no height; it parses but carries None
        assert!(detections[1].height.is_none());
    }

    #[test]
    fn parse_rejects_non_object_payloads() {
        for body in [json!([1, 2, 3]), json!("done"), json!(42)] {
            let err = parse_predictions(body).unwrap_err();
            assert!(matches!(err, InferenceError::UnexpectedFormat));
            assert_eq!(err.to_string(), "Unexpected result format");
        }
    }

    #[test]
    fn parse_treats_missing_or_non_list_predictions_as_empty() {
        assert!(parse_predictions(json!({})).unwrap().is_empty());
        assert!(parse_predictions(json!({"predictions": null})).unwrap().is_empty());
        assert!(parse_predictions(json!({"predictions": "nope"})).unwrap().is_empty());
    }

    #[test]
    fn parse_rejects_non_object_entries() {
        let err = parse_predictions(json!({"predictions": [42]})).unwrap_err();
        assert!(matches!(err, InferenceError::MalformedDetections(_)));
    }
}
