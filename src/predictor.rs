use crate::annotate::{AnnotateError, CvImage};
use crate::config::ModelIds;
use crate::detection::{AnnotatedPrediction, Detection, DetectionMode, PredictResponse};
use crate::inference::{InferenceClient, InferenceError};
use crate::storage::{ImageStore, StorageError};
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

#[derive(Error, Debug)]
pub enum PredictorError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
    #[error(transparent)]
    Annotate(#[from] AnnotateError),
}

/// The predict flow: store the upload, delegate to the remote model,
/// annotate, persist the result, answer with the normalized predictions.
pub struct Predictor {
    client: Arc<dyn InferenceClient>,
    store: Arc<ImageStore>,
    models: ModelIds,
}

impl Predictor {
    pub fn new(client: Arc<dyn InferenceClient>, store: Arc<ImageStore>, models: ModelIds) -> Self {
        Self {
            client,
            store,
            models,
        }
    }

    #[instrument(skip(self, data))]
    pub async fn handle_predict(
        &self,
        mode: DetectionMode,
        filename: &str,
        data: &[u8],
    ) -> Result<PredictResponse, PredictorError> {
        // The guard removes the stored upload on every exit path below.
        let upload = self.store.save_upload(filename, data).await?;

        let model_id = match mode {
            DetectionMode::Corn => &self.models.corn,
            DetectionMode::Disease => &self.models.disease,
        };

        let raw = self.client.infer(upload.path(), model_id).await?;
        let detections: Vec<Detection> = raw.iter().filter_map(Detection::from_raw).collect();
        tracing::debug!(
            "kept {} of {} detections from model {}",
            detections.len(),
            raw.len(),
            model_id
        );

        let mut image = CvImage::open(upload.path())?;
        image.annotate(&detections)?;
        image.save(&self.store.output_path(upload.file_name()))?;

        Ok(PredictResponse {
            mode,
            count: mode.is_corn().then_some(detections.len()),
            predictions: detections.iter().map(AnnotatedPrediction::from).collect(),
            image_url: format!("/result-image/{}", upload.file_name()),
        })
    }
}
