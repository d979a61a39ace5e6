mod health;
mod metrics;
mod pages;
mod predict;
mod result_image;

use crate::server::SharedState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        .route("/", get(pages::index))
        .route("/about", get(pages::about))
        .route("/contact", get(pages::contact))
        .route("/feedback", get(pages::feedback))
        .route("/predict", post(predict::predict))
        .route("/result-image/{filename}", get(result_image::result_image))
        .route("/health", get(health::healthcheck))
        .route("/metrics", get(metrics::metrics_handler))
}
