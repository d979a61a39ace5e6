use crate::config::Config;
use crate::inference::RemoteInferenceClient;
use crate::predictor::Predictor;
use crate::server::HttpServer;
use crate::storage::ImageStore;

use std::{error::Error, sync::Arc};
use tokio::{signal, sync::broadcast};

pub async fn start_app(config: Config) -> Result<(), Box<dyn Error>> {
    let store = Arc::new(ImageStore::new(&config.storage));
    if let Err(e) = store.ensure_dirs() {
        tracing::error!("Failed to prepare storage directories: {:?}", e);
        return Err(Box::new(e));
    }

    let inference_client = match RemoteInferenceClient::new(&config.inference) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            tracing::error!("Failed to initialize inference client: {:?}", e);
            return Err(Box::new(e));
        }
    };

    let predictor = Arc::new(Predictor::new(
        inference_client,
        store.clone(),
        config.inference.models.clone(),
    ));

    let server = HttpServer::new(predictor, store, &config).await?;

    let (shutdown_tx, _) = broadcast::channel(1);
    let server_shutdown_rx = shutdown_tx.subscribe();

    let server_handle = server.run(server_shutdown_rx).await?;

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown.");

    let _ = shutdown_tx.send(());
    let _ = server_handle.await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
