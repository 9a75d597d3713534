pub mod adapters;
pub mod app;
pub mod config;
pub mod logging;
pub mod ports;
pub mod push;
pub mod state;
pub mod store;
pub mod types;

#[cfg(test)]
mod test_support;

pub use app::app;

use adapters::{ApnsGateway, GatewayError, SystemTimeProvider};
use push::{Relay, WebhookValidator};
use store::{FileStore, StoreError};

use std::net::SocketAddr;

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("failed to open store: {0}")]
    Store(#[from] StoreError),
    #[error("failed to build gateway client: {0}")]
    Gateway(#[from] GatewayError),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Server(std::io::Error),
}

pub async fn serve(config: config::AppConfig) -> Result<(), ServeError> {
    let time = SystemTimeProvider;
    let store = FileStore::open(&config.store_path, time).await?;
    let gateway = ApnsGateway::new()?;
    let relay = Relay::from_config(&config, store.clone(), gateway, time);
    let validator = WebhookValidator::new(
        config.sender_agents.clone(),
        config.registration_agent.clone(),
    );
    let state = state::AppState::new(relay, validator);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .map_err(|source| ServeError::Bind {
            addr: config.addr,
            source,
        })?;
    tracing::info!(
        addr = %config.addr,
        store = %store.path().display(),
        "listening"
    );

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServeError::Server)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
