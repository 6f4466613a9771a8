//! OpenCC server library.
//!
//! Assembles the `/v1/messages` and `/v1/models` router from `llm` with the health and
//! catch-all endpoints this binary exposes, and drives the listener.

#![deny(missing_docs)]

mod error;
mod health;
mod logger;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::anyhow;
use axum::routing::any;
use axum::Router;
use config::Config;
use llm::AppState;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub use error::Error;

/// Configuration for serving OpenCC.
pub struct ServeConfig {
    /// The socket address (IP and port) the server will bind to.
    pub listen_address: SocketAddr,
    /// The deserialized OpenCC TOML configuration.
    pub config: Config,
    /// Cancellation token for graceful shutdown.
    pub shutdown_signal: CancellationToken,
    /// Log filter string (e.g. `"info"` or `"server=debug,llm=debug"`).
    pub log_filter: String,
    /// The version string to log on startup.
    pub version: String,
    /// Optional oneshot sender to send back the bound address (useful if port 0 was specified).
    pub bound_addr_sender: Option<tokio::sync::oneshot::Sender<SocketAddr>>,
}

/// Starts and runs the OpenCC server with the provided configuration.
pub async fn serve(
    ServeConfig {
        listen_address,
        config,
        shutdown_signal,
        log_filter,
        version,
        bound_addr_sender,
    }: ServeConfig,
) -> anyhow::Result<()> {
    logger::init(&log_filter);
    log::info!("OpenCC {version}");

    let health_config = config.server.health.clone();
    let state = Arc::new(AppState::new(config)?);

    let mut app = llm::router(state.clone()).route("/", any(catch_all));

    if health_config.enabled {
        app = app.merge(health::router(state, &health_config.path));
    }

    let listener = TcpListener::bind(listen_address)
        .await
        .map_err(|e| anyhow!("failed to bind to {listen_address}: {e}"))?;

    if let Some(sender) = bound_addr_sender {
        sender
            .send(listener.local_addr()?)
            .expect("failed to send back bound address");
    }

    log::info!("listening on http://{listen_address}");

    tokio::select! {
        result = axum::serve(listener, app.into_make_service()) => {
            result.map_err(|e| anyhow!("server error: {e}"))?;
        }
        _ = shutdown_signal.cancelled() => {
            log::info!("received shutdown signal, shutting down gracefully...");
        }
    }

    Ok(())
}

async fn catch_all() -> &'static str {
    "OpenCC"
}
