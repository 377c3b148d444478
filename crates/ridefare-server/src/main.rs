//! # ridefare-server
//!
//! HTTP server for ridefare trip fare estimates.
//!
//! This binary provides:
//! - REST API for estimates, direct fare calculation and the rate schedule
//! - OpenAPI document at `/api/openapi.json`
//! - Structured logging to file and stdout
//!
//! ## Running
//!
//! ```bash
//! # Development
//! cargo run --package ridefare-server
//!
//! # Production
//! RIDEFARE_ENV=production RIDEFARE_MAPS__API_KEY=... ./ridefare-server
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use anyhow::Context;
use ridefare_server::api::create_router;
use ridefare_server::logging;
use ridefare_server::state::AppState;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init(logging::is_production())?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting ridefare-server");

    let state = AppState::load(None)
        .context("failed to load configuration")?
        .shared();
    let listen_addr = state.config.server.listen_addr.clone();

    let app = create_router(state);

    let listener = TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("failed to bind {listen_addr}"))?;

    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
