// crates/server/src/main.rs
//! stemsplit server binary.
//!
//! Resolves configuration (flags > env > TOML > defaults), installs logging
//! and metrics, checks that the separation tool starts, then serves until
//! Ctrl-C or SIGTERM.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;
use stemsplit_core::{DemucsCli, ServiceConfig};
use stemsplit_server::cli::Cli;
use stemsplit_server::{create_app, init_metrics, AppState};
use tokio::signal;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ServiceConfig::load(cli.config.as_deref()).context("Failed to load config")?;
    cli.apply(&mut config);

    // Held until exit so buffered file logs are flushed.
    let _log_guard = stemsplit_observability::init_tracing(&config.logging)?;

    init_metrics();

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "Invalid listen address {}:{}",
                config.server.host, config.server.port
            )
        })?;

    // A missing tool is not fatal: requests fail with a clear error instead.
    let demucs = DemucsCli::new(config.tool.clone());
    match demucs.probe().await {
        Ok(()) => tracing::info!(program = %config.tool.program, "Separation tool available"),
        Err(e) => tracing::warn!(
            program = %config.tool.program,
            error = %e,
            "Separation tool probe failed; separations will fail until it is installed"
        ),
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        model = %config.tool.default_model,
        max_subscribers = config.server.max_subscribers,
        "Starting stemsplit"
    );

    let state = AppState::new(config);
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received terminate signal, shutting down"),
    }
}
