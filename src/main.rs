//! Iris serving binary
//!
//! Loads the served model, then runs the HTTP API until SIGINT/SIGTERM.
//! In-flight requests finish before the process exits.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use iris_serving::{config, create_router, model::FsRegistry, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before anything reads the environment
    dotenvy::dotenv().ok();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "iris_serving=debug,tower_http=debug".into());
    if config::json_logs_requested() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // Load configuration
    let config = config::Config::from_env().context("Invalid configuration")?;

    tracing::info!("Iris serving API starting...");
    tracing::info!(
        "Registry: {} (model '{}')",
        config.registry_dir.display(),
        config.model_name
    );

    let bind = (config.host.clone(), config.port);

    // Build application state
    let registry = Arc::new(FsRegistry::new(config.registry_dir.clone()));
    let state = AppState::new(config, registry).context("Failed to register metrics")?;

    match state.load_initial_model() {
        Ok(info) => tracing::info!("Serving model '{}' version {}", info.model_name, info.version),
        Err(e) => {
            // Not ready until an operator promotes a version and reloads
            tracing::error!("Error loading model, starting not-ready: {}", e);
        }
    }

    // Build router
    let app = create_router(state.clone());

    // Start server
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {}:{}", bind.0, bind.1))?;
    tracing::info!("🚀 Server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Cleanup on shutdown
    state.unload();
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining in-flight requests");
}
