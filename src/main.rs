//! Heart Disease Prediction API - Main Entry Point
//!
//! Loads the classifier in the background and serves predictions over HTTP.
//! Health reports unhealthy until the model is ready.

use anyhow::{Context, Result};
use heart_disease_api::{
    api,
    config::{AppConfig, LogFormat},
    metrics::{MetricsReporter, ServiceMetrics},
    models::handle::ModelHandle,
    service::ServiceFacade,
};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing(config: &AppConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("warn")
            .add_directive(format!("heart_disease_api={}", config.logging.level).parse()?),
    };

    match config.logging.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(false)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(filter)
            .init(),
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;
    init_tracing(&config)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting Heart Disease Prediction API");
    info!(
        model_path = %config.model.path.display(),
        host = %config.server.host,
        port = config.server.port,
        sessions = config.model.session_pool_size,
        "Configuration loaded successfully"
    );

    // Initialize metrics
    let metrics = Arc::new(ServiceMetrics::new()?);

    let handle = Arc::new(ModelHandle::new(
        config.model.path.clone(),
        config.model.features()?,
    ));
    let facade = Arc::new(ServiceFacade::new(handle, Arc::clone(&metrics))?);

    // Load the model off the async runtime; requests are served meanwhile
    let loader = Arc::clone(&facade);
    let model_config = config.model.clone();
    tokio::task::spawn_blocking(move || {
        let state = loader.load_model(&model_config);
        info!(state = %state, "Model load finished");
    });

    // Start metrics reporter
    if config.metrics.report_interval_secs > 0 {
        let reporter = MetricsReporter::new(Arc::clone(&metrics), config.metrics.report_interval_secs);
        tokio::spawn(reporter.start());
    } else {
        warn!("Periodic metrics summary disabled");
    }

    let addr = config.server.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(address = %addr, "HTTP server listening");

    axum::serve(listener, api::router(facade))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    // Print final summary
    info!("Service shutting down...");
    metrics.print_summary();

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
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

    info!("Shutdown signal received");
}
