//! Brain Tumor Detection - Main Entry Point
//!
//! Serves scan classification, prediction history and statistics over HTTP.

use anyhow::{Context, Result};
use brain_tumor_detection::{
    api::{construct_router, AppState},
    config::AppConfig,
    metrics::MetricsReporter,
    service::ClassificationService,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;

    // Initialize logging
    let filter = EnvFilter::from_default_env().add_directive(
        format!("brain_tumor_detection={}", config.logging.level)
            .parse()
            .context("Invalid logging.level")?,
    );
    if config.logging.format == "json" {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!("Starting Brain Tumor Detection service");
    info!(
        model = %config.models.model_path,
        classes = %config.models.classes_path,
        workers = config.pipeline.workers,
        "Configuration loaded"
    );

    let service = Arc::new(ClassificationService::from_config(&config).await?);

    // A failed load here is retried on the next request
    if let Err(e) = service.warm_up().await {
        warn!(error = %e, "Model not loaded at startup");
    }

    if config.pipeline.metrics_interval_secs > 0 {
        let reporter = MetricsReporter::new(service.metrics(), config.pipeline.metrics_interval_secs);
        tokio::spawn(reporter.start());
    }

    let app = construct_router(AppState::new(service.clone()), &config.server);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    info!("Service shutting down...");
    service.metrics().print_summary();

    Ok(())
}
