// src/main.rs
use anyhow::Result;
use health_aggregator::{
    checks::populate_registry,
    config,
    health::{HealthAggregator, Registry},
    metrics::MetricsRegistry,
    server::{HealthHandler, ServerBuilder},
};
use std::sync::Arc;
use tokio::signal;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("health_aggregator=debug".parse()?)
                .add_directive("hyper=info".parse()?),
        )
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.yaml".to_string());

    info!("Loading configuration from: {}", config_path);
    let config = config::load_config(&config_path).await?;

    // Populate the registry
    let registry = Arc::new(Registry::new());
    populate_registry(&registry, &config.components)?;
    info!(
        "Registered {} components with a {:?} check timeout",
        registry.len(),
        config.health.timeout()
    );

    let mut aggregator = HealthAggregator::new(registry, config.health.timeout());
    let mut handler_metrics = None;

    if config.metrics.enabled {
        let metrics = Arc::new(MetricsRegistry::new()?);
        aggregator = aggregator.with_metrics(metrics.collector());
        info!("Metrics exposed at {}", config.metrics.path);
        handler_metrics = Some(metrics);
    }

    let mut handler = HealthHandler::new(Arc::new(aggregator));
    if let Some(metrics) = handler_metrics {
        handler = handler.with_metrics(metrics, config.metrics.path.as_str());
    }

    ServerBuilder::new(config.server.listen_addr)
        .with_handler(handler)
        .serve_with_shutdown(shutdown_signal())
        .await?;

    info!("Health aggregator stopped");
    Ok(())
}

// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("Failed to install signal handler: {}", e);
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
