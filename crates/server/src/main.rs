//! Performance suite backend
//!
//! Runs performance tests one at a time, judges them against the SLA, and
//! serves resource right-sizing recommendations over a REST API.

use anyhow::Result;
use perf_suite_server::{api, config::SuiteConfig};
use std::sync::Arc;
use std::time::Duration;
use suite_lib::{
    health::{components, HealthRegistry},
    InMemorySampleStore, RecommendationEngine, RunOrchestrator, StructuredLogger,
};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SUITE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting perf-suite");

    let config = SuiteConfig::load()?;
    info!(
        api_port = config.api_port,
        max_p95_latency_ms = config.sla.max_p95_latency_ms,
        max_failure_rate_percent = config.sla.max_failure_rate_percent,
        "Suite configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register_all().await;

    let logger = StructuredLogger::new(&config.service_name);
    logger.log_startup(SUITE_VERSION);

    let store = Arc::new(InMemorySampleStore::with_persistence(config.store_config())?);

    let orchestrator = Arc::new(
        RunOrchestrator::new(store.clone(), config.orchestrator_config())
            .with_health(health_registry.clone())
            .with_logger(logger.clone()),
    );
    let recommender = Arc::new(
        RecommendationEngine::new(
            store.clone(),
            config.recommendation.clone(),
            config.retry.clone(),
        )
        .with_health(health_registry.clone())
        .with_logger(logger.clone()),
    );

    let app_state = Arc::new(
        api::AppState::new(health_registry.clone(), orchestrator, recommender)
            .with_service_name(&config.service_name)
            .with_auto_stop(config.auto_stop_runs)
            .with_cors(config.enable_cors),
    );

    // Background eviction and persistence
    let maintenance_handle = tokio::spawn(maintain_store(
        store.clone(),
        config.flush_interval(),
        health_registry.clone(),
    ));

    health_registry.set_ready(true).await;

    let mut api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            logger.log_shutdown("SIGINT received");
        }
        result = &mut api_handle => {
            match result {
                Ok(Ok(())) => logger.log_shutdown("API server exited"),
                Ok(Err(e)) => error!(error = %e, "API server failed"),
                Err(e) => error!(error = %e, "API server task panicked"),
            }
        }
    }

    health_registry.set_ready(false).await;
    maintenance_handle.abort();
    api_handle.abort();

    if let Err(e) = store.flush() {
        warn!(error = %e, "Final flush of utilization samples failed");
    }

    info!("Shutting down");
    Ok(())
}

/// Evict expired samples and flush to disk on a fixed interval
async fn maintain_store(store: Arc<InMemorySampleStore>, every: Duration, health: HealthRegistry) {
    let mut ticker = tokio::time::interval(every);
    ticker.tick().await;

    loop {
        ticker.tick().await;

        let evicted = store.evict_expired();
        match store.flush() {
            Ok(()) => {
                let stats = store.stats();
                info!(
                    evicted,
                    containers = stats.containers,
                    utilization_samples = stats.utilization_samples,
                    runs = stats.runs,
                    "Sample store maintenance complete"
                );
                health.record_storage_result(&Ok::<(), _>(())).await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to flush utilization samples");
                health
                    .set_degraded(components::SAMPLE_STORE, e.to_string())
                    .await;
            }
        }
    }
}
