//! Pulsewatch binary entry point.
//!
//! Samples the host on a fixed period, logs every alert and forwards error
//! and critical alerts to the configured notification channels until
//! interrupted. All logs go to stderr.
//!
//! Coverage is excluded because the main function only wires components
//! together and waits for a signal.

// Enable the coverage attribute when running with nightly for llvm-cov exclusions
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

use std::sync::Arc;

use pulsewatch::config::{Config, LogFormat};
use pulsewatch::error::AppError;
use pulsewatch::events::{EventKind, MonitorEvent};
use pulsewatch::host::SysinfoProvider;
use pulsewatch::service::MonitoringService;
use tracing_subscriber::filter::EnvFilter;

fn init_logging(level: &str, format: LogFormat) {
    let filter = level
        .parse()
        .unwrap_or_else(|_| EnvFilter::new(pulsewatch::config::DEFAULT_LOG_LEVEL));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[tokio::main]
async fn main() {
    // Configuration errors are reported before logging is configured.
    let config = match Config::from_env().map_err(AppError::from) {
        Ok(config) => config,
        Err(e) => {
            init_logging(pulsewatch::config::DEFAULT_LOG_LEVEL, LogFormat::Text);
            tracing::error!("{e}");
            std::process::exit(1);
        }
    };
    init_logging(&config.log_level, config.log_format);

    tracing::info!(
        sample_interval_ms = config.sample_interval_ms,
        alert_cooldown_ms = config.alert_cooldown_ms,
        history_capacity = config.history_capacity,
        "pulsewatch starting..."
    );

    let service = MonitoringService::new(&config, Arc::new(SysinfoProvider::new()));

    service.subscribe(
        EventKind::Metrics,
        Arc::new(|event: &MonitorEvent| {
            if let MonitorEvent::Metrics(snapshot) = event {
                tracing::debug!(
                    cpu = snapshot.cpu.usage_percent,
                    memory = snapshot.memory.percent_used,
                    requests = snapshot.requests.total,
                    "Metrics"
                );
            }
        }),
    );

    if config.notifications.any_enabled() {
        service.configure_notifications(&config.notifications).await;
    } else {
        tracing::info!("No notification channels enabled");
    }

    service.start();
    // First reading so health is meaningful before the first period elapses.
    service.tick();

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }

    service.shutdown().await;
    let health = service.health();
    tracing::info!(status = %health.status, "pulsewatch shutdown complete");
}
