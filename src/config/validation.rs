//! Configuration validation.
//!
//! This module provides validation logic for configuration values,
//! ensuring they are within acceptable ranges.

use super::Config;
use crate::error::ConfigError;

/// Minimum allowed sampler period and send timeout in milliseconds (1 second).
pub const MIN_TIMEOUT_MS: u64 = 1000;

/// Maximum allowed sampler period and send timeout in milliseconds (5 minutes).
pub const MAX_TIMEOUT_MS: u64 = 300_000;

/// Maximum allowed history, alert log and response window size.
pub const MAX_HISTORY_CAPACITY: usize = 100_000;

/// Validate configuration values.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] if any value is out of range:
/// - `MONITOR_SAMPLE_INTERVAL_MS` must be between 1000 and 300000
/// - `MONITOR_HISTORY_CAPACITY` and `MONITOR_RESPONSE_WINDOW` must be between 1 and 100000
/// - Percent thresholds must be between 0 and 100
/// - `MONITOR_RESPONSE_TIME_THRESHOLD_MS` must be positive
/// - `NOTIFY_SEND_TIMEOUT_MS` must be between 1000 and 300000
#[must_use = "validation result should be checked"]
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    check_timeout("MONITOR_SAMPLE_INTERVAL_MS", config.sample_interval_ms)?;
    check_timeout(
        "NOTIFY_SEND_TIMEOUT_MS",
        config.notifications.send_timeout_ms,
    )?;

    check_capacity("MONITOR_HISTORY_CAPACITY", config.history_capacity)?;
    check_capacity("MONITOR_RESPONSE_WINDOW", config.response_window)?;

    let t = &config.thresholds;
    check_percent("MONITOR_CPU_THRESHOLD", t.cpu_percent)?;
    check_percent("MONITOR_MEMORY_THRESHOLD", t.memory_percent)?;
    check_percent("MONITOR_ERROR_RATE_THRESHOLD", t.error_rate_percent)?;

    if !t.response_time_ms.is_finite() || t.response_time_ms <= 0.0 {
        return Err(ConfigError::InvalidValue {
            var: "MONITOR_RESPONSE_TIME_THRESHOLD_MS".into(),
            reason: "must be a positive number of milliseconds".into(),
        });
    }

    Ok(())
}

fn check_timeout(var: &str, value: u64) -> Result<(), ConfigError> {
    if (MIN_TIMEOUT_MS..=MAX_TIMEOUT_MS).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            var: var.into(),
            reason: format!("must be between {MIN_TIMEOUT_MS} and {MAX_TIMEOUT_MS} ms"),
        })
    }
}

fn check_capacity(var: &str, value: usize) -> Result<(), ConfigError> {
    if (1..=MAX_HISTORY_CAPACITY).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            var: var.into(),
            reason: format!("must be between 1 and {MAX_HISTORY_CAPACITY}"),
        })
    }
}

fn check_percent(var: &str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            var: var.into(),
            reason: "must be between 0 and 100".into(),
        })
    }
}
