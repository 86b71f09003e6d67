//! Threshold alerting and health classification.
//!
//! This module provides:
//! - [`Alert`] and its [`AlertCategory`] / [`Severity`] / [`SnapshotExcerpt`] parts
//! - [`AlertEngine`]: threshold evaluation with a per-category cooldown and a bounded alert log
//! - [`classify_health`]: a pure health classification over a snapshot and recent alerts

mod engine;
mod health;

pub use engine::{evaluate_rules, AlertEngine, DEFAULT_ALERT_COOLDOWN};
pub use health::{
    classify_health, HealthReport, HealthStatus, CRITICAL_ALERT_WINDOW, RECENT_ALERTS_IN_REPORT,
};

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::metrics::{CpuStats, MemoryStats, RequestStats, SystemSnapshot};

/// Default number of alerts returned by a query.
pub const DEFAULT_ALERT_LIMIT: usize = 100;

/// What an alert is about. Each category has its own cooldown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlertCategory {
    /// Host CPU usage.
    Cpu,
    /// Host memory usage.
    Memory,
    /// Failed request ratio.
    ErrorRate,
    /// Mean response time.
    ResponseTime,
}

impl AlertCategory {
    /// All categories in rule evaluation order.
    pub const ALL: [Self; 4] = [Self::Cpu, Self::Memory, Self::ErrorRate, Self::ResponseTime];

    /// Wire name of the category.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Memory => "memory",
            Self::ErrorRate => "error-rate",
            Self::ResponseTime => "response-time",
        }
    }
}

impl fmt::Display for AlertCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alert severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational.
    Info,
    /// Needs attention.
    Warning,
    /// Something is failing.
    Error,
    /// Immediate action required.
    Critical,
}

impl Severity {
    /// Wire name of the severity.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The part of a snapshot attached to an alert.
///
/// Every section is optional so renderers handle excerpts built from partial data.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SnapshotExcerpt {
    /// CPU readings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<CpuStats>,
    /// Memory readings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemoryStats>,
    /// Request counters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests: Option<RequestStats>,
}

impl SnapshotExcerpt {
    /// Excerpt holding the cpu, memory and request sections of `snapshot`.
    #[must_use]
    pub const fn from_snapshot(snapshot: &SystemSnapshot) -> Self {
        Self {
            cpu: Some(snapshot.cpu),
            memory: Some(snapshot.memory),
            requests: Some(snapshot.requests),
        }
    }
}

/// A raised alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Unique alert id.
    pub id: Uuid,
    /// What the alert is about.
    pub category: AlertCategory,
    /// How severe it is.
    pub severity: Severity,
    /// Human-readable message including the offending value.
    pub message: String,
    /// When the alert was raised.
    pub timestamp: DateTime<Utc>,
    /// Metrics at the time the alert was raised.
    pub snapshot_excerpt: SnapshotExcerpt,
}

impl Alert {
    /// Create an alert with a fresh id.
    #[must_use]
    pub fn new(
        category: AlertCategory,
        severity: Severity,
        message: impl Into<String>,
        timestamp: DateTime<Utc>,
        snapshot_excerpt: SnapshotExcerpt,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            category,
            severity,
            message: message.into(),
            timestamp,
            snapshot_excerpt,
        }
    }
}

/// Rule thresholds. An alert fires when a value is strictly greater than its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertThresholds {
    /// CPU usage percent.
    pub cpu_percent: f64,
    /// Memory usage percent.
    pub memory_percent: f64,
    /// Failed request percent.
    pub error_rate_percent: f64,
    /// Mean response time in milliseconds.
    pub response_time_ms: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            cpu_percent: 80.0,
            memory_percent: 90.0,
            error_rate_percent: 10.0,
            response_time_ms: 2000.0,
        }
    }
}

/// Alert log query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertQuery {
    /// Maximum number of alerts returned (most recent kept).
    pub limit: usize,
    /// Only alerts of this category.
    pub category: Option<AlertCategory>,
    /// Only alerts of this severity.
    pub severity: Option<Severity>,
}

impl AlertQuery {
    /// Query for the most recent `limit` alerts.
    #[must_use]
    pub const fn recent(limit: usize) -> Self {
        Self {
            limit,
            category: None,
            severity: None,
        }
    }

    /// Restrict to one category.
    #[must_use]
    pub const fn with_category(mut self, category: AlertCategory) -> Self {
        self.category = Some(category);
        self
    }

    /// Restrict to one severity.
    #[must_use]
    pub const fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    /// Whether `alert` passes the category and severity filters.
    #[must_use]
    pub fn matches(&self, alert: &Alert) -> bool {
        self.category.is_none_or(|c| c == alert.category)
            && self.severity.is_none_or(|s| s == alert.severity)
    }
}

impl Default for AlertQuery {
    fn default() -> Self {
        Self::recent(DEFAULT_ALERT_LIMIT)
    }
}
