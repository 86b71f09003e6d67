//! Health classification.

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::{Alert, Severity};
use crate::metrics::{CpuStats, MemoryStats, RequestStats, SystemSnapshot};

/// How far back a critical alert keeps the system classified as critical.
pub const CRITICAL_ALERT_WINDOW: TimeDelta = TimeDelta::hours(1);

/// Number of alerts included in a [`HealthReport`].
pub const RECENT_ALERTS_IN_REPORT: usize = 10;

const CRITICAL_CPU_PERCENT: f64 = 90.0;
const CRITICAL_MEMORY_PERCENT: f64 = 95.0;
const DEGRADED_CPU_PERCENT: f64 = 70.0;
const DEGRADED_MEMORY_PERCENT: f64 = 80.0;
const DEGRADED_RESPONSE_TIME_MS: f64 = 1000.0;

/// Overall system health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Everything nominal.
    Healthy,
    /// Elevated load or latency.
    Degraded,
    /// Critical load or a recent critical alert.
    Critical,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded => write!(f, "degraded"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Classify health from the current snapshot and logged alerts.
///
/// `critical` if any critical alert is no older than one hour, or cpu > 90%,
/// or memory > 95%. Otherwise `degraded` if cpu > 70%, memory > 80% or the mean
/// response time exceeds 1000ms. Otherwise `healthy`.
#[must_use]
pub fn classify_health(
    snapshot: &SystemSnapshot,
    alerts: &[Alert],
    now: DateTime<Utc>,
) -> HealthStatus {
    let window_start = now - CRITICAL_ALERT_WINDOW;
    let recent_critical = alerts
        .iter()
        .any(|a| a.severity == Severity::Critical && a.timestamp >= window_start);

    let cpu = snapshot.cpu.usage_percent;
    let memory = snapshot.memory.percent_used;

    if recent_critical || cpu > CRITICAL_CPU_PERCENT || memory > CRITICAL_MEMORY_PERCENT {
        HealthStatus::Critical
    } else if cpu > DEGRADED_CPU_PERCENT
        || memory > DEGRADED_MEMORY_PERCENT
        || snapshot.requests.avg_response_time_ms > DEGRADED_RESPONSE_TIME_MS
    {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    }
}

/// Health summary for status endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    /// Classified status.
    pub status: HealthStatus,
    /// When the report was produced.
    pub timestamp: DateTime<Utc>,
    /// Current CPU readings.
    pub cpu: CpuStats,
    /// Current memory readings.
    pub memory: MemoryStats,
    /// Current request counters.
    pub requests: RequestStats,
    /// The most recent alerts, oldest first.
    pub recent_alerts: Vec<Alert>,
}

impl HealthReport {
    /// Build a report from the current snapshot and the alert log.
    #[must_use]
    pub fn new(snapshot: &SystemSnapshot, alerts: &[Alert], now: DateTime<Utc>) -> Self {
        let skip = alerts.len().saturating_sub(RECENT_ALERTS_IN_REPORT);
        Self {
            status: classify_health(snapshot, alerts, now),
            timestamp: now,
            cpu: snapshot.cpu,
            memory: snapshot.memory,
            requests: snapshot.requests,
            recent_alerts: alerts[skip..].to_vec(),
        }
    }
}
