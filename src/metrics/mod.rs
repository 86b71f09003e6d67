//! Metrics collection.
//!
//! This module provides:
//! - The [`SystemSnapshot`] value type and its cpu/memory/process/request parts
//! - [`RequestTracker`]: request outcome counters and a rolling response-time window
//! - [`MetricsCollector`]: the authoritative current snapshot and its bounded history
//! - [`BoundedLog`]: the fixed-capacity ring buffer used for history and alerts
//!
//! # Example
//!
//! ```
//! use pulsewatch::metrics::RequestTracker;
//!
//! let mut tracker = RequestTracker::new(1000);
//! tracker.record(120.0, 200);
//! tracker.record(80.0, 201);
//! tracker.record(400.0, 503);
//!
//! let stats = tracker.snapshot();
//! assert_eq!(stats.total, 3);
//! assert_eq!(stats.successful, 2);
//! assert_eq!(stats.failed, 1);
//! assert!((stats.avg_response_time_ms - 200.0).abs() < f64::EPSILON);
//! ```

// Allow intentional numeric casts for metrics calculations
#![allow(clippy::cast_precision_loss)]

mod bounded;
mod collector;
mod tracker;

pub use bounded::BoundedLog;
pub use collector::{HistoryQuery, MetricsCollector, DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT};
pub use tracker::{is_success, RequestTracker};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default number of snapshots kept in history (and alerts kept in the alert log).
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

/// Default number of response-time samples kept by the request tracker.
pub const DEFAULT_RESPONSE_WINDOW: usize = 1000;

/// CPU readings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct CpuStats {
    /// Global CPU usage in percent (0-100).
    pub usage_percent: f64,
    /// 1, 5 and 15 minute load averages.
    pub load_average: [f64; 3],
}

/// Host memory readings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct MemoryStats {
    /// Total memory in bytes.
    pub total_bytes: u64,
    /// Used memory in bytes.
    pub used_bytes: u64,
    /// Free memory in bytes.
    pub free_bytes: u64,
    /// Used memory in percent (0-100).
    pub percent_used: f64,
}

impl MemoryStats {
    /// Build memory stats from total and free byte counts.
    ///
    /// `free_bytes` larger than `total_bytes` is clamped, and a zero total
    /// yields zero percent rather than NaN.
    #[must_use]
    pub fn from_totals(total_bytes: u64, free_bytes: u64) -> Self {
        let free_bytes = free_bytes.min(total_bytes);
        let used_bytes = total_bytes - free_bytes;
        let percent_used = if total_bytes == 0 {
            0.0
        } else {
            used_bytes as f64 / total_bytes as f64 * 100.0
        };
        Self {
            total_bytes,
            used_bytes,
            free_bytes,
            percent_used,
        }
    }
}

/// Memory held by the monitored process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProcessMemory {
    /// Resident set size in bytes.
    pub rss_bytes: u64,
    /// Virtual memory size in bytes.
    pub virtual_bytes: u64,
}

/// Readings for the monitored process itself.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ProcessStats {
    /// Seconds since the process started.
    pub uptime_seconds: u64,
    /// Process memory usage.
    pub memory: ProcessMemory,
    /// Process CPU usage in percent (may exceed 100 on multi-core hosts).
    pub cpu_percent: f64,
}

/// Request outcome counters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct RequestStats {
    /// Total completed requests.
    pub total: u64,
    /// Requests with a status in `200..400`.
    pub successful: u64,
    /// All other requests.
    pub failed: u64,
    /// Mean response time over the rolling window, in milliseconds.
    pub avg_response_time_ms: f64,
}

impl RequestStats {
    /// Failed requests as a percentage of the total, or `None` when no
    /// request has completed yet.
    #[must_use]
    pub fn error_rate_percent(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some(self.failed as f64 / self.total as f64 * 100.0)
        }
    }
}

/// One reading from a [`HostStatsProvider`](crate::traits::HostStatsProvider).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct HostStats {
    /// CPU readings.
    pub cpu: CpuStats,
    /// Memory readings.
    pub memory: MemoryStats,
    /// Process readings.
    pub process: ProcessStats,
}

/// A point-in-time reading of host and request metrics.
///
/// Snapshots are plain `Copy` values: every copy handed out by the collector
/// is independent, so published history can never be mutated after the fact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SystemSnapshot {
    /// When the snapshot was taken.
    pub timestamp: DateTime<Utc>,
    /// CPU readings.
    pub cpu: CpuStats,
    /// Memory readings.
    pub memory: MemoryStats,
    /// Process readings.
    pub process: ProcessStats,
    /// Request counters.
    pub requests: RequestStats,
}

impl SystemSnapshot {
    /// Combine a host reading and request counters into a snapshot.
    #[must_use]
    pub const fn new(timestamp: DateTime<Utc>, host: HostStats, requests: RequestStats) -> Self {
        Self {
            timestamp,
            cpu: host.cpu,
            memory: host.memory,
            process: host.process,
            requests,
        }
    }

    /// An all-zero snapshot, used before the first successful sample.
    #[must_use]
    pub fn empty(timestamp: DateTime<Utc>) -> Self {
        Self::new(timestamp, HostStats::default(), RequestStats::default())
    }

    /// The host portion of this snapshot.
    #[must_use]
    pub const fn host(&self) -> HostStats {
        HostStats {
            cpu: self.cpu,
            memory: self.memory,
            process: self.process,
        }
    }
}
