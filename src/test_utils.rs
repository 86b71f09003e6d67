//! Test utilities and mock factories.
//!
//! This module provides shared testing infrastructure:
//! - A manually advanced clock
//! - Mock factories for host sampling and notification channels
//! - Test fixtures for host readings
//!
//! Only compiled for tests (`#[cfg(test)]`).

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

use crate::error::{ChannelError, SamplingError};
use crate::metrics::{CpuStats, HostStats, MemoryStats, ProcessMemory, ProcessStats};
use crate::traits::{MockChannel, MockHostStatsProvider, MockTimeProvider, TimeProvider};

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Create a clock fixed at `start`.
    pub const fn at(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += chrono::Duration::from_std(by).unwrap();
    }

    /// Jump to an absolute time.
    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap() = to;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::at(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap())
    }
}

impl TimeProvider for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Create a mock time provider that always returns `time`.
#[must_use]
pub fn mock_time(time: DateTime<Utc>) -> MockTimeProvider {
    let mut mock = MockTimeProvider::new();
    mock.expect_now().return_const(time);
    mock
}

/// Host reading with the given cpu and memory usage percentages.
#[must_use]
pub fn host_stats(cpu_percent: f64, memory_percent: f64) -> HostStats {
    HostStats {
        cpu: CpuStats {
            usage_percent: cpu_percent,
            load_average: [0.5, 0.4, 0.3],
        },
        memory: MemoryStats {
            total_bytes: 16_000,
            used_bytes: 0,
            free_bytes: 16_000,
            percent_used: memory_percent,
        },
        process: ProcessStats {
            uptime_seconds: 42,
            memory: ProcessMemory {
                rss_bytes: 1024,
                virtual_bytes: 4096,
            },
            cpu_percent: 1.0,
        },
    }
}

/// Create a mock host provider that always returns `stats`.
#[must_use]
pub fn mock_host(stats: HostStats) -> MockHostStatsProvider {
    let mut mock = MockHostStatsProvider::new();
    mock.expect_sample().returning(move || Ok(stats));
    mock
}

/// Create a mock host provider that always fails.
#[must_use]
pub fn mock_host_error() -> MockHostStatsProvider {
    let mut mock = MockHostStatsProvider::new();
    mock.expect_sample().returning(|| {
        Err(SamplingError::ReadFailed {
            message: "sensor offline".to_string(),
        })
    });
    mock
}

/// Create a mock channel whose `init` and `send` succeed.
///
/// `send` must be called exactly `sends` times.
#[must_use]
pub fn mock_channel_ok(name: &'static str, sends: usize) -> MockChannel {
    let mut mock = MockChannel::new();
    mock.expect_name().return_const(name);
    mock.expect_init().returning(|| Ok(()));
    mock.expect_send().times(sends).returning(|_| Ok(()));
    mock
}

/// Create a mock channel whose `init` succeeds and whose `send` fails.
#[must_use]
pub fn mock_channel_send_error(name: &'static str, sends: usize) -> MockChannel {
    let mut mock = MockChannel::new();
    mock.expect_name().return_const(name);
    mock.expect_init().returning(|| Ok(()));
    mock.expect_send().times(sends).returning(move |_| {
        Err(ChannelError::Transport {
            channel: name.to_string(),
            message: "connection reset".to_string(),
        })
    });
    mock
}

/// Create a mock channel whose `init` fails. `send` must never be called.
#[must_use]
pub fn mock_channel_init_error(name: &'static str) -> MockChannel {
    let mut mock = MockChannel::new();
    mock.expect_name().return_const(name);
    mock.expect_init().times(1).returning(move || {
        Err(ChannelError::VerificationFailed {
            channel: name.to_string(),
            message: "unreachable".to_string(),
        })
    });
    mock.expect_send().never();
    mock
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::default();
        let start = clock.now();
        clock.advance(Duration::from_secs(70));
        assert_eq!((clock.now() - start).num_seconds(), 70);
    }

    #[test]
    fn test_manual_clock_set() {
        let clock = ManualClock::default();
        let target = Utc.with_ymd_and_hms(2030, 6, 1, 0, 0, 0).unwrap();
        clock.set(target);
        assert_eq!(clock.now(), target);
    }

    #[test]
    fn test_mock_time() {
        let time = Utc::now();
        assert_eq!(mock_time(time).now(), time);
    }

    #[test]
    fn test_host_stats_fixture() {
        let stats = host_stats(85.0, 40.0);
        assert!((stats.cpu.usage_percent - 85.0).abs() < f64::EPSILON);
        assert!((stats.memory.percent_used - 40.0).abs() < f64::EPSILON);
    }
}
