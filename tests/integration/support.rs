//! Shared collaborators for the workflow tests.

#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::mpsc;

use pulsewatch::alerts::Alert;
use pulsewatch::config::Config;
use pulsewatch::error::{ChannelError, SamplingError};
use pulsewatch::metrics::{CpuStats, HostStats, MemoryStats};
use pulsewatch::service::MonitoringService;
use pulsewatch::traits::{Channel, HostStatsProvider, TimeProvider};

/// Clock moved by hand.
#[derive(Debug)]
pub struct StepClock(Mutex<DateTime<Utc>>);

impl StepClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self(Mutex::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
        )))
    }

    pub fn advance(&self, by: Duration) {
        *self.0.lock().unwrap() += chrono::Duration::from_std(by).unwrap();
    }
}

impl TimeProvider for StepClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

/// Host whose readings are set by the test. `None` makes sampling fail.
#[derive(Debug, Default)]
pub struct ScriptedHost(Mutex<Option<HostStats>>);

impl ScriptedHost {
    pub fn with(cpu_percent: f64, memory_percent: f64) -> Arc<Self> {
        let host = Arc::new(Self::default());
        host.set(cpu_percent, memory_percent);
        host
    }

    pub fn set(&self, cpu_percent: f64, memory_percent: f64) {
        *self.0.lock().unwrap() = Some(HostStats {
            cpu: CpuStats {
                usage_percent: cpu_percent,
                load_average: [1.0, 1.0, 1.0],
            },
            memory: MemoryStats {
                total_bytes: 1000,
                used_bytes: 0,
                free_bytes: 1000,
                percent_used: memory_percent,
            },
            ..HostStats::default()
        });
    }

    pub fn fail(&self) {
        *self.0.lock().unwrap() = None;
    }
}

impl HostStatsProvider for ScriptedHost {
    fn sample(&self) -> Result<HostStats, SamplingError> {
        (*self.0.lock().unwrap()).ok_or_else(|| SamplingError::ReadFailed {
            message: "scripted failure".to_string(),
        })
    }
}

/// How a [`RecordingChannel`] behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Deliver,
    FailInit,
    FailSend,
}

/// Channel that reports every send attempt on an mpsc channel.
pub struct RecordingChannel {
    name: &'static str,
    behavior: Behavior,
    attempts: mpsc::UnboundedSender<(&'static str, Alert)>,
}

impl RecordingChannel {
    pub fn new(
        name: &'static str,
        behavior: Behavior,
        attempts: mpsc::UnboundedSender<(&'static str, Alert)>,
    ) -> Arc<dyn Channel> {
        Arc::new(Self {
            name,
            behavior,
            attempts,
        })
    }
}

#[async_trait]
impl Channel for RecordingChannel {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn init(&self) -> Result<(), ChannelError> {
        if self.behavior == Behavior::FailInit {
            return Err(ChannelError::VerificationFailed {
                channel: self.name.to_string(),
                message: "unreachable".to_string(),
            });
        }
        Ok(())
    }

    async fn send(&self, alert: &Alert) -> Result<(), ChannelError> {
        let _ = self.attempts.send((self.name, alert.clone()));
        if self.behavior == Behavior::FailSend {
            return Err(ChannelError::Transport {
                channel: self.name.to_string(),
                message: "rejected".to_string(),
            });
        }
        Ok(())
    }
}

/// Service over a scripted host and a step clock, with default config.
pub fn service(host: Arc<ScriptedHost>, clock: Arc<StepClock>) -> Arc<MonitoringService> {
    MonitoringService::with_clock(&Config::default(), host, clock)
}

/// Wait for the next reported send attempt.
pub async fn next_attempt(
    rx: &mut mpsc::UnboundedReceiver<(&'static str, Alert)>,
) -> (&'static str, Alert) {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for a send attempt")
        .expect("channel closed")
}
