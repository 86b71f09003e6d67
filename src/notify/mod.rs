//! Alert notification fan-out.
//!
//! The [`NotificationDispatcher`] forwards error and critical alerts to every
//! ready [`Channel`]. Channels are initialized once by
//! [`NotificationDispatcher::configure`]; a channel that fails to initialize is
//! disabled for the life of the dispatcher. Each delivery runs concurrently
//! under its own timeout, and a failure on one channel never affects another.
//!
//! ```text
//! Unconfigured ──configure()──► Initializing ──► Ready
//!                                     │
//!                                     └─ per channel: Ready | Disabled
//! ```

mod email;
pub mod render;
mod slack;

pub use email::EmailChannel;
pub use slack::SlackChannel;

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use futures_util::future::join_all;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::alerts::{Alert, Severity};
use crate::config::NotificationConfig;
use crate::error::ChannelError;
use crate::traits::Channel;

/// Lowest severity that is delivered to channels.
pub const MIN_NOTIFY_SEVERITY: Severity = Severity::Error;

/// Dispatcher lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatcherState {
    /// `configure` has not been called.
    Unconfigured,
    /// Channels are being initialized.
    Initializing,
    /// Initialization finished; ready channels receive alerts.
    Ready,
}

/// Per-channel status after initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelStatus {
    /// Initialized and receiving alerts.
    Ready,
    /// Failed to initialize. Never retried.
    Disabled,
}

/// Outcome counts for one alert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    /// Channels a delivery was attempted on.
    pub attempted: usize,
    /// Deliveries that succeeded.
    pub delivered: usize,
    /// Deliveries that failed or timed out.
    pub failed: usize,
}

struct ChannelSlot {
    channel: Arc<dyn Channel>,
    status: ChannelStatus,
}

struct DispatcherInner {
    state: DispatcherState,
    slots: Vec<ChannelSlot>,
}

/// Fans alerts out to notification channels.
pub struct NotificationDispatcher {
    send_timeout: Duration,
    inner: RwLock<DispatcherInner>,
}

impl NotificationDispatcher {
    /// Create an unconfigured dispatcher.
    #[must_use]
    pub const fn new(send_timeout: Duration) -> Self {
        Self {
            send_timeout,
            inner: RwLock::new(DispatcherInner {
                state: DispatcherState::Unconfigured,
                slots: Vec::new(),
            }),
        }
    }

    /// Per-channel send timeout.
    #[must_use]
    pub const fn send_timeout(&self) -> Duration {
        self.send_timeout
    }

    fn read(&self) -> RwLockReadGuard<'_, DispatcherInner> {
        match self.inner.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!(error = %poisoned, "Dispatcher lock poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, DispatcherInner> {
        match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!(error = %poisoned, "Dispatcher lock poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> DispatcherState {
        self.read().state
    }

    /// Name and status of every configured channel, in configuration order.
    #[must_use]
    pub fn channel_statuses(&self) -> Vec<(&'static str, ChannelStatus)> {
        self.read()
            .slots
            .iter()
            .map(|slot| (slot.channel.name(), slot.status))
            .collect()
    }

    /// Number of channels that will receive alerts.
    #[must_use]
    pub fn ready_count(&self) -> usize {
        self.read()
            .slots
            .iter()
            .filter(|slot| slot.status == ChannelStatus::Ready)
            .count()
    }

    /// Initialize `channels` concurrently and make the ready ones live.
    ///
    /// Replaces any previous configuration. Each initialization failure is
    /// logged once and disables that channel permanently.
    pub async fn configure(&self, channels: Vec<Arc<dyn Channel>>) {
        {
            let mut inner = self.write();
            inner.state = DispatcherState::Initializing;
            inner.slots.clear();
        }

        let results = join_all(channels.iter().map(|channel| channel.init())).await;

        let slots: Vec<ChannelSlot> = channels
            .into_iter()
            .zip(results)
            .map(|(channel, result)| {
                let status = match result {
                    Ok(()) => {
                        info!(channel = channel.name(), "Notification channel initialized");
                        ChannelStatus::Ready
                    }
                    Err(e) => {
                        error!(
                            channel = channel.name(),
                            error = %e,
                            "Notification channel failed to initialize, disabling"
                        );
                        ChannelStatus::Disabled
                    }
                };
                ChannelSlot { channel, status }
            })
            .collect();

        let ready = slots
            .iter()
            .filter(|s| s.status == ChannelStatus::Ready)
            .count();
        info!(
            configured = slots.len(),
            ready, "Notification dispatcher ready"
        );

        let mut inner = self.write();
        inner.slots = slots;
        inner.state = DispatcherState::Ready;
    }

    /// Whether `alert` is severe enough to be delivered.
    #[must_use]
    pub fn should_notify(alert: &Alert) -> bool {
        alert.severity >= MIN_NOTIFY_SEVERITY
    }

    /// Deliver `alert` to every ready channel.
    ///
    /// Always completes once every attempt has finished. Failures are logged
    /// and counted in the returned summary; they are never returned as errors.
    pub async fn send_notification(&self, alert: &Alert) -> DispatchSummary {
        if !Self::should_notify(alert) {
            debug!(
                alert_id = %alert.id,
                severity = %alert.severity,
                "Alert below notification floor"
            );
            return DispatchSummary::default();
        }

        let channels: Vec<Arc<dyn Channel>> = {
            let inner = self.read();
            if inner.state != DispatcherState::Ready {
                debug!(alert_id = %alert.id, state = ?inner.state, "Dispatcher not ready");
                return DispatchSummary::default();
            }
            inner
                .slots
                .iter()
                .filter(|slot| slot.status == ChannelStatus::Ready)
                .map(|slot| Arc::clone(&slot.channel))
                .collect()
        };

        let results = join_all(channels.iter().map(|c| self.deliver(c.as_ref(), alert))).await;

        let delivered = results.iter().filter(|r| r.is_ok()).count();
        let summary = DispatchSummary {
            attempted: results.len(),
            delivered,
            failed: results.len() - delivered,
        };
        debug!(
            alert_id = %alert.id,
            attempted = summary.attempted,
            delivered = summary.delivered,
            failed = summary.failed,
            "Notification fan-out complete"
        );
        summary
    }

    async fn deliver(&self, channel: &dyn Channel, alert: &Alert) -> Result<(), ChannelError> {
        let result = match tokio::time::timeout(self.send_timeout, channel.send(alert)).await {
            Ok(result) => result,
            Err(_) => Err(ChannelError::Timeout {
                channel: channel.name().to_string(),
                timeout_ms: u64::try_from(self.send_timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        };
        if let Err(e) = &result {
            error!(
                channel = channel.name(),
                alert_id = %alert.id,
                error = %e,
                "Notification delivery failed"
            );
        }
        result
    }
}

impl Default for NotificationDispatcher {
    fn default() -> Self {
        Self::new(Duration::from_millis(
            crate::config::DEFAULT_SEND_TIMEOUT_MS,
        ))
    }
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("send_timeout", &self.send_timeout)
            .field("state", &self.state())
            .field("channels", &self.channel_statuses())
            .finish()
    }
}

/// Build the enabled channels described by `config`.
///
/// A channel that cannot even be constructed is logged and left out.
#[must_use]
pub fn build_channels(config: &NotificationConfig) -> Vec<Arc<dyn Channel>> {
    let timeout = Duration::from_millis(config.send_timeout_ms);
    let mut channels: Vec<Arc<dyn Channel>> = Vec::new();

    if config.email.enabled {
        channels.push(Arc::new(EmailChannel::new(config.email.clone(), timeout)));
    }
    if config.slack.enabled {
        match SlackChannel::new(config.slack.clone(), timeout) {
            Ok(slack) => channels.push(Arc::new(slack)),
            Err(e) => error!(error = %e, "Slack channel could not be created, disabling"),
        }
    }
    channels
}
