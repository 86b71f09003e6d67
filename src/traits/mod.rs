//! Trait definitions for mockable collaborators.
//!
//! This module defines traits for:
//! - [`HostStatsProvider`]: Point-in-time CPU/memory/process readings
//! - [`Channel`]: A notification transport (email, chat)
//! - [`TimeProvider`]: Time abstraction for testing
//!
//! # Mocking
//!
//! All traits are annotated with `#[cfg_attr(test, mockall::automock)]`
//! which generates mock implementations automatically for testing.
//!
//! # Example
//!
//! ```
//! use pulsewatch::traits::{TimeProvider, RealTimeProvider};
//!
//! let time_provider = RealTimeProvider;
//! let now = time_provider.now();
//! println!("Current time: {now}");
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::alerts::Alert;
use crate::error::{ChannelError, SamplingError};
use crate::metrics::HostStats;

/// Source of host statistics.
///
/// Called from the sampler task and never from the request path. Implementations
/// may block briefly while reading the operating system.
#[cfg_attr(test, mockall::automock)]
pub trait HostStatsProvider: Send + Sync {
    /// Take one reading.
    ///
    /// # Errors
    ///
    /// Returns [`SamplingError`] if the host could not be read.
    fn sample(&self) -> Result<HostStats, SamplingError>;
}

/// A notification channel.
///
/// The dispatcher calls [`Channel::init`] exactly once when notifications are
/// configured. A channel whose `init` fails is never sent to.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Channel: Send + Sync {
    /// Short channel name used in logs and errors (e.g. `"email"`).
    fn name(&self) -> &'static str;

    /// Verify configuration and connectivity.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError`] if the channel cannot be used.
    async fn init(&self) -> Result<(), ChannelError>;

    /// Deliver one alert.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError`] if delivery failed.
    async fn send(&self, alert: &Alert) -> Result<(), ChannelError>;
}

/// Time provider trait for deterministic testing.
///
/// This trait abstracts time operations to allow for
/// deterministic testing by providing fixed timestamps.
#[cfg_attr(test, mockall::automock)]
pub trait TimeProvider: Send + Sync {
    /// Get the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Real time provider using system clock.
///
/// This is the production implementation that returns the actual current time.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealTimeProvider;

impl TimeProvider for RealTimeProvider {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
