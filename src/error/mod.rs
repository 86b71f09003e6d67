//! Error types for the observability core.
//!
//! This module defines a small hierarchy:
//! - [`AppError`]: Top-level errors surfaced to the binary
//! - [`SamplingError`]: Host statistics read failures
//! - [`ChannelError`]: Notification channel initialization and delivery failures
//! - [`ConfigError`]: Configuration errors
//!
//! None of these ever escape the telemetry path: sampling and channel errors are
//! logged and absorbed by their owning component. All errors implement
//! `Send + Sync` so they can cross task boundaries.

use thiserror::Error;

/// Top-level application error.
#[derive(Debug, Error)]
pub enum AppError {
    /// Host sampling error.
    #[error("Sampling error: {0}")]
    Sampling(#[from] SamplingError),

    /// Notification channel error.
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Host statistics sampling errors.
///
/// Returned by [`HostStatsProvider::sample`](crate::traits::HostStatsProvider::sample).
/// A failed sample skips the current refresh tick and leaves the previous
/// snapshot in place.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SamplingError {
    /// The host reported no usable data (e.g. zero total memory).
    #[error("Host statistics unavailable: {message}")]
    Unavailable {
        /// Description of what was missing.
        message: String,
    },

    /// The provider itself failed while reading.
    #[error("Host statistics read failed: {message}")]
    ReadFailed {
        /// Description of the failure.
        message: String,
    },
}

/// Notification channel errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// Channel configuration is missing or malformed.
    #[error("{channel} channel misconfigured: {message}")]
    Misconfigured {
        /// Channel name.
        channel: String,
        /// What is wrong with the configuration.
        message: String,
    },

    /// Connectivity or credential verification failed during initialization.
    #[error("{channel} channel failed verification: {message}")]
    VerificationFailed {
        /// Channel name.
        channel: String,
        /// Description of the failure.
        message: String,
    },

    /// Delivery failed at the transport level.
    #[error("{channel} delivery failed: {message}")]
    Transport {
        /// Channel name.
        channel: String,
        /// Description of the failure.
        message: String,
    },

    /// Delivery did not finish within the send timeout.
    #[error("{channel} delivery timed out after {timeout_ms}ms")]
    Timeout {
        /// Channel name.
        channel: String,
        /// Timeout in milliseconds.
        timeout_ms: u64,
    },
}

impl ChannelError {
    /// Name of the channel the error belongs to.
    #[must_use]
    pub fn channel(&self) -> &str {
        match self {
            Self::Misconfigured { channel, .. }
            | Self::VerificationFailed { channel, .. }
            | Self::Transport { channel, .. }
            | Self::Timeout { channel, .. } => channel,
        }
    }
}

/// Configuration errors.
///
/// These errors represent failures in configuration loading and validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Required configuration is missing.
    #[error("Missing required: {var}")]
    MissingRequired {
        /// The missing variable name.
        var: String,
    },

    /// Configuration value is invalid.
    #[error("Invalid value for {var}: {reason}")]
    InvalidValue {
        /// The variable name.
        var: String,
        /// Why the value is invalid.
        reason: String,
    },
}
