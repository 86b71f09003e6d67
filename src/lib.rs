//! Pulsewatch
//!
//! In-process runtime observability for a web service: a metrics collector
//! with bounded history, a threshold alert engine with per-category cooldown,
//! and a notification dispatcher that fans alerts out to email and Slack.
//!
//! # Features
//!
//! - Request tracking with a bounded rolling response-time window
//! - Periodic host sampling (CPU, memory, process) via `sysinfo`
//! - Four alert rules: cpu, memory, error rate, response time
//! - One alert per category per cooldown window (60s by default)
//! - Synchronous ordered publish/subscribe for `metrics` and `alert` events
//! - Email (SMTP) and Slack channels with per-channel failure isolation
//! - Health classification: healthy, degraded, critical
//!
//! # Quick Start
//!
//! ```bash
//! NOTIFY_SLACK_ENABLED=true SLACK_TOKEN=xoxb-xxx SLACK_CHANNEL=C0123 ./pulsewatch
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐ record()  ┌──────────────────┐ snapshot ┌─────────────┐
//! │ request hook │──────────▶│ MetricsCollector │─────────▶│ AlertEngine │
//! └──────────────┘           └──────────────────┘          └──────┬──────┘
//!                                     ▲  │ metrics                │ alert
//! ┌──────────────┐  tick()            │  ▼                        ▼
//! │ sampler task │────────────────────┘ EventBus ◀────────────────┘
//! └──────────────┘                        │ alert (error, critical)
//!                                         ▼
//!                              NotificationDispatcher ──▶ email, slack
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod alerts;
pub mod config;
pub mod error;
pub mod events;
pub mod host;
pub mod metrics;
pub mod notify;
pub mod service;
pub mod traits;

#[cfg(test)]
mod test_utils;
