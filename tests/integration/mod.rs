//! Integration tests for the monitoring pipeline.
//!
//! These tests drive [`pulsewatch::service::MonitoringService`] through its
//! public API with scripted collaborators:
//! - Threshold alerts and cooldown
//! - Bounded history and alert log
//! - Notification fan-out with failing channels
//! - Health classification

mod alert_pipeline;
mod history_bounds;
mod notification_fanout;
mod support;
