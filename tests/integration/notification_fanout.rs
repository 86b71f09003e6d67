//! Notification fan-out through the service.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use chrono::Utc;
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::sync::mpsc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pulsewatch::alerts::{Alert, AlertCategory, Severity, SnapshotExcerpt};
use pulsewatch::config::{NotificationConfig, SecretString, SlackConfig};
use pulsewatch::notify::{ChannelStatus, DispatchSummary, DispatcherState};

use super::support::{next_attempt, service, Behavior, RecordingChannel, ScriptedHost, StepClock};

fn alert(severity: Severity) -> Alert {
    Alert::new(
        AlertCategory::Memory,
        severity,
        "High memory usage: 97.0%",
        Utc::now(),
        SnapshotExcerpt::default(),
    )
}

#[tokio::test]
async fn test_critical_attempts_every_channel_despite_failure() {
    let service = service(ScriptedHost::with(10.0, 10.0), StepClock::new());
    let (tx, mut rx) = mpsc::unbounded_channel();
    service
        .configure_channels(vec![
            RecordingChannel::new("email", Behavior::FailSend, tx.clone()),
            RecordingChannel::new("chat", Behavior::Deliver, tx),
        ])
        .await;

    let summary = service
        .dispatcher()
        .send_notification(&alert(Severity::Critical))
        .await;
    assert_eq!(
        summary,
        DispatchSummary {
            attempted: 2,
            delivered: 1,
            failed: 1
        }
    );

    let mut names = vec![next_attempt(&mut rx).await.0, next_attempt(&mut rx).await.0];
    names.sort_unstable();
    assert_eq!(names, vec!["chat", "email"]);
}

#[tokio::test]
async fn test_warning_sends_nothing() {
    let service = service(ScriptedHost::with(10.0, 10.0), StepClock::new());
    let (tx, mut rx) = mpsc::unbounded_channel();
    service
        .configure_channels(vec![RecordingChannel::new("email", Behavior::Deliver, tx)])
        .await;

    let summary = service
        .dispatcher()
        .send_notification(&alert(Severity::Warning))
        .await;
    assert_eq!(summary.attempted, 0);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_error_alert_from_request_path_is_delivered() {
    let service = service(ScriptedHost::with(10.0, 10.0), StepClock::new());
    let (tx, mut rx) = mpsc::unbounded_channel();
    service
        .configure_channels(vec![RecordingChannel::new("chat", Behavior::Deliver, tx)])
        .await;

    service.record_elapsed(Duration::from_millis(15), 500);

    let (name, delivered) = next_attempt(&mut rx).await;
    assert_eq!(name, "chat");
    assert_eq!(delivered.category, AlertCategory::ErrorRate);
    assert_eq!(delivered.severity, Severity::Error);
}

#[tokio::test]
async fn test_warning_alert_from_sampler_is_not_delivered() {
    let service = service(ScriptedHost::with(85.0, 10.0), StepClock::new());
    let (tx, mut rx) = mpsc::unbounded_channel();
    service
        .configure_channels(vec![RecordingChannel::new("chat", Behavior::Deliver, tx)])
        .await;

    assert_eq!(service.tick().unwrap().len(), 1);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_failed_init_disables_channel() {
    let service = service(ScriptedHost::with(10.0, 10.0), StepClock::new());
    let (tx, mut rx) = mpsc::unbounded_channel();
    service
        .configure_channels(vec![
            RecordingChannel::new("email", Behavior::FailInit, tx.clone()),
            RecordingChannel::new("chat", Behavior::Deliver, tx),
        ])
        .await;

    assert_eq!(service.dispatcher().state(), DispatcherState::Ready);
    assert_eq!(
        service.dispatcher().channel_statuses(),
        vec![("email", ChannelStatus::Disabled), ("chat", ChannelStatus::Ready)]
    );

    for _ in 0..3 {
        service
            .dispatcher()
            .send_notification(&alert(Severity::Critical))
            .await;
        assert_eq!(next_attempt(&mut rx).await.0, "chat");
    }
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_slack_channel_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth.test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat.postMessage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let config = NotificationConfig {
        slack: SlackConfig {
            enabled: true,
            token: SecretString::new("xoxb-test"),
            channel: "C0OPS".to_string(),
            api_url: server.uri(),
        },
        ..NotificationConfig::default()
    };

    let service = service(ScriptedHost::with(10.0, 10.0), StepClock::new());
    service.configure_notifications(&config).await;
    assert_eq!(
        service.dispatcher().channel_statuses(),
        vec![("slack", ChannelStatus::Ready)]
    );

    let summary = service
        .dispatcher()
        .send_notification(&alert(Severity::Critical))
        .await;
    assert_eq!(summary.delivered, 1);

    let posted = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .find(|r| r.url.path() == "/chat.postMessage")
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&posted.body).unwrap();
    assert_eq!(body["channel"], "C0OPS");
    assert!(body["text"].as_str().unwrap().contains("High memory usage: 97.0%"));
}

#[tokio::test]
async fn test_unconfigured_dispatcher_drops_alerts() {
    let service = service(ScriptedHost::with(10.0, 10.0), StepClock::new());
    assert_eq!(service.dispatcher().state(), DispatcherState::Unconfigured);
    let summary = service
        .dispatcher()
        .send_notification(&alert(Severity::Critical))
        .await;
    assert_eq!(summary, DispatchSummary::default());
}
