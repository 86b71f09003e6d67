//! Threshold alerts, cooldown and health.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use pulsewatch::alerts::{AlertCategory, AlertQuery, HealthStatus, Severity};
use pulsewatch::events::{EventKind, MonitorEvent};

use super::support::{service, ScriptedHost, StepClock};

#[test]
fn test_cpu_alert_message_and_severity() {
    let service = service(ScriptedHost::with(85.0, 30.0), StepClock::new());

    let raised = service.tick().unwrap();
    assert_eq!(raised.len(), 1);
    assert_eq!(raised[0].category, AlertCategory::Cpu);
    assert_eq!(raised[0].severity, Severity::Warning);
    assert!(raised[0].message.contains("85"));
    assert!(raised[0].snapshot_excerpt.cpu.is_some());
}

#[test]
fn test_cooldown_window() {
    let clock = StepClock::new();
    let service = service(ScriptedHost::with(85.0, 30.0), Arc::clone(&clock));

    assert_eq!(service.tick().unwrap().len(), 1);
    clock.advance(Duration::from_secs(10));
    assert!(service.tick().unwrap().is_empty());
    clock.advance(Duration::from_secs(60));
    assert_eq!(service.tick().unwrap().len(), 1);

    let log = service.alerts(&AlertQuery::default());
    assert_eq!(log.len(), 2);
    assert_eq!((log[1].timestamp - log[0].timestamp).num_seconds(), 70);
}

#[test]
fn test_categories_cool_down_independently() {
    let clock = StepClock::new();
    let host = ScriptedHost::with(85.0, 30.0);
    let service = service(Arc::clone(&host), Arc::clone(&clock));

    service.tick();
    clock.advance(Duration::from_secs(5));
    host.set(85.0, 95.0);
    let raised = service.tick().unwrap();
    assert_eq!(raised.len(), 1);
    assert_eq!(raised[0].category, AlertCategory::Memory);
}

#[test]
fn test_rule_order_within_one_evaluation() {
    let clock = StepClock::new();
    let service = service(ScriptedHost::with(95.0, 97.0), Arc::clone(&clock));
    service.tick();
    for _ in 0..4 {
        service.record_elapsed(Duration::from_millis(3000), 500);
    }
    clock.advance(Duration::from_secs(61));

    let raised = service.tick().unwrap();
    let categories: Vec<_> = raised.iter().map(|a| a.category).collect();
    assert_eq!(
        categories,
        vec![
            AlertCategory::Cpu,
            AlertCategory::Memory,
            AlertCategory::ErrorRate,
            AlertCategory::ResponseTime,
        ]
    );
}

#[test]
fn test_error_rate_threshold() {
    let clock = StepClock::new();
    let service = service(ScriptedHost::with(10.0, 10.0), Arc::clone(&clock));

    // 5% stays quiet.
    for i in 0..100 {
        service.record_elapsed(Duration::from_millis(20), if i % 20 == 19 { 500 } else { 200 });
    }
    assert!(service
        .alerts(&AlertQuery::default().with_category(AlertCategory::ErrorRate))
        .is_empty());

    // Failures only: the rate crosses 10% at 11 of 106.
    for _ in 0..10 {
        service.record_elapsed(Duration::from_millis(20), 503);
    }
    let alerts = service.alerts(&AlertQuery::default().with_category(AlertCategory::ErrorRate));
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].severity, Severity::Error);
    assert!(alerts[0].message.contains('%'));
}

#[test]
fn test_alert_events_one_per_alert() {
    let service = service(ScriptedHost::with(95.0, 97.0), StepClock::new());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    service.subscribe(
        EventKind::Alert,
        Arc::new(move |event: &MonitorEvent| {
            if let MonitorEvent::Alert(alert) = event {
                sink.lock().unwrap().push(alert.category);
            }
        }),
    );

    service.tick();
    assert_eq!(
        *seen.lock().unwrap(),
        vec![AlertCategory::Cpu, AlertCategory::Memory]
    );
}

#[test]
fn test_panicking_subscriber_does_not_break_pipeline() {
    let service = service(ScriptedHost::with(95.0, 20.0), StepClock::new());
    let count = Arc::new(Mutex::new(0));
    let c = Arc::clone(&count);
    service.subscribe(
        EventKind::Alert,
        Arc::new(|_event: &MonitorEvent| panic!("dashboard push failed")),
    );
    service.subscribe(
        EventKind::Alert,
        Arc::new(move |_event: &MonitorEvent| *c.lock().unwrap() += 1),
    );

    assert_eq!(service.tick().unwrap().len(), 1);
    assert_eq!(*count.lock().unwrap(), 1);
    assert_eq!(service.alerts(&AlertQuery::default()).len(), 1);
}

#[test]
fn test_clear_alerts_and_cooldown_reset() {
    let service = service(ScriptedHost::with(85.0, 30.0), StepClock::new());
    service.tick();
    service.clear_alerts();
    assert!(service.alerts(&AlertQuery::default()).is_empty());

    // The log is the only cooldown state, so the next breach alerts again.
    assert_eq!(service.tick().unwrap().len(), 1);
}

#[test]
fn test_sampling_failure_keeps_previous_snapshot() {
    let clock = StepClock::new();
    let host = ScriptedHost::with(42.0, 30.0);
    let service = service(Arc::clone(&host), Arc::clone(&clock));
    service.tick();
    let before = service.current_snapshot();

    host.fail();
    clock.advance(Duration::from_secs(5));
    assert!(service.tick().is_none());
    assert_eq!(service.current_snapshot(), before);
}

#[test]
fn test_health_ignores_non_critical_alerts() {
    let clock = StepClock::new();
    let service = service(ScriptedHost::with(10.0, 10.0), Arc::clone(&clock));
    service.tick();
    assert_eq!(service.health().status, HealthStatus::Healthy);

    // An error-severity alert is reported but does not change the status.
    service.record_elapsed(Duration::from_millis(10), 500);
    assert_eq!(service.health().status, HealthStatus::Healthy);
    assert_eq!(service.health().recent_alerts.len(), 1);
}

#[test]
fn test_health_critical_from_load() {
    let clock = StepClock::new();
    let host = ScriptedHost::with(92.0, 10.0);
    let service = service(Arc::clone(&host), Arc::clone(&clock));
    service.tick();
    assert_eq!(service.health().status, HealthStatus::Critical);

    host.set(75.0, 10.0);
    clock.advance(Duration::from_secs(5));
    service.tick();
    assert_eq!(service.health().status, HealthStatus::Degraded);
}
