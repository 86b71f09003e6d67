//! Bounded history, alert log and request counters.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use pulsewatch::alerts::AlertQuery;
use pulsewatch::config::Config;
use pulsewatch::metrics::{HistoryQuery, MAX_HISTORY_LIMIT};
use pulsewatch::service::MonitoringService;
use pulsewatch::traits::TimeProvider;

use super::support::{service, ScriptedHost, StepClock};

#[test]
fn test_history_keeps_most_recent_thousand() {
    let clock = StepClock::new();
    let service = service(ScriptedHost::with(10.0, 10.0), Arc::clone(&clock));
    let first = clock.now();

    for _ in 0..1010 {
        service.tick();
        clock.advance(Duration::from_secs(1));
    }

    let history = service.history(&HistoryQuery::new().with_limit(MAX_HISTORY_LIMIT));
    assert_eq!(history.len(), 1000);
    assert_eq!(
        (history[0].timestamp - first).num_seconds(),
        10,
        "the oldest ten snapshots are evicted"
    );
    assert!(history.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
}

#[test]
fn test_history_default_limit_and_ceiling() {
    let clock = StepClock::new();
    let service = service(ScriptedHost::with(10.0, 10.0), Arc::clone(&clock));
    for _ in 0..300 {
        service.tick();
        clock.advance(Duration::from_secs(1));
    }

    assert_eq!(service.history(&HistoryQuery::new()).len(), 100);
    assert_eq!(
        service
            .history(&HistoryQuery::new().with_limit(5000))
            .len(),
        300
    );
    assert!(service.history(&HistoryQuery::new().with_limit(0)).is_empty());
}

#[test]
fn test_history_range_filter() {
    let clock = StepClock::new();
    let service = service(ScriptedHost::with(10.0, 10.0), Arc::clone(&clock));
    let start = clock.now();
    for _ in 0..10 {
        service.tick();
        clock.advance(Duration::from_secs(10));
    }

    let from = start + chrono::Duration::seconds(20);
    let to = start + chrono::Duration::seconds(50);
    let window = service.history(&HistoryQuery::new().since(from).until(to));
    assert_eq!(window.len(), 4);
    assert_eq!(window[0].timestamp, from);
    assert_eq!(window[3].timestamp, to);
}

#[test]
fn test_history_copies_are_independent() {
    let service = service(ScriptedHost::with(10.0, 10.0), StepClock::new());
    service.tick();

    let mut copy = service.history(&HistoryQuery::new());
    copy[0].cpu.usage_percent = 99.0;
    assert!((service.history(&HistoryQuery::new())[0].cpu.usage_percent - 10.0).abs() < 1e-9);
}

#[test]
fn test_alert_log_is_bounded() {
    let clock = StepClock::new();
    let config = Config {
        history_capacity: 5,
        ..Config::default()
    };
    let service =
        MonitoringService::with_clock(&config, ScriptedHost::with(85.0, 10.0), Arc::<StepClock>::clone(&clock));

    for _ in 0..8 {
        service.tick();
        clock.advance(Duration::from_secs(61));
    }

    assert_eq!(service.alerts(&AlertQuery::recent(100)).len(), 5);
    assert_eq!(service.history(&HistoryQuery::new()).len(), 5);
}

#[test]
fn test_request_counters_stay_consistent() {
    let service = service(ScriptedHost::with(10.0, 10.0), StepClock::new());
    let statuses = [200, 201, 301, 399, 400, 404, 500, 199, 204, 503];
    for (i, status) in statuses.iter().cycle().take(2500).enumerate() {
        service.record_elapsed(Duration::from_millis((i % 7) as u64), *status);
    }

    let requests = service.current_snapshot().requests;
    assert_eq!(requests.total, 2500);
    assert_eq!(requests.successful + requests.failed, requests.total);
    assert_eq!(requests.successful, 1250);

    // Mean over the last 1000 samples: elapsed cycles through 0..7.
    let expected = (1500..2500).map(|i| (i % 7) as f64).sum::<f64>() / 1000.0;
    assert!((requests.avg_response_time_ms - expected).abs() < 1e-6);
}

#[test]
fn test_record_uses_clock_for_elapsed_time() {
    let clock = StepClock::new();
    let service = service(ScriptedHost::with(10.0, 10.0), Arc::clone(&clock));
    let start = clock.now();
    clock.advance(Duration::from_millis(2500));
    service.record(start, 200);

    let snapshot = service.current_snapshot();
    assert!((snapshot.requests.avg_response_time_ms - 2500.0).abs() < 1e-6);
    assert_eq!(service.alerts(&AlertQuery::default()).len(), 1);
}

#[test]
fn test_request_snapshots_reuse_last_host_reading() {
    let clock = StepClock::new();
    let host = ScriptedHost::with(33.0, 44.0);
    let service = service(Arc::clone(&host), Arc::clone(&clock));
    service.tick();

    // A failing host is never read on the request path.
    host.fail();
    service.record_elapsed(Duration::from_millis(5), 200);
    let snapshot = service.current_snapshot();
    assert!((snapshot.cpu.usage_percent - 33.0).abs() < 1e-9);
    assert_eq!(snapshot.requests.total, 1);
}
