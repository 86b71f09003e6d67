//! Threshold evaluation with per-category cooldown.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use super::{Alert, AlertCategory, AlertQuery, AlertThresholds, Severity, SnapshotExcerpt};
use crate::events::{EventBus, MonitorEvent, Publisher};
use crate::metrics::{BoundedLog, SystemSnapshot, DEFAULT_HISTORY_CAPACITY};
use crate::traits::TimeProvider;

/// Minimum time between two alerts of the same category.
pub const DEFAULT_ALERT_COOLDOWN: Duration = Duration::from_secs(60);

/// Apply the four threshold rules to `snapshot`.
///
/// Pure: no cooldown and no side effects. Candidates are returned in rule
/// order (cpu, memory, error-rate, response-time), stamped with `now`.
#[must_use]
pub fn evaluate_rules(
    snapshot: &SystemSnapshot,
    thresholds: &AlertThresholds,
    now: DateTime<Utc>,
) -> Vec<Alert> {
    let excerpt = SnapshotExcerpt::from_snapshot(snapshot);
    let mut candidates = Vec::new();
    let mut raise = |category, severity, message: String| {
        candidates.push(Alert::new(category, severity, message, now, excerpt));
    };

    let cpu = snapshot.cpu.usage_percent;
    if cpu > thresholds.cpu_percent {
        raise(
            AlertCategory::Cpu,
            Severity::Warning,
            format!("High CPU usage: {cpu:.1}%"),
        );
    }

    let memory = snapshot.memory.percent_used;
    if memory > thresholds.memory_percent {
        raise(
            AlertCategory::Memory,
            Severity::Warning,
            format!("High memory usage: {memory:.1}%"),
        );
    }

    if let Some(error_rate) = snapshot.requests.error_rate_percent() {
        if error_rate > thresholds.error_rate_percent {
            raise(
                AlertCategory::ErrorRate,
                Severity::Error,
                format!("High error rate: {error_rate:.2}%"),
            );
        }
    }

    let avg = snapshot.requests.avg_response_time_ms;
    if avg > thresholds.response_time_ms {
        raise(
            AlertCategory::ResponseTime,
            Severity::Warning,
            format!("High average response time: {avg:.2}ms"),
        );
    }

    candidates
}

/// Evaluates snapshots and owns the bounded alert log.
///
/// For a given category, no two logged alerts are less than the cooldown apart.
/// The cooldown is derived from the log itself: the most recent alert of the
/// same category suppresses a new one while it is younger than the cooldown.
/// Clearing the log therefore also resets every cooldown.
pub struct AlertEngine {
    thresholds: AlertThresholds,
    cooldown: TimeDelta,
    clock: Arc<dyn TimeProvider>,
    bus: Arc<EventBus<MonitorEvent>>,
    log: Mutex<BoundedLog<Alert>>,
}

impl AlertEngine {
    /// Create an engine with default thresholds, cooldown and log capacity.
    #[must_use]
    pub fn new(clock: Arc<dyn TimeProvider>, bus: Arc<EventBus<MonitorEvent>>) -> Self {
        Self {
            thresholds: AlertThresholds::default(),
            cooldown: to_time_delta(DEFAULT_ALERT_COOLDOWN),
            clock,
            bus,
            log: Mutex::new(BoundedLog::new(DEFAULT_HISTORY_CAPACITY)),
        }
    }

    /// Replace the rule thresholds.
    #[must_use]
    pub const fn with_thresholds(mut self, thresholds: AlertThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Replace the per-category cooldown.
    #[must_use]
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = to_time_delta(cooldown);
        self
    }

    /// Replace the alert log capacity. Existing alerts are discarded.
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.log = Mutex::new(BoundedLog::new(capacity));
        self
    }

    /// Active thresholds.
    #[must_use]
    pub const fn thresholds(&self) -> &AlertThresholds {
        &self.thresholds
    }

    /// Evaluate `snapshot`, log and publish every alert that is not in cooldown.
    ///
    /// Returns the newly raised alerts in rule order.
    pub fn evaluate(&self, snapshot: &SystemSnapshot) -> Vec<Alert> {
        let now = self.clock.now();
        let candidates = evaluate_rules(snapshot, &self.thresholds, now);
        if candidates.is_empty() {
            return candidates;
        }

        let mut raised = Vec::with_capacity(candidates.len());
        {
            let mut log = self.lock_log();
            for candidate in candidates {
                if let Some(last) = log.last_matching(|a| a.category == candidate.category) {
                    if now - last.timestamp < self.cooldown {
                        tracing::debug!(
                            category = %candidate.category,
                            last_alert = %last.timestamp,
                            "Alert suppressed by cooldown"
                        );
                        continue;
                    }
                }
                log.push(candidate.clone());
                raised.push(candidate);
            }
        }

        for alert in &raised {
            tracing::warn!(
                alert_id = %alert.id,
                category = %alert.category,
                severity = %alert.severity,
                message = %alert.message,
                "Alert raised"
            );
            self.bus.publish(&MonitorEvent::Alert(alert.clone()));
        }
        raised
    }

    /// Alerts matching `query`, oldest first, keeping the `query.limit` most recent.
    #[must_use]
    pub fn alerts(&self, query: &AlertQuery) -> Vec<Alert> {
        let log = self.lock_log();
        let mut matching: Vec<Alert> = log
            .iter()
            .rev()
            .filter(|a| query.matches(a))
            .take(query.limit)
            .cloned()
            .collect();
        matching.reverse();
        matching
    }

    /// Every logged alert no older than `since`, oldest first.
    #[must_use]
    pub fn alerts_since(&self, since: DateTime<Utc>) -> Vec<Alert> {
        let log = self.lock_log();
        log.iter().filter(|a| a.timestamp >= since).cloned().collect()
    }

    /// Number of logged alerts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock_log().len()
    }

    /// Whether the alert log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock_log().is_empty()
    }

    /// Empty the alert log.
    pub fn clear(&self) {
        let cleared = {
            let mut log = self.lock_log();
            let n = log.len();
            log.clear();
            n
        };
        tracing::info!(cleared, "Alert log cleared");
    }

    fn lock_log(&self) -> MutexGuard<'_, BoundedLog<Alert>> {
        match self.log.lock() {
            Ok(guard) => guard,
            Err(poison_error) => {
                tracing::warn!(
                    error = %poison_error,
                    "Alert log lock poisoned, using recovered data"
                );
                poison_error.into_inner()
            }
        }
    }
}

impl std::fmt::Debug for AlertEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertEngine")
            .field("thresholds", &self.thresholds)
            .field("cooldown", &self.cooldown)
            .finish_non_exhaustive()
    }
}

fn to_time_delta(duration: Duration) -> TimeDelta {
    TimeDelta::from_std(duration).unwrap_or(TimeDelta::MAX)
}
