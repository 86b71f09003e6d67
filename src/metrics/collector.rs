//! The authoritative current snapshot and its bounded history.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::{
    BoundedLog, RequestStats, RequestTracker, SystemSnapshot, DEFAULT_HISTORY_CAPACITY,
    DEFAULT_RESPONSE_WINDOW,
};
use crate::error::SamplingError;
use crate::events::{EventBus, MonitorEvent, Publisher};
use crate::traits::{HostStatsProvider, TimeProvider};

/// Number of snapshots returned by a history query without a limit.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Upper bound on the number of snapshots returned by a history query.
pub const MAX_HISTORY_LIMIT: usize = 1000;

/// History query: an optional inclusive time range and a result limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HistoryQuery {
    /// Earliest timestamp to include.
    pub from: Option<DateTime<Utc>>,
    /// Latest timestamp to include.
    pub to: Option<DateTime<Utc>>,
    /// Maximum number of snapshots (most recent kept). Defaults to
    /// [`DEFAULT_HISTORY_LIMIT`] and is capped at [`MAX_HISTORY_LIMIT`].
    pub limit: Option<usize>,
}

impl HistoryQuery {
    /// Query with default limit and no range.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            from: None,
            to: None,
            limit: None,
        }
    }

    /// Only snapshots taken at or after `from`.
    #[must_use]
    pub const fn since(mut self, from: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self
    }

    /// Only snapshots taken at or before `to`.
    #[must_use]
    pub const fn until(mut self, to: DateTime<Utc>) -> Self {
        self.to = Some(to);
        self
    }

    /// Set the result limit.
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Effective limit after defaulting and capping.
    #[must_use]
    pub fn effective_limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .min(MAX_HISTORY_LIMIT)
    }

    fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.from.is_none_or(|from| timestamp >= from) && self.to.is_none_or(|to| timestamp <= to)
    }
}

struct CollectorState {
    tracker: RequestTracker,
    current: SystemSnapshot,
    history: BoundedLog<SystemSnapshot>,
}

/// Owns the current [`SystemSnapshot`], the request tracker and the snapshot history.
///
/// Two triggers produce snapshots: [`MetricsCollector::refresh`] pulls a fresh
/// host reading, and [`MetricsCollector::record_request`] re-stamps the latest
/// host reading with updated request counters. Both update the current
/// snapshot and append to history in a single critical section, then publish a
/// [`MonitorEvent::Metrics`] after the lock is released.
pub struct MetricsCollector {
    provider: Arc<dyn HostStatsProvider>,
    clock: Arc<dyn TimeProvider>,
    bus: Arc<EventBus<MonitorEvent>>,
    state: Mutex<CollectorState>,
}

impl MetricsCollector {
    /// Create a collector with default history capacity and response window.
    #[must_use]
    pub fn new(
        provider: Arc<dyn HostStatsProvider>,
        clock: Arc<dyn TimeProvider>,
        bus: Arc<EventBus<MonitorEvent>>,
    ) -> Self {
        let current = SystemSnapshot::empty(clock.now());
        Self {
            provider,
            clock,
            bus,
            state: Mutex::new(CollectorState {
                tracker: RequestTracker::new(DEFAULT_RESPONSE_WINDOW),
                current,
                history: BoundedLog::new(DEFAULT_HISTORY_CAPACITY),
            }),
        }
    }

    /// Replace the history capacity. Existing history is discarded.
    #[must_use]
    pub fn with_history_capacity(self, capacity: usize) -> Self {
        self.lock_state().history = BoundedLog::new(capacity);
        self
    }

    /// Replace the response-time window size. Existing samples are discarded.
    #[must_use]
    pub fn with_response_window(self, window: usize) -> Self {
        self.lock_state().tracker = RequestTracker::new(window);
        self
    }

    /// Pull a host reading and store a new snapshot.
    ///
    /// On failure the previous snapshot stays current and history is untouched.
    ///
    /// # Errors
    ///
    /// Returns [`SamplingError`] if the host provider failed.
    pub fn refresh(&self) -> Result<SystemSnapshot, SamplingError> {
        let host = match self.provider.sample() {
            Ok(host) => host,
            Err(e) => {
                tracing::error!(error = %e, "Host sampling failed, keeping previous snapshot");
                return Err(e);
            }
        };

        let snapshot = {
            let mut state = self.lock_state();
            let snapshot =
                SystemSnapshot::new(self.clock.now(), host, state.tracker.snapshot());
            Self::store(&mut state, snapshot);
            snapshot
        };

        tracing::trace!(
            cpu = snapshot.cpu.usage_percent,
            memory = snapshot.memory.percent_used,
            "Snapshot refreshed"
        );
        self.bus.publish(&MonitorEvent::Metrics(snapshot));
        Ok(snapshot)
    }

    /// Record a completed request and store a snapshot with updated counters.
    ///
    /// Performs no I/O: the host portion is copied from the current snapshot.
    pub fn record_request(&self, elapsed_ms: f64, status_code: u16) -> SystemSnapshot {
        let snapshot = {
            let mut state = self.lock_state();
            state.tracker.record(elapsed_ms, status_code);
            let snapshot = SystemSnapshot::new(
                self.clock.now(),
                state.current.host(),
                state.tracker.snapshot(),
            );
            Self::store(&mut state, snapshot);
            snapshot
        };

        self.bus.publish(&MonitorEvent::Metrics(snapshot));
        snapshot
    }

    /// Copy of the current snapshot.
    #[must_use]
    pub fn current(&self) -> SystemSnapshot {
        self.lock_state().current
    }

    /// Current request counters.
    #[must_use]
    pub fn request_stats(&self) -> RequestStats {
        self.lock_state().tracker.snapshot()
    }

    /// Copy of the history matching `query`, oldest first.
    #[must_use]
    pub fn history(&self, query: &HistoryQuery) -> Vec<SystemSnapshot> {
        let limit = query.effective_limit();
        if limit == 0 {
            return Vec::new();
        }
        let state = self.lock_state();
        let mut matching: Vec<SystemSnapshot> = state
            .history
            .iter()
            .rev()
            .filter(|s| query.contains(s.timestamp))
            .take(limit)
            .copied()
            .collect();
        drop(state);
        matching.reverse();
        matching
    }

    /// Number of snapshots in history.
    #[must_use]
    pub fn history_len(&self) -> usize {
        self.lock_state().history.len()
    }

    /// Clear history and request counters and zero the current snapshot.
    pub fn reset(&self) {
        let mut state = self.lock_state();
        state.tracker.reset();
        state.history.clear();
        state.current = SystemSnapshot::empty(self.clock.now());
    }

    fn store(state: &mut CollectorState, snapshot: SystemSnapshot) {
        state.current = snapshot;
        state.history.push(snapshot);
    }

    fn lock_state(&self) -> MutexGuard<'_, CollectorState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poison_error) => {
                tracing::warn!(
                    error = %poison_error,
                    "Collector lock poisoned, using recovered data"
                );
                poison_error.into_inner()
            }
        }
    }
}

impl std::fmt::Debug for MetricsCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsCollector")
            .field("history_len", &self.history_len())
            .finish_non_exhaustive()
    }
}
