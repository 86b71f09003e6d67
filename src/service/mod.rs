//! The monitoring service.
//!
//! [`MonitoringService`] wires the collector, alert engine, event bus and
//! notification dispatcher into one explicitly owned instance. Two triggers
//! feed the same pipeline:
//!
//! ```text
//! request completion ─► record() ──────┐
//!                                      ├─► MetricsCollector ─► AlertEngine ─► EventBus
//! sampler task ───────► tick() ────────┘                                        │
//!                                                               alert ─► NotificationDispatcher
//! ```
//!
//! The request path never awaits. Notifications are spawned onto the current
//! tokio runtime and their failures are only logged.

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::alerts::{
    Alert, AlertEngine, AlertQuery, HealthReport, CRITICAL_ALERT_WINDOW,
    RECENT_ALERTS_IN_REPORT,
};
use crate::config::{Config, NotificationConfig};
use crate::events::{EventBus, EventKind, Handler, MonitorEvent, Publisher, SubscriptionId};
use crate::metrics::{HistoryQuery, MetricsCollector, SystemSnapshot};
use crate::notify::{build_channels, NotificationDispatcher};
use crate::traits::{Channel, HostStatsProvider, RealTimeProvider, TimeProvider};

/// One completed HTTP request, as reported by the instrumentation hook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestInfo {
    /// HTTP method.
    pub method: String,
    /// Request path.
    pub path: String,
    /// Response status code.
    pub status: u16,
    /// When the request started.
    pub start_time: DateTime<Utc>,
    /// `User-Agent` header, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Client address, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<String>,
}

struct Sampler {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Runtime observability service.
///
/// Construct one per process and share it by `Arc`. [`MonitoringService::reset`]
/// returns the instance to its freshly constructed state.
pub struct MonitoringService {
    clock: Arc<dyn TimeProvider>,
    bus: Arc<EventBus<MonitorEvent>>,
    collector: MetricsCollector,
    engine: AlertEngine,
    dispatcher: Arc<NotificationDispatcher>,
    sample_interval: Duration,
    sampler: Mutex<Option<Sampler>>,
}

impl MonitoringService {
    /// Create a service using the system clock.
    #[must_use]
    pub fn new(config: &Config, provider: Arc<dyn HostStatsProvider>) -> Arc<Self> {
        Self::with_clock(config, provider, Arc::new(RealTimeProvider))
    }

    /// Create a service with an explicit clock.
    #[must_use]
    pub fn with_clock(
        config: &Config,
        provider: Arc<dyn HostStatsProvider>,
        clock: Arc<dyn TimeProvider>,
    ) -> Arc<Self> {
        let bus = Arc::new(EventBus::new());
        let collector = MetricsCollector::new(provider, Arc::clone(&clock), Arc::clone(&bus))
            .with_history_capacity(config.history_capacity)
            .with_response_window(config.response_window);
        let engine = AlertEngine::new(Arc::clone(&clock), Arc::clone(&bus))
            .with_thresholds(config.thresholds)
            .with_cooldown(config.alert_cooldown())
            .with_capacity(config.history_capacity);
        let dispatcher = Arc::new(NotificationDispatcher::new(Duration::from_millis(
            config.notifications.send_timeout_ms,
        )));

        let service = Self {
            clock,
            bus,
            collector,
            engine,
            dispatcher,
            sample_interval: config.sample_interval(),
            sampler: Mutex::new(None),
        };
        service.subscribe_dispatcher();
        Arc::new(service)
    }

    fn subscribe_dispatcher(&self) {
        let dispatcher = Arc::clone(&self.dispatcher);
        let handler: Handler<MonitorEvent> = Arc::new(move |event: &MonitorEvent| {
            let MonitorEvent::Alert(alert) = event else {
                return;
            };
            if !NotificationDispatcher::should_notify(alert) {
                return;
            }
            match tokio::runtime::Handle::try_current() {
                Ok(runtime) => {
                    let dispatcher = Arc::clone(&dispatcher);
                    let alert = alert.clone();
                    runtime.spawn(async move {
                        dispatcher.send_notification(&alert).await;
                    });
                }
                Err(e) => {
                    warn!(alert_id = %alert.id, error = %e, "No runtime, notification dropped");
                }
            }
        });
        self.bus.subscribe(EventKind::Alert, handler);
    }

    /// Start the periodic sampler.
    ///
    /// Returns `false` if it is already running or no tokio runtime is
    /// available. The task holds only a weak reference, so dropping the last
    /// `Arc` also ends it.
    pub fn start(self: &Arc<Self>) -> bool {
        let mut sampler = self.lock_sampler();
        if sampler.as_ref().is_some_and(|s| !s.handle.is_finished()) {
            warn!("Sampler already running");
            return false;
        }
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                warn!(error = %e, "No runtime, sampler not started");
                return false;
            }
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = runtime.spawn(run_sampler(
            Arc::downgrade(self),
            self.sample_interval,
            shutdown_rx,
        ));
        *sampler = Some(Sampler {
            shutdown_tx,
            handle,
        });
        drop(sampler);

        info!(
            interval_ms = u64::try_from(self.sample_interval.as_millis()).unwrap_or(u64::MAX),
            "Sampler started"
        );
        true
    }

    /// Whether the sampler task is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.lock_sampler()
            .as_ref()
            .is_some_and(|s| !s.handle.is_finished())
    }

    /// Stop the sampler and wait for it to exit.
    pub async fn shutdown(&self) {
        let sampler = self.lock_sampler().take();
        if let Some(sampler) = sampler {
            let _ = sampler.shutdown_tx.send(true);
            if let Err(e) = sampler.handle.await {
                warn!(error = %e, "Sampler task ended abnormally");
            }
            info!("Sampler stopped");
        }
    }

    /// Stop the sampler, clear all state and drop every listener.
    ///
    /// The sampler task has exited before any state is cleared, so no tick
    /// lands after the reset. The dispatcher subscription is restored; its
    /// channel configuration is kept.
    pub async fn reset(&self) {
        self.shutdown().await;
        self.bus.clear();
        self.collector.reset();
        self.engine.clear();
        self.subscribe_dispatcher();
        info!("Monitoring service reset");
    }

    /// One sampler iteration: refresh from the host, then evaluate.
    ///
    /// Returns the alerts raised, or `None` if sampling failed.
    pub fn tick(&self) -> Option<Vec<Alert>> {
        let snapshot = self.collector.refresh().ok()?;
        Some(self.engine.evaluate(&snapshot))
    }

    /// Record a completed request that started at `start_time`.
    pub fn record(&self, start_time: DateTime<Utc>, status: u16) {
        let elapsed = self.clock.now() - start_time;
        #[allow(clippy::cast_precision_loss)]
        let elapsed_ms = elapsed.num_microseconds().map_or_else(
            || elapsed.num_milliseconds() as f64,
            |us| us as f64 / 1000.0,
        );
        self.record_elapsed_ms(elapsed_ms, status);
    }

    /// Record a completed request that took `elapsed`.
    pub fn record_elapsed(&self, elapsed: Duration, status: u16) {
        self.record_elapsed_ms(elapsed.as_secs_f64() * 1000.0, status);
    }

    /// Record a completed request described by `info`.
    pub fn record_request(&self, info: &RequestInfo) {
        debug!(
            method = %info.method,
            path = %info.path,
            status = info.status,
            user_agent = info.user_agent.as_deref().unwrap_or("-"),
            client_ip = info.client_ip.as_deref().unwrap_or("-"),
            "Request completed"
        );
        self.record(info.start_time, info.status);
    }

    fn record_elapsed_ms(&self, elapsed_ms: f64, status: u16) {
        let snapshot = self.collector.record_request(elapsed_ms, status);
        self.engine.evaluate(&snapshot);
    }

    /// Copy of the current snapshot.
    #[must_use]
    pub fn current_snapshot(&self) -> SystemSnapshot {
        self.collector.current()
    }

    /// Snapshot history matching `query`, oldest first.
    #[must_use]
    pub fn history(&self, query: &HistoryQuery) -> Vec<SystemSnapshot> {
        self.collector.history(query)
    }

    /// Alerts matching `query`, oldest first.
    #[must_use]
    pub fn alerts(&self, query: &AlertQuery) -> Vec<Alert> {
        self.engine.alerts(query)
    }

    /// Empty the alert log.
    pub fn clear_alerts(&self) {
        self.engine.clear();
    }

    /// Classify health from the current snapshot and recent alerts.
    #[must_use]
    pub fn health(&self) -> HealthReport {
        let now = self.clock.now();
        let mut alerts = self.engine.alerts_since(now - CRITICAL_ALERT_WINDOW);
        if alerts.len() < RECENT_ALERTS_IN_REPORT {
            alerts = self.engine.alerts(&AlertQuery::recent(RECENT_ALERTS_IN_REPORT));
        }
        HealthReport::new(&self.collector.current(), &alerts, now)
    }

    /// Register an event handler.
    pub fn subscribe(&self, kind: EventKind, handler: Handler<MonitorEvent>) -> SubscriptionId {
        self.bus.subscribe(kind, handler)
    }

    /// Remove an event handler.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    /// Build and initialize the channels enabled in `config`.
    pub async fn configure_notifications(&self, config: &NotificationConfig) {
        self.configure_channels(build_channels(config)).await;
    }

    /// Initialize an explicit set of channels.
    pub async fn configure_channels(&self, channels: Vec<Arc<dyn Channel>>) {
        self.dispatcher.configure(channels).await;
    }

    /// The notification dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> &NotificationDispatcher {
        &self.dispatcher
    }

    fn lock_sampler(&self) -> MutexGuard<'_, Option<Sampler>> {
        match self.sampler.lock() {
            Ok(guard) => guard,
            Err(poison_error) => {
                warn!(error = %poison_error, "Sampler lock poisoned, using recovered data");
                poison_error.into_inner()
            }
        }
    }
}

impl std::fmt::Debug for MonitoringService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitoringService")
            .field("collector", &self.collector)
            .field("engine", &self.engine)
            .field("dispatcher", &self.dispatcher)
            .field("sample_interval", &self.sample_interval)
            .finish_non_exhaustive()
    }
}

async fn run_sampler(
    service: Weak<MonitoringService>,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(period.max(Duration::from_millis(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // Skip the first immediate tick
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let Some(service) = service.upgrade() else {
                    debug!("Service dropped, sampler exiting");
                    break;
                };
                service.tick();
            }
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }
}
