//! Engine state and the per-tick state machine.
//!
//! All mutation of the snapshot, mode and failure counter happens here, one
//! tick at a time. A tick that finds another one in flight is skipped.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

use spawnkit_core::provider::DemoProvider;
use spawnkit_core::{
    CanonicalSnapshot, Error as CoreError, Mode, NamingRegistry, NormalizeOptions, RawPayload, TelemetryProvider,
    diff, normalize,
};

use crate::config::EngineConfig;
use crate::events::{EngineEvent, EventBus};
use crate::utils::now_ms;

/// What a single tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Live data stored; `events` change events were published.
    Refreshed { events: usize },
    /// The provider call failed and the engine stayed in its mode.
    Failed { consecutive_failures: u32 },
    /// The provider was found unavailable; synthetic data is now shown.
    EnteredDemo,
    /// A demo-mode probe succeeded and live data is back.
    Reconnected,
    /// Demo data regenerated.
    DemoRefreshed { events: usize },
    /// Another tick was in flight.
    Skipped,
}

/// Point-in-time view of the engine for diagnostics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugInfo {
    pub provider: String,
    pub mode: Mode,
    pub live: bool,
    pub refresh_count: u64,
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
    pub last_refresh_at_ms: Option<i64>,
    pub agents: usize,
    pub subtasks: usize,
    pub missions: usize,
    pub crons: usize,
    pub listeners: BTreeMap<String, usize>,
}

#[derive(Debug, Default)]
struct EngineState {
    snapshot: Option<Arc<CanonicalSnapshot>>,
    mode: Mode,
    consecutive_failures: u32,
    refresh_count: u64,
    last_error: Option<String>,
    last_refresh_at_ms: Option<i64>,
}

/// Clears the in-flight flag when the tick ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub(crate) struct Engine {
    config: EngineConfig,
    provider: Arc<dyn TelemetryProvider>,
    demo: DemoProvider,
    naming: Mutex<NamingRegistry>,
    state: RwLock<EngineState>,
    bus: EventBus,
    in_flight: AtomicBool,
}

impl Engine {
    pub(crate) fn new(config: EngineConfig, provider: Arc<dyn TelemetryProvider>) -> Self {
        Self {
            config,
            provider,
            demo: DemoProvider::default(),
            naming: Mutex::new(NamingRegistry::new()),
            state: RwLock::new(EngineState::default()),
            bus: EventBus::new(),
            in_flight: AtomicBool::new(false),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    fn read_state(&self) -> RwLockReadGuard<'_, EngineState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, EngineState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn naming(&self) -> MutexGuard<'_, NamingRegistry> {
        self.naming.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn provider(&self) -> &Arc<dyn TelemetryProvider> {
        &self.provider
    }

    pub(crate) fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub(crate) fn mode(&self) -> Mode {
        self.read_state().mode
    }

    pub(crate) fn refresh_count(&self) -> u64 {
        self.read_state().refresh_count
    }

    /// Current snapshot; empty until the first successful tick.
    pub(crate) fn snapshot(&self) -> Arc<CanonicalSnapshot> {
        self.read_state().snapshot.clone().unwrap_or_default()
    }

    pub(crate) fn debug_info(&self, live: bool) -> DebugInfo {
        let state = self.read_state();
        let snapshot = state.snapshot.clone().unwrap_or_default();
        DebugInfo {
            provider: self.provider.name().to_string(),
            mode: state.mode,
            live,
            refresh_count: state.refresh_count,
            consecutive_failures: state.consecutive_failures,
            last_error: state.last_error.clone(),
            last_refresh_at_ms: state.last_refresh_at_ms,
            agents: snapshot.agents.len(),
            subtasks: snapshot.subtasks.len(),
            missions: snapshot.missions.len(),
            crons: snapshot.crons.len(),
            listeners: self.bus.listener_counts(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Ticks
    // ─────────────────────────────────────────────────────────────────────────

    /// First refresh. Probes availability on the first failure instead of
    /// waiting for the failure threshold.
    pub(crate) async fn bootstrap(&self) -> TickOutcome {
        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            return TickOutcome::Skipped;
        };
        match self.mode() {
            Mode::Live => self.live_tick(true).await,
            Mode::Demo => self.demo_tick().await,
        }
    }

    /// One scheduled or forced tick.
    pub(crate) async fn tick(&self) -> TickOutcome {
        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            debug!("Tick skipped; previous tick still in flight");
            return TickOutcome::Skipped;
        };
        match self.mode() {
            Mode::Live => self.live_tick(false).await,
            Mode::Demo => self.demo_tick().await,
        }
    }

    /// Apply a payload pushed out-of-band by the provider.
    pub(crate) fn apply_push(&self, raw: RawPayload) -> TickOutcome {
        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            debug!("Pushed update dropped; a refresh is in flight");
            return TickOutcome::Skipped;
        };
        if self.mode() == Mode::Demo {
            debug!("Pushed update ignored in demo mode");
            return TickOutcome::Skipped;
        }
        let snapshot = self.normalize(&raw);
        self.record_success();
        let events = self.publish(snapshot);
        TickOutcome::Refreshed { events }
    }

    async fn live_tick(&self, probe_on_first_failure: bool) -> TickOutcome {
        let err = match self.fetch_live().await {
            Ok(raw) => {
                if !raw.soft_errors.is_empty() {
                    warn!(
                        provider = self.provider.name(),
                        errors = %raw.soft_error_summary(),
                        "Partial refresh"
                    );
                }
                let snapshot = self.normalize(&raw);
                self.record_success();
                let events = self.publish(snapshot);
                return TickOutcome::Refreshed { events };
            }
            Err(err) => err,
        };

        let failures = self.record_failure(&err);
        warn!(
            provider = self.provider.name(),
            consecutive_failures = failures,
            error = %err,
            "Refresh failed"
        );

        let threshold = self.config.failure_threshold_for_mode_check;
        if probe_on_first_failure || failures % threshold == 0 {
            if !self.probe().await {
                self.enter_demo(format!(
                    "provider unavailable after {} consecutive failure(s)",
                    failures
                ));
                return TickOutcome::EnteredDemo;
            }
            info!(provider = self.provider.name(), "Provider still available; staying live");
        }
        TickOutcome::Failed {
            consecutive_failures: failures,
        }
    }

    async fn demo_tick(&self) -> TickOutcome {
        if self.probe().await {
            match self.fetch_live().await {
                Ok(raw) => {
                    let snapshot = self.normalize(&raw);
                    self.switch_mode(Mode::Live, snapshot, "reconnected".to_string());
                    return TickOutcome::Reconnected;
                }
                Err(e) => debug!(error = %e, "Provider reachable but fetch failed; staying in demo"),
            }
        }

        let snapshot = self.normalize(&self.demo.generate(now_ms()));
        let events = self.publish(snapshot);
        TickOutcome::DemoRefreshed { events }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────────────────

    async fn fetch_live(&self) -> spawnkit_core::Result<RawPayload> {
        let timeout = self.config.fetch_timeout();
        match tokio::time::timeout(timeout, self.provider.fetch_all()).await {
            Ok(result) => result,
            Err(_) => Err(CoreError::unavailable(
                self.provider.name(),
                format!("no response within {}ms", timeout.as_millis()),
            )),
        }
    }

    async fn probe(&self) -> bool {
        tokio::time::timeout(self.config.fetch_timeout(), self.provider.is_available())
            .await
            .unwrap_or(false)
    }

    fn normalize(&self, raw: &RawPayload) -> CanonicalSnapshot {
        let options = NormalizeOptions {
            now_ms: now_ms(),
            recency_window_ms: i64::try_from(self.config.recency_window_ms).unwrap_or(i64::MAX),
            max_missions: self.config.max_missions,
        };
        let normalized = normalize(raw, &self.naming(), &options);
        if !normalized.diagnostics.is_empty() {
            debug!(count = normalized.diagnostics.len(), "Payload normalized with defaults");
        }
        normalized.snapshot
    }

    fn record_success(&self) {
        let mut state = self.write_state();
        state.consecutive_failures = 0;
        state.last_error = None;
    }

    fn record_failure(&self, err: &CoreError) -> u32 {
        let mut state = self.write_state();
        state.consecutive_failures = state.consecutive_failures.saturating_add(1);
        state.last_error = Some(err.to_string());
        state.consecutive_failures
    }

    /// Diff against the stored snapshot, publish changes, swap, then announce
    /// the refresh. Returns the number of change events.
    fn publish(&self, next: CanonicalSnapshot) -> usize {
        let previous = self.read_state().snapshot.clone();
        let changes = diff(previous.as_deref(), &next);
        let count = changes.len();
        for change in changes {
            self.bus.emit(&EngineEvent::Change(change));
        }

        let next = Arc::new(next);
        self.store(Arc::clone(&next), None);
        self.bus.emit(&EngineEvent::DataRefresh { snapshot: next });
        count
    }

    fn enter_demo(&self, reason: String) {
        let snapshot = self.normalize(&self.demo.generate(now_ms()));
        self.switch_mode(Mode::Demo, snapshot, reason);
    }

    /// Mode transitions replace the snapshot without diff events.
    fn switch_mode(&self, mode: Mode, next: CanonicalSnapshot, reason: String) {
        let next = Arc::new(next);
        self.store(Arc::clone(&next), Some(mode));
        info!(mode = %mode, reason = %reason, "Mode changed");

        self.bus.emit(&EngineEvent::ModeChanged {
            mode,
            snapshot: Arc::clone(&next),
            reason,
        });
        self.bus.emit(&EngineEvent::DataRefresh { snapshot: next });
    }

    fn store(&self, snapshot: Arc<CanonicalSnapshot>, mode: Option<Mode>) {
        let mut state = self.write_state();
        state.last_refresh_at_ms = Some(snapshot.generated_at_ms);
        state.snapshot = Some(snapshot);
        state.refresh_count += 1;
        if let Some(mode) = mode {
            state.mode = mode;
            state.consecutive_failures = 0;
        }
    }
}
