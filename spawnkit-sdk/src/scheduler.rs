//! Live update loop.
//!
//! Owns the single background task that drives [`Engine::tick`] on the
//! interval for the current mode, and forwards pushed updates from
//! providers that offer a push channel.

use std::sync::Arc;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use spawnkit_core::{Mode, RawPayload};

use crate::engine::{Engine, TickOutcome};
use crate::events::EngineEvent;

type Updates = mpsc::Receiver<RawPayload>;

struct RunningLoop {
    shutdown_tx: oneshot::Sender<()>,
    join: JoinHandle<Option<Updates>>,
}

#[derive(Default)]
struct SchedulerState {
    running: Option<RunningLoop>,
    /// Push receiver parked between runs.
    updates: Option<Updates>,
    updates_claimed: bool,
}

#[derive(Default)]
pub(crate) struct LiveScheduler {
    state: Mutex<SchedulerState>,
}

impl LiveScheduler {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn is_running(&self) -> bool {
        self.state.lock().await.running.is_some()
    }

    /// Start the loop. Returns `false` if it was already running.
    pub(crate) async fn start(&self, engine: Arc<Engine>) -> bool {
        let mut state = self.state.lock().await;
        if state.running.is_some() {
            info!("Live updates already running");
            return false;
        }

        if !state.updates_claimed {
            state.updates = engine.provider().take_updates();
            state.updates_claimed = true;
        }

        let mode = engine.mode();
        let interval = engine.config().interval_for(mode);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let join = tokio::spawn(run_loop(Arc::clone(&engine), shutdown_rx, state.updates.take()));
        state.running = Some(RunningLoop { shutdown_tx, join });
        drop(state);

        info!(interval_ms = interval.as_millis() as u64, mode = %mode, "Live updates started");
        engine.bus().emit(&EngineEvent::LiveStarted {
            interval_ms: interval.as_millis() as u64,
            mode,
            refresh_count: engine.refresh_count(),
        });
        true
    }

    /// Stop the loop and wait for it to exit. No tick fires after this
    /// returns. Returns `false` if nothing was running.
    pub(crate) async fn stop(&self, engine: &Engine) -> bool {
        let mut state = self.state.lock().await;
        let Some(running) = state.running.take() else {
            return false;
        };

        // The loop may already have exited; a closed channel is fine.
        let _ = running.shutdown_tx.send(());
        match running.join.await {
            Ok(updates) => state.updates = updates,
            Err(e) => warn!(error = %e, "Live update task ended abnormally"),
        }
        drop(state);

        let mode = engine.mode();
        info!(refresh_count = engine.refresh_count(), "Live updates stopped");
        engine.bus().emit(&EngineEvent::LiveStopped {
            interval_ms: engine.config().interval_for(mode).as_millis() as u64,
            mode,
            refresh_count: engine.refresh_count(),
        });
        true
    }
}

impl Drop for LiveScheduler {
    fn drop(&mut self) {
        if let Some(running) = self.state.get_mut().running.take() {
            running.join.abort();
        }
    }
}

fn interval_for(engine: &Engine, mode: Mode) -> Interval {
    let period = engine.config().interval_for(mode);
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

async fn next_update(updates: &mut Option<Updates>) -> Option<RawPayload> {
    match updates {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn run_loop(engine: Arc<Engine>, mut shutdown_rx: oneshot::Receiver<()>, mut updates: Option<Updates>) -> Option<Updates> {
    let mut mode = engine.mode();
    let mut ticker = interval_for(&engine, mode);

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown_rx => {
                debug!("Live loop received shutdown");
                break;
            }

            _ = ticker.tick() => {
                let outcome = engine.tick().await;
                debug!(?outcome, "Scheduled tick");
            }

            pushed = next_update(&mut updates) => {
                match pushed {
                    Some(raw) => {
                        if let TickOutcome::Refreshed { events } = engine.apply_push(raw) {
                            debug!(events, "Applied pushed update");
                        }
                    }
                    None => {
                        debug!("Push channel closed");
                        updates = None;
                    }
                }
            }
        }

        let current = engine.mode();
        if current != mode {
            mode = current;
            ticker = interval_for(&engine, mode);
            debug!(mode = %mode, interval_ms = engine.config().interval_for(mode).as_millis() as u64, "Rescheduled for mode");
        }
    }

    updates
}
