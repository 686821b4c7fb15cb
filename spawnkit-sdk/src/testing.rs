//! Scripted provider for engine and scheduler tests.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

use spawnkit_core::{Error, RawPayload, Result, TelemetryProvider};

pub(crate) struct ScriptedProvider {
    sessions: Mutex<Value>,
    failing: AtomicBool,
    available: AtomicBool,
    delay: Mutex<Option<Duration>>,
    pub(crate) fetches: AtomicUsize,
    pub(crate) probes: AtomicUsize,
    updates: Mutex<Option<mpsc::Receiver<RawPayload>>>,
}

impl ScriptedProvider {
    pub(crate) fn new() -> Self {
        Self {
            sessions: Mutex::new(json!([])),
            failing: AtomicBool::new(false),
            available: AtomicBool::new(true),
            delay: Mutex::new(None),
            fetches: AtomicUsize::new(0),
            probes: AtomicUsize::new(0),
            updates: Mutex::new(None),
        }
    }

    /// Main agent with the given reported status.
    pub(crate) fn with_main_status(self, status: &str) -> Self {
        self.set_main_status(status);
        self
    }

    pub(crate) fn with_push(self) -> (Self, mpsc::Sender<RawPayload>) {
        let (tx, rx) = mpsc::channel(8);
        *self.updates.lock().unwrap() = Some(rx);
        (self, tx)
    }

    pub(crate) fn set_main_status(&self, status: &str) {
        *self.sessions.lock().unwrap() = main_sessions(status);
    }

    pub(crate) fn set_sessions(&self, sessions: Value) {
        *self.sessions.lock().unwrap() = sessions;
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub(crate) fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub(crate) fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

pub(crate) fn main_sessions(status: &str) -> Value {
    json!([{"key": "agent:main:main", "label": "Review the release notes", "status": status, "totalTokens": 100}])
}

pub(crate) fn payload(sessions: Value) -> RawPayload {
    RawPayload {
        sessions,
        crons: json!([]),
        memory: json!({}),
        ..Default::default()
    }
}

#[async_trait]
impl TelemetryProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn fetch_all(&self) -> Result<RawPayload> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::unavailable("scripted", "connection refused"));
        }
        let sessions = self.sessions.lock().unwrap().clone();
        Ok(payload(sessions))
    }

    async fn is_available(&self) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.available.load(Ordering::SeqCst)
    }

    fn take_updates(&self) -> Option<mpsc::Receiver<RawPayload>> {
        self.updates.lock().unwrap().take()
    }
}
