//! Engine events and the bus they are published on.

mod bus;

pub use bus::{EventBus, SubscriptionId};

use std::sync::Arc;

use spawnkit_core::diff::{TOPIC_AGENT_STATUS, TOPIC_CRON_TRIGGER, TOPIC_MISSION_NEW, TOPIC_SUBAGENT_SPAWN};
use spawnkit_core::{CanonicalSnapshot, ChangeEvent, Mode};

pub const TOPIC_DATA_REFRESH: &str = "data:refresh";
pub const TOPIC_MODE_LIVE: &str = "mode:live";
pub const TOPIC_MODE_DEMO: &str = "mode:demo";
pub const TOPIC_LIVE_STARTED: &str = "live:started";
pub const TOPIC_LIVE_STOPPED: &str = "live:stopped";

/// Every topic the engine publishes on.
pub const ALL_TOPICS: [&str; 9] = [
    TOPIC_DATA_REFRESH,
    TOPIC_MODE_LIVE,
    TOPIC_MODE_DEMO,
    TOPIC_AGENT_STATUS,
    TOPIC_SUBAGENT_SPAWN,
    TOPIC_MISSION_NEW,
    TOPIC_CRON_TRIGGER,
    TOPIC_LIVE_STARTED,
    TOPIC_LIVE_STOPPED,
];

#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// A new snapshot was stored.
    DataRefresh { snapshot: Arc<CanonicalSnapshot> },
    /// Mode switched; `reason` says why.
    ModeChanged {
        mode: Mode,
        snapshot: Arc<CanonicalSnapshot>,
        reason: String,
    },
    /// One change detected by the diff engine.
    Change(ChangeEvent),
    LiveStarted {
        interval_ms: u64,
        mode: Mode,
        refresh_count: u64,
    },
    LiveStopped {
        interval_ms: u64,
        mode: Mode,
        refresh_count: u64,
    },
}

impl EngineEvent {
    pub fn topic(&self) -> &'static str {
        match self {
            EngineEvent::DataRefresh { .. } => TOPIC_DATA_REFRESH,
            EngineEvent::ModeChanged { mode: Mode::Live, .. } => TOPIC_MODE_LIVE,
            EngineEvent::ModeChanged { mode: Mode::Demo, .. } => TOPIC_MODE_DEMO,
            EngineEvent::Change(change) => change.topic(),
            EngineEvent::LiveStarted { .. } => TOPIC_LIVE_STARTED,
            EngineEvent::LiveStopped { .. } => TOPIC_LIVE_STOPPED,
        }
    }

    /// Snapshot carried by the event, if any.
    pub fn snapshot(&self) -> Option<&Arc<CanonicalSnapshot>> {
        match self {
            EngineEvent::DataRefresh { snapshot } | EngineEvent::ModeChanged { snapshot, .. } => Some(snapshot),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topics() {
        let snapshot = Arc::new(CanonicalSnapshot::default());
        let demo = EngineEvent::ModeChanged {
            mode: Mode::Demo,
            snapshot: Arc::clone(&snapshot),
            reason: "unavailable".into(),
        };
        assert_eq!(demo.topic(), TOPIC_MODE_DEMO);
        assert!(demo.snapshot().is_some());

        let stopped = EngineEvent::LiveStopped {
            interval_ms: 10_000,
            mode: Mode::Live,
            refresh_count: 3,
        };
        assert_eq!(stopped.topic(), TOPIC_LIVE_STOPPED);
        assert!(stopped.snapshot().is_none());

        let change = EngineEvent::Change(ChangeEvent::CronTrigger {
            cron_id: "c".into(),
            name: "n".into(),
            last_status: None,
        });
        assert_eq!(change.topic(), TOPIC_CRON_TRIGGER);
        assert!(ALL_TOPICS.contains(&change.topic()));
    }
}
