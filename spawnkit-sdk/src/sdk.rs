//! Main SDK Entry Point
//!
//! [`SpawnKit`] ties a provider, the engine and the live scheduler together
//! behind one handle.

use std::sync::Arc;
use tracing::info;

use spawnkit_core::naming::{RoleInfo, RoleListing};
use spawnkit_core::{
    CanonicalSnapshot, Mode, NamingRecord, ParentKey, RoleRegistration, TelemetryProvider,
};

use crate::engine::{DebugInfo, Engine, TickOutcome};
use crate::events::{EngineEvent, SubscriptionId};
use crate::scheduler::LiveScheduler;
use crate::{EngineConfig, SDKResult};

/// Telemetry engine handle.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use spawnkit_core::provider::LocalProvider;
/// use spawnkit_sdk::{EngineConfig, SpawnKit};
///
/// async fn example() -> spawnkit_sdk::SDKResult<()> {
///     let kit = SpawnKit::new(Arc::new(LocalProvider::discover()?), EngineConfig::default())?;
///     kit.subscribe("agent:status", |event| println!("{:?}", event));
///     kit.init().await;
///
///     let name = kit.allocate("forge", "CodeBuilder")?;
///     println!("{}", name);
///
///     kit.shutdown().await;
///     Ok(())
/// }
/// ```
pub struct SpawnKit {
    engine: Arc<Engine>,
    scheduler: LiveScheduler,
}

impl SpawnKit {
    /// Create a new engine handle. Nothing is fetched until [`init`](Self::init)
    /// or [`refresh`](Self::refresh).
    ///
    /// # Errors
    ///
    /// Returns an error if configuration validation fails.
    pub fn new(provider: Arc<dyn TelemetryProvider>, config: EngineConfig) -> SDKResult<Self> {
        config.validate()?;
        Ok(Self {
            engine: Arc::new(Engine::new(config, provider)),
            scheduler: LiveScheduler::new(),
        })
    }

    /// Run the first refresh, falling back to demo data if the provider is
    /// unreachable, then start live updates when `auto_start` is set.
    pub async fn init(&self) -> TickOutcome {
        let outcome = self.engine.bootstrap().await;
        info!(
            provider = self.engine.provider().name(),
            mode = %self.engine.mode(),
            ?outcome,
            "Engine initialized"
        );
        if self.engine.config().auto_start {
            self.start_live().await;
        }
        outcome
    }

    /// Force one tick now.
    pub async fn refresh(&self) -> TickOutcome {
        self.engine.tick().await
    }

    /// Start the live loop. Returns `false` if it was already running.
    pub async fn start_live(&self) -> bool {
        self.scheduler.start(Arc::clone(&self.engine)).await
    }

    /// Stop the live loop and wait for it to exit.
    pub async fn stop_live(&self) -> bool {
        self.scheduler.stop(&self.engine).await
    }

    pub async fn is_live(&self) -> bool {
        self.scheduler.is_running().await
    }

    /// Stop everything. Safe to call more than once.
    pub async fn shutdown(&self) {
        self.stop_live().await;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // State
    // ─────────────────────────────────────────────────────────────────────────

    /// Latest snapshot; empty before the first refresh.
    pub fn snapshot(&self) -> Arc<CanonicalSnapshot> {
        self.engine.snapshot()
    }

    pub fn mode(&self) -> Mode {
        self.engine.mode()
    }

    pub fn config(&self) -> &EngineConfig {
        self.engine.config()
    }

    pub async fn debug_info(&self) -> DebugInfo {
        let live = self.is_live().await;
        self.engine.debug_info(live)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Events
    // ─────────────────────────────────────────────────────────────────────────

    pub fn subscribe<F>(&self, topic: &str, handler: F) -> SubscriptionId
    where
        F: Fn(&EngineEvent) + Send + Sync + 'static,
    {
        self.engine.bus().subscribe(topic, handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.engine.bus().unsubscribe(id)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Naming
    // ─────────────────────────────────────────────────────────────────────────

    /// Allocate a structured name for a new sub-task. Names visible in the
    /// current snapshot count as taken.
    pub fn allocate(&self, parent: &str, role: &str) -> SDKResult<NamingRecord> {
        let snapshot = self.engine.snapshot();
        let mut naming = self.engine.naming();
        let observed: Vec<NamingRecord> = snapshot
            .subtasks
            .iter()
            .filter_map(|s| s.structured_name.as_deref())
            .filter_map(|name| naming.parse(name))
            .collect();
        Ok(naming.allocate(parent, role, &observed)?)
    }

    pub fn register_role(&self, name: &str, registration: RoleRegistration) -> SDKResult<RoleInfo> {
        Ok(self.engine.naming().register_role(name, registration)?)
    }

    pub fn parse(&self, name: &str) -> Option<NamingRecord> {
        self.engine.naming().parse(name)
    }

    pub fn abbreviated(&self, record: &NamingRecord) -> Option<String> {
        self.engine.naming().abbreviated(record)
    }

    pub fn migrate_legacy(&self, label: Option<&str>, parent: Option<&str>) -> Option<NamingRecord> {
        self.engine.naming().migrate_legacy(label, parent)
    }

    pub fn list_roles(&self) -> RoleListing {
        self.engine.naming().list_roles()
    }

    pub fn role_info(&self, role: &str) -> Option<RoleInfo> {
        self.engine.naming().role_info(role)
    }

    /// Roles that may run under `parent`.
    pub fn available_roles(&self, parent: &str) -> SDKResult<Vec<RoleInfo>> {
        let parent: ParentKey = parent.parse()?;
        Ok(self.engine.naming().available_roles(parent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{TOPIC_DATA_REFRESH, TOPIC_LIVE_STARTED};
    use crate::testing::ScriptedProvider;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_test::{assert_err, assert_ok};

    fn kit(provider: &Arc<ScriptedProvider>, config: EngineConfig) -> SpawnKit {
        SpawnKit::new(Arc::clone(provider) as Arc<dyn TelemetryProvider>, config).unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let provider: Arc<dyn TelemetryProvider> = Arc::new(ScriptedProvider::new());
        let Err(err) = SpawnKit::new(provider, EngineConfig::default().with_intervals(0, 100)) else {
            panic!("zero interval accepted");
        };
        assert!(err.is_config());
    }

    #[tokio::test]
    async fn test_snapshot_is_empty_before_first_refresh() {
        let provider = Arc::new(ScriptedProvider::new().with_main_status("active"));
        let kit = kit(&provider, EngineConfig::default());
        assert!(kit.snapshot().agents.is_empty());
        assert_eq!(kit.mode(), Mode::Live);
    }

    #[tokio::test(start_paused = true)]
    async fn test_init_falls_back_to_demo_and_starts_live() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.set_failing(true);
        provider.set_available(false);
        let kit = kit(&provider, EngineConfig::default());

        let started = Arc::new(AtomicUsize::new(0));
        let s = Arc::clone(&started);
        kit.subscribe(TOPIC_LIVE_STARTED, move |event| {
            if let EngineEvent::LiveStarted { mode, interval_ms, .. } = event {
                assert_eq!(*mode, Mode::Demo);
                assert_eq!(*interval_ms, 30_000);
            }
            s.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(kit.init().await, TickOutcome::EnteredDemo);
        assert!(kit.is_live().await);
        assert_eq!(started.load(Ordering::SeqCst), 1);
        assert!(!kit.snapshot().agents.is_empty());

        kit.shutdown().await;
        assert!(!kit.is_live().await);
        kit.shutdown().await;
    }

    #[tokio::test]
    async fn test_init_without_auto_start() {
        let provider = Arc::new(ScriptedProvider::new().with_main_status("active"));
        let kit = kit(&provider, EngineConfig::default().with_auto_start(false));

        assert_eq!(kit.init().await, TickOutcome::Refreshed { events: 0 });
        assert!(!kit.is_live().await);
        assert_eq!(kit.snapshot().agents[0].id, "main");
    }

    #[tokio::test]
    async fn test_unsubscribed_handler_is_not_called() {
        let provider = Arc::new(ScriptedProvider::new());
        let kit = kit(&provider, EngineConfig::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let id = kit.subscribe(TOPIC_DATA_REFRESH, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        kit.refresh().await;
        assert!(kit.unsubscribe(id));
        kit.refresh().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!kit.unsubscribe(id));
    }

    #[tokio::test]
    async fn test_allocate_skips_names_in_snapshot() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.set_sessions(json!([
            {"key": "agent:forge:subagent:x1", "structuredName": "Forge.CodeBuilder-04", "label": "Port the parser", "status": "active"}
        ]));
        let kit = kit(&provider, EngineConfig::default());
        kit.refresh().await;

        let record = assert_ok!(kit.allocate("forge", "CodeBuilder"));
        assert_eq!(record.to_string(), "Forge.CodeBuilder-05");
        assert_eq!(kit.abbreviated(&record).as_deref(), Some("F.CB-05"));
        let next = assert_ok!(kit.allocate("Forge", "CodeBuilder"));
        assert_eq!(next.to_string(), "Forge.CodeBuilder-06");

        let err = assert_err!(kit.allocate("echo", "CodeBuilder"));
        assert!(err.is_naming());
    }

    #[tokio::test]
    async fn test_registered_role_is_allocatable() {
        let provider = Arc::new(ScriptedProvider::new());
        let kit = kit(&provider, EngineConfig::default());

        let info = assert_ok!(kit.register_role(
            "Translator",
            RoleRegistration::new("TL", &["echo", "hunter"]).with_description("Localizes copy"),
        ));
        assert_eq!(info.abbreviation, "TL");
        assert_eq!(kit.list_roles().custom.len(), 1);
        assert_eq!(kit.role_info("Translator").map(|r| r.category), Some("custom".to_string()));
        assert!(assert_ok!(kit.available_roles("hunter")).iter().any(|r| r.name == "Translator"));
        assert!(kit.available_roles("nobody").unwrap_err().is_naming());

        let record = assert_ok!(kit.allocate("echo", "Translator"));
        assert_eq!(record.to_string(), "Echo.Translator-01");
        assert_eq!(kit.parse("Echo.Translator-01"), Some(record));

        let err = assert_err!(kit.register_role("CodeBuilder", RoleRegistration::new("ZZ", &["forge"])));
        assert!(err.is_naming());
    }

    #[tokio::test]
    async fn test_debug_info_reports_state() {
        let provider = Arc::new(ScriptedProvider::new().with_main_status("active"));
        let kit = kit(&provider, EngineConfig::default());
        kit.subscribe(TOPIC_DATA_REFRESH, |_| {});
        kit.refresh().await;

        let info = kit.debug_info().await;
        assert_eq!(info.provider, "scripted");
        assert_eq!(info.mode, Mode::Live);
        assert!(!info.live);
        assert_eq!(info.refresh_count, 1);
        assert_eq!(info.agents, 1);
        assert_eq!(info.listeners.get(TOPIC_DATA_REFRESH), Some(&1));

        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["refreshCount"], 1);
        assert_eq!(value["mode"], "live");
    }
}
