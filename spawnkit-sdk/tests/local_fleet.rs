//! End-to-end runs of the facade over an on-disk state directory.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use spawnkit_core::provider::LocalProvider;
use spawnkit_core::{AgentStatus, ChangeEvent, Mode, RawPayload, SubTaskStatus};
use spawnkit_sdk::{EngineConfig, EngineEvent, SpawnKit, TickOutcome};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio_test::assert_ok;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn fleet_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(
        root,
        "agents/main/sessions/sessions.json",
        r#"[{"key": "agent:main:main", "label": "Triage the incoming bug reports", "status": "active", "totalTokens": 1200}]"#,
    );
    write(
        root,
        "agents/forge/sessions/sessions.json",
        r#"{"agent:forge:subagent:a1": {"structuredName": "Forge.CodeBuilder-03", "label": "Port the parser", "status": "running", "totalTokens": 300}}"#,
    );
    write(
        root,
        "cron/jobs.json",
        r#"[{"id": "brief", "name": "Morning Brief", "scheduleExpr": "0 6 * * *", "state": {"lastStatus": "ok"}}]"#,
    );
    write(root, "workspace/MEMORY.md", "# Fleet memory");
    write(root, "workspace/TODO.md", "- ship it");
    dir
}

fn manual() -> EngineConfig {
    EngineConfig::default().with_auto_start(false)
}

#[tokio::test]
async fn test_local_fleet_snapshot() {
    let dir = fleet_dir();
    let kit = assert_ok!(SpawnKit::new(Arc::new(LocalProvider::new(dir.path())), manual()));

    assert_eq!(kit.init().await, TickOutcome::Refreshed { events: 0 });
    assert_eq!(kit.mode(), Mode::Live);

    let snapshot = kit.snapshot();
    let main = snapshot.agent("main").unwrap();
    assert_eq!(main.status, AgentStatus::Active);
    assert_eq!(main.current_task, "Triage the incoming bug reports");

    assert_eq!(snapshot.subtasks.len(), 1);
    assert_eq!(snapshot.subtasks[0].status, SubTaskStatus::Running);
    assert_eq!(snapshot.subtasks[0].role_id.as_deref(), Some("CodeBuilder"));

    // One sub-task mission, then one agent mission.
    assert_eq!(snapshot.missions.len(), 2);
    assert_eq!(snapshot.metrics.total_tokens, 1500);
    assert_eq!(snapshot.metrics.active_subtasks, 1);

    let cron = snapshot.cron("brief").unwrap();
    assert_eq!(cron.human_readable_schedule, "6:00 AM daily");
    assert_eq!(cron.last_status.as_deref(), Some("ok"));
    assert!(snapshot.memory.has_todo);

    let next = assert_ok!(kit.allocate("forge", "CodeBuilder"));
    assert_eq!(next.to_string(), "Forge.CodeBuilder-04");
}

#[tokio::test]
async fn test_missing_directory_falls_back_to_demo() {
    let dir = TempDir::new().unwrap();
    let provider = LocalProvider::new(dir.path().join("absent"));
    let kit = assert_ok!(SpawnKit::new(Arc::new(provider), manual()));

    let (tx, mut rx) = mpsc::unbounded_channel();
    kit.subscribe("mode:demo", move |event| {
        if let EngineEvent::ModeChanged { reason, .. } = event {
            let _ = tx.send(reason.clone());
        }
    });

    assert_eq!(kit.init().await, TickOutcome::EnteredDemo);
    assert_eq!(kit.mode(), Mode::Demo);
    assert!(rx.try_recv().unwrap().contains("unavailable"));
    assert_eq!(kit.snapshot().agents.len(), 6);
}

#[tokio::test]
async fn test_pushed_update_reaches_subscribers() {
    let dir = fleet_dir();
    let provider = LocalProvider::new(dir.path());
    let push = provider.push_handle();
    let kit = assert_ok!(SpawnKit::new(
        Arc::new(provider),
        manual().with_intervals(60_000, 60_000)
    ));
    kit.init().await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    kit.subscribe("agent:status", move |event| {
        if let EngineEvent::Change(change) = event {
            let _ = tx.send(change.clone());
        }
    });
    assert!(kit.start_live().await);

    let raw = RawPayload {
        sessions: json!([{"key": "agent:main:main", "label": "Triage the incoming bug reports", "status": "idle", "totalTokens": 1200}]),
        crons: json!([]),
        memory: json!({}),
        ..Default::default()
    };
    assert_ok!(push.push(raw).await);

    let change = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        change,
        ChangeEvent::AgentStatus {
            agent_id: "main".into(),
            old_status: AgentStatus::Active,
            new_status: AgentStatus::Idle,
            current_task: "standby".into(),
        }
    );

    kit.shutdown().await;
    assert!(!kit.is_live().await);
}
