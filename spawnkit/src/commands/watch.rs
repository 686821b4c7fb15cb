//! Live event stream.

use anyhow::{Context, Result};
use chrono::{Local, TimeZone};
use colored::Colorize;
use serde_json::json;

use spawnkit_core::ChangeEvent;
use spawnkit_sdk::events::ALL_TOPICS;
use spawnkit_sdk::utils::now_ms;
use spawnkit_sdk::EngineEvent;

use crate::config::Config;

pub async fn execute(json: bool, config: &Config) -> Result<()> {
    let kit = super::open(config, config.engine.clone().with_auto_start(true))?;

    for topic in ALL_TOPICS {
        kit.subscribe(topic, move |event| {
            if json {
                println!("{}", to_json_line(event));
            } else {
                println!("{} {}", timestamp(now_ms()).dimmed(), describe(event));
            }
        });
    }

    if !json {
        println!("{}", "Watching fleet telemetry (Ctrl+C to stop)".yellow());
        println!("{}", "─".repeat(60));
    }
    kit.init().await;

    tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl+C")?;
    kit.shutdown().await;
    Ok(())
}

fn timestamp(ms: i64) -> String {
    Local
        .timestamp_millis_opt(ms)
        .single()
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_default()
}

/// One human-readable line per event.
pub(crate) fn describe(event: &EngineEvent) -> String {
    match event {
        EngineEvent::DataRefresh { snapshot } => format!(
            "{} {} agents, {} sub-tasks, {} missions, {} tokens",
            "refresh".cyan(),
            snapshot.agents.len(),
            snapshot.subtasks.len(),
            snapshot.missions.len(),
            snapshot.metrics.total_tokens
        ),
        EngineEvent::ModeChanged { mode, reason, .. } => {
            format!("{} {} ({})", "mode".magenta().bold(), mode.to_string().to_uppercase(), reason)
        }
        EngineEvent::Change(change) => describe_change(change),
        EngineEvent::LiveStarted { interval_ms, mode, .. } => {
            format!("{} every {}ms in {} mode", "live".green(), interval_ms, mode)
        }
        EngineEvent::LiveStopped { refresh_count, .. } => {
            format!("{} after {} refreshes", "stopped".yellow(), refresh_count)
        }
    }
}

fn describe_change(change: &ChangeEvent) -> String {
    match change {
        ChangeEvent::AgentStatus {
            agent_id,
            old_status,
            new_status,
            current_task,
        } => format!(
            "{} {} {} -> {} ({})",
            "agent".blue(),
            agent_id.bold(),
            old_status,
            new_status,
            current_task
        ),
        ChangeEvent::SubagentSpawn {
            sub_task_id,
            parent_agent_id,
            task,
        } => format!("{} {} under {}: {}", "spawn".green(), sub_task_id, parent_agent_id, task),
        ChangeEvent::MissionNew { title, priority, .. } => {
            format!("{} [{}] {}", "mission".cyan(), priority, title)
        }
        ChangeEvent::CronTrigger { name, last_status, .. } => format!(
            "{} {} ran ({})",
            "cron".yellow(),
            name,
            last_status.as_deref().unwrap_or("unknown")
        ),
    }
}

/// Stable JSON line for scripting: the topic plus the event payload.
pub(crate) fn to_json_line(event: &EngineEvent) -> serde_json::Value {
    let data = match event {
        EngineEvent::DataRefresh { snapshot } => json!({
            "agents": snapshot.agents.len(),
            "subtasks": snapshot.subtasks.len(),
            "missions": snapshot.missions.len(),
            "generatedAtMs": snapshot.generated_at_ms,
        }),
        EngineEvent::ModeChanged { mode, reason, .. } => json!({"mode": mode, "reason": reason}),
        EngineEvent::Change(change) => serde_json::to_value(change).unwrap_or_default(),
        EngineEvent::LiveStarted {
            interval_ms,
            mode,
            refresh_count,
        }
        | EngineEvent::LiveStopped {
            interval_ms,
            mode,
            refresh_count,
        } => json!({"intervalMs": interval_ms, "mode": mode, "refreshCount": refresh_count}),
    };
    json!({"topic": event.topic(), "data": data})
}

#[cfg(test)]
mod tests {
    use super::*;
    use spawnkit_core::{AgentStatus, CanonicalSnapshot, Mode};
    use std::sync::Arc;

    #[test]
    fn test_describe_status_change() {
        colored::control::set_override(false);
        let event = EngineEvent::Change(ChangeEvent::AgentStatus {
            agent_id: "forge".into(),
            old_status: AgentStatus::Active,
            new_status: AgentStatus::Idle,
            current_task: "standby".into(),
        });
        assert_eq!(describe(&event), "agent forge active -> idle (standby)");
    }

    #[test]
    fn test_json_line_carries_topic() {
        let event = EngineEvent::ModeChanged {
            mode: Mode::Demo,
            snapshot: Arc::new(CanonicalSnapshot::default()),
            reason: "provider unavailable".into(),
        };
        let line = to_json_line(&event);
        assert_eq!(line["topic"], "mode:demo");
        assert_eq!(line["data"]["mode"], "demo");

        let change = EngineEvent::Change(ChangeEvent::CronTrigger {
            cron_id: "brief".into(),
            name: "Morning Brief".into(),
            last_status: Some("ok".into()),
        });
        let line = to_json_line(&change);
        assert_eq!(line["topic"], "cron:trigger");
        assert_eq!(line["data"]["kind"], "cronTrigger");
        assert_eq!(line["data"]["cronId"], "brief");
    }
}
