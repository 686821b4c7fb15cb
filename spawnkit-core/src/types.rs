//! Canonical snapshot types shared by the normalizer, diff engine and facade.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Blended per-token rate used for the illustrative cost estimate.
pub const COST_PER_TOKEN: f64 = 0.000045;

/// Current task shown for agents that are not doing anything.
pub const STANDBY: &str = "standby";

// ─────────────────────────────────────────────────────────────────────────────
// Enums
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Active,
    Idle,
    Offline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubTaskStatus {
    Running,
    Completed,
}

/// Missions are only synthesized from ongoing work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionStatus {
    InProgress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissionPriority {
    High,
    Medium,
    Normal,
}

/// Whether the engine is showing real telemetry or synthetic fallback data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Live,
    Demo,
}

macro_rules! impl_display_via_serde_name {
    ($($ty:ty => { $($variant:path => $name:literal),+ $(,)? }),+ $(,)?) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(match self { $($variant => $name),+ })
                }
            }
        )+
    };
}

impl_display_via_serde_name! {
    AgentStatus => { AgentStatus::Active => "active", AgentStatus::Idle => "idle", AgentStatus::Offline => "offline" },
    SubTaskStatus => { SubTaskStatus::Running => "running", SubTaskStatus::Completed => "completed" },
    MissionStatus => { MissionStatus::InProgress => "in_progress" },
    MissionPriority => { MissionPriority::High => "high", MissionPriority::Medium => "medium", MissionPriority::Normal => "normal" },
    Mode => { Mode::Live => "live", Mode::Demo => "demo" },
}

// ─────────────────────────────────────────────────────────────────────────────
// Records
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRecord {
    pub id: String,
    pub display_name: String,
    pub status: AgentStatus,
    /// Task text, or [`STANDBY`].
    pub current_task: String,
    pub last_active_at_ms: Option<i64>,
    pub tokens_used: u64,
    pub model_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubTaskRecord {
    pub id: String,
    /// `Forge.CodeBuilder-01`, when the label could be resolved.
    pub structured_name: Option<String>,
    pub parent_agent_id: String,
    pub role_id: Option<String>,
    /// Free-text label reported by the provider.
    pub task: String,
    pub status: SubTaskStatus,
    pub progress: f64,
    pub started_at_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionRecord {
    pub id: String,
    pub title: String,
    pub status: MissionStatus,
    pub progress: f64,
    pub priority: MissionPriority,
    pub assigned_agent_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CronRecord {
    pub id: String,
    pub name: String,
    pub human_readable_schedule: String,
    pub enabled: bool,
    pub next_run_at_ms: Option<i64>,
    pub last_run_at_ms: Option<i64>,
    pub last_status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsRecord {
    pub total_tokens: u64,
    pub active_agents: usize,
    pub active_subtasks: usize,
    pub cost_estimate: f64,
}

impl MetricsRecord {
    pub fn cost_for(tokens: u64) -> f64 {
        tokens as f64 * COST_PER_TOKEN
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemorySummary {
    pub file_count: usize,
    pub main_document_bytes: usize,
    pub has_todo: bool,
    pub last_modified_at_ms: Option<i64>,
}

/// The aggregate root. Replaced wholesale on every successful tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalSnapshot {
    pub agents: Vec<AgentRecord>,
    pub subtasks: Vec<SubTaskRecord>,
    pub missions: Vec<MissionRecord>,
    pub crons: Vec<CronRecord>,
    pub metrics: MetricsRecord,
    pub memory: MemorySummary,
    pub generated_at_ms: i64,
}

impl CanonicalSnapshot {
    pub fn agent(&self, id: &str) -> Option<&AgentRecord> {
        self.agents.iter().find(|a| a.id == id)
    }

    pub fn subtask(&self, id: &str) -> Option<&SubTaskRecord> {
        self.subtasks.iter().find(|s| s.id == id)
    }

    pub fn cron(&self, id: &str) -> Option<&CronRecord> {
        self.crons.iter().find(|c| c.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_wire_names_match_display() {
        for status in [AgentStatus::Active, AgentStatus::Idle, AgentStatus::Offline] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status));
        }
        assert_eq!(serde_json::to_string(&MissionStatus::InProgress).unwrap(), "\"in_progress\"");
        assert_eq!(Mode::default(), Mode::Live);
    }

    #[test]
    fn test_cost_is_reproducible() {
        assert_eq!(MetricsRecord::cost_for(0), 0.0);
        assert_eq!(MetricsRecord::cost_for(1_000_000), 1_000_000f64 * 0.000045);
        assert_eq!(MetricsRecord::cost_for(12_345), MetricsRecord::cost_for(12_345));
    }

    #[test]
    fn test_snapshot_serializes_all_collections() {
        let json = serde_json::to_value(CanonicalSnapshot::default()).unwrap();
        for key in ["agents", "subtasks", "missions", "crons", "metrics", "memory"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }
}
