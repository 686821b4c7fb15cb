//! Diff engine: the changes between two snapshots that observers care about.

use serde::Serialize;
use std::collections::HashSet;

use crate::types::{AgentStatus, CanonicalSnapshot, MissionPriority, SubTaskStatus};

pub const TOPIC_AGENT_STATUS: &str = "agent:status";
pub const TOPIC_SUBAGENT_SPAWN: &str = "subagent:spawn";
pub const TOPIC_MISSION_NEW: &str = "mission:new";
pub const TOPIC_CRON_TRIGGER: &str = "cron:trigger";

/// One semantically meaningful change. Each variant carries only its own fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ChangeEvent {
    #[serde(rename_all = "camelCase")]
    AgentStatus {
        agent_id: String,
        old_status: AgentStatus,
        new_status: AgentStatus,
        current_task: String,
    },
    #[serde(rename_all = "camelCase")]
    SubagentSpawn {
        sub_task_id: String,
        parent_agent_id: String,
        task: String,
    },
    #[serde(rename_all = "camelCase")]
    MissionNew {
        mission_id: String,
        title: String,
        assigned_agent_ids: Vec<String>,
        priority: MissionPriority,
    },
    #[serde(rename_all = "camelCase")]
    CronTrigger {
        cron_id: String,
        name: String,
        last_status: Option<String>,
    },
}

impl ChangeEvent {
    /// Event-bus topic this change is published on.
    pub fn topic(&self) -> &'static str {
        match self {
            ChangeEvent::AgentStatus { .. } => TOPIC_AGENT_STATUS,
            ChangeEvent::SubagentSpawn { .. } => TOPIC_SUBAGENT_SPAWN,
            ChangeEvent::MissionNew { .. } => TOPIC_MISSION_NEW,
            ChangeEvent::CronTrigger { .. } => TOPIC_CRON_TRIGGER,
        }
    }
}

/// Compare two snapshots.
///
/// The first tick (`previous == None`) is silent, as is any pair that agrees
/// on the compared fields. Events come out grouped by kind: agent status,
/// spawns, missions, cron triggers.
pub fn diff(previous: Option<&CanonicalSnapshot>, next: &CanonicalSnapshot) -> Vec<ChangeEvent> {
    let Some(previous) = previous else {
        return Vec::new();
    };
    let mut events = Vec::new();

    for agent in &next.agents {
        let Some(old) = previous.agent(&agent.id) else {
            continue;
        };
        if old.status != agent.status {
            events.push(ChangeEvent::AgentStatus {
                agent_id: agent.id.clone(),
                old_status: old.status,
                new_status: agent.status,
                current_task: agent.current_task.clone(),
            });
        }
    }

    let known_subtasks: HashSet<&str> = previous.subtasks.iter().map(|s| s.id.as_str()).collect();
    for subtask in &next.subtasks {
        if subtask.status == SubTaskStatus::Running && !known_subtasks.contains(subtask.id.as_str()) {
            events.push(ChangeEvent::SubagentSpawn {
                sub_task_id: subtask.id.clone(),
                parent_agent_id: subtask.parent_agent_id.clone(),
                task: subtask.task.clone(),
            });
        }
    }

    let known_missions: HashSet<&str> = previous.missions.iter().map(|m| m.id.as_str()).collect();
    for mission in &next.missions {
        if !known_missions.contains(mission.id.as_str()) {
            events.push(ChangeEvent::MissionNew {
                mission_id: mission.id.clone(),
                title: mission.title.clone(),
                assigned_agent_ids: mission.assigned_agent_ids.clone(),
                priority: mission.priority,
            });
        }
    }

    for cron in &next.crons {
        let Some(old) = previous.cron(&cron.id) else {
            continue;
        };
        if cron.last_run_at_ms.is_some() && cron.last_run_at_ms != old.last_run_at_ms {
            events.push(ChangeEvent::CronTrigger {
                cron_id: cron.id.clone(),
                name: cron.name.clone(),
                last_status: cron.last_status.clone(),
            });
        }
    }

    events
}
