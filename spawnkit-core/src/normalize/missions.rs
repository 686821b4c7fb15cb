//! Mission synthesis from running sub-tasks and busy agents.

use crate::types::{
    AgentRecord, AgentStatus, MissionPriority, MissionRecord, MissionStatus, STANDBY, SubTaskRecord,
    SubTaskStatus,
};

const HIGH_KEYWORDS: &[&str] = &["urgent", "critical", "fix", "bug", "build", "deploy", "release"];
const MEDIUM_KEYWORDS: &[&str] = &["review", "audit", "test"];

/// Placeholder task texts that never become missions.
const PLACEHOLDER_TASKS: &[&str] = &[STANDBY, "no recent activity", "working..."];

/// Minimum task length (in characters) for an agent task to count as a mission.
const MIN_TASK_CHARS: usize = 10;

const HOUR_MS: f64 = 3_600_000.0;

pub fn priority_for(title: &str) -> MissionPriority {
    let lower = title.to_lowercase();
    if HIGH_KEYWORDS.iter().any(|k| lower.contains(k)) {
        MissionPriority::High
    } else if MEDIUM_KEYWORDS.iter().any(|k| lower.contains(k)) {
        MissionPriority::Medium
    } else {
        MissionPriority::Normal
    }
}

/// Rough progress for an agent task from how long it has been running.
pub fn estimate_progress(title: &str, since_ms: Option<i64>, now_ms: i64) -> f64 {
    let hours = since_ms
        .map(|t| now_ms.saturating_sub(t).max(0) as f64 / HOUR_MS)
        .unwrap_or(0.0);
    let lower = title.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));

    if has(&["fix", "update", "check"]) {
        (0.1 + hours * 0.3).min(0.9)
    } else if has(&["build", "implement", "create"]) {
        (0.05 + hours * 0.15).min(0.8)
    } else {
        (0.1 + hours * 0.1).min(0.7)
    }
}

fn is_placeholder(task: &str) -> bool {
    let lower = task.trim().to_lowercase();
    PLACEHOLDER_TASKS.contains(&lower.as_str())
}

/// Running sub-tasks first, in order, then active agents with a real task.
pub fn synthesize(
    subtasks: &[SubTaskRecord],
    agents: &[AgentRecord],
    now_ms: i64,
    cap: usize,
) -> Vec<MissionRecord> {
    let mut missions: Vec<MissionRecord> = subtasks
        .iter()
        .filter(|s| s.status == SubTaskStatus::Running)
        .map(|s| {
            let title = if s.task.is_empty() {
                s.structured_name.clone().unwrap_or_else(|| s.id.clone())
            } else {
                s.task.clone()
            };
            MissionRecord {
                id: format!("subtask:{}", s.id),
                priority: priority_for(&title),
                title,
                status: MissionStatus::InProgress,
                progress: s.progress,
                assigned_agent_ids: vec![s.parent_agent_id.clone()],
            }
        })
        .collect();

    for agent in agents {
        if agent.status != AgentStatus::Active
            || agent.current_task.chars().count() <= MIN_TASK_CHARS
            || is_placeholder(&agent.current_task)
            || missions.iter().any(|m| m.title == agent.current_task)
        {
            continue;
        }
        missions.push(MissionRecord {
            id: format!("agent:{}", agent.id),
            title: agent.current_task.clone(),
            status: MissionStatus::InProgress,
            progress: estimate_progress(&agent.current_task, agent.last_active_at_ms, now_ms),
            priority: priority_for(&agent.current_task),
            assigned_agent_ids: vec![agent.id.clone()],
        });
    }

    missions.truncate(cap);
    missions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(id: &str, status: AgentStatus, task: &str) -> AgentRecord {
        AgentRecord {
            id: id.into(),
            display_name: id.into(),
            status,
            current_task: task.into(),
            last_active_at_ms: Some(0),
            tokens_used: 0,
            model_id: None,
        }
    }

    fn subtask(id: &str, status: SubTaskStatus, task: &str) -> SubTaskRecord {
        SubTaskRecord {
            id: id.into(),
            structured_name: None,
            parent_agent_id: "forge".into(),
            role_id: None,
            task: task.into(),
            status,
            progress: 0.5,
            started_at_ms: 0,
        }
    }

    #[test]
    fn test_priority_keywords() {
        assert_eq!(priority_for("Fix login BUG"), MissionPriority::High);
        assert_eq!(priority_for("Deploy v2"), MissionPriority::High);
        assert_eq!(priority_for("Review PR 12"), MissionPriority::Medium);
        assert_eq!(priority_for("Write newsletter"), MissionPriority::Normal);
    }

    #[test]
    fn test_estimate_progress_caps() {
        let now = 100 * 3_600_000;
        assert_eq!(estimate_progress("fix flaky job", Some(0), now), 0.9);
        assert_eq!(estimate_progress("build dashboard", Some(0), now), 0.8);
        assert_eq!(estimate_progress("draft memo", Some(0), now), 0.7);
        assert!((estimate_progress("draft memo", Some(now), now) - 0.1).abs() < 1e-9);
        assert!((estimate_progress("create thing", None, now) - 0.05).abs() < 1e-9);
    }

    #[test]
    fn test_subtasks_first_then_agents() {
        let subtasks = vec![
            subtask("s1", SubTaskStatus::Running, "build landing page"),
            subtask("s2", SubTaskStatus::Completed, "old work item"),
        ];
        let agents = vec![
            agent("echo", AgentStatus::Active, "Drafting the weekly digest"),
            agent("atlas", AgentStatus::Idle, "Rotating the backup keys"),
            agent("main", AgentStatus::Active, "short"),
            agent("hunter", AgentStatus::Active, "Standby"),
            agent("forge", AgentStatus::Active, "build landing page"),
        ];
        let missions = synthesize(&subtasks, &agents, 0, 5);
        let ids: Vec<_> = missions.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["subtask:s1", "agent:echo"]);
        assert_eq!(missions[0].priority, MissionPriority::High);
        assert_eq!(missions[0].assigned_agent_ids, vec!["forge".to_string()]);
    }

    #[test]
    fn test_cap_prefers_subtasks() {
        let subtasks: Vec<_> = (0..4)
            .map(|i| subtask(&format!("s{i}"), SubTaskStatus::Running, &format!("task number {i}")))
            .collect();
        let agents = vec![
            agent("echo", AgentStatus::Active, "Drafting the weekly digest"),
            agent("atlas", AgentStatus::Active, "Rotating the backup keys"),
        ];
        let missions = synthesize(&subtasks, &agents, 0, 5);
        assert_eq!(missions.len(), 5);
        assert_eq!(missions[4].id, "agent:echo");
    }
}
