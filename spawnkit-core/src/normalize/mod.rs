//! Snapshot normalizer.
//!
//! Maps a [`RawPayload`] of any shape into a [`CanonicalSnapshot`]. The
//! mapping is pure: no I/O, no clock reads (the caller passes `now_ms`), and
//! no failure path. Malformed fields fall back to defaults and are reported
//! as [`Diagnostic`]s.

mod coerce;
mod crons;
mod missions;

use serde_json::{Map, Value};
use std::collections::HashMap;

pub use coerce::Diagnostic;
pub use crons::humanize_schedule;
pub use missions::{estimate_progress, priority_for};

use coerce::Diagnostics;
use crate::naming::{NamingRegistry, ParentKey};
use crate::provider::RawPayload;
use crate::types::{
    AgentRecord, AgentStatus, CanonicalSnapshot, MemorySummary, MetricsRecord, STANDBY, SubTaskRecord,
    SubTaskStatus,
};

/// Default window within which an agent counts as active.
pub const DEFAULT_RECENCY_WINDOW_MS: i64 = 5 * 60 * 1000;

/// Default cap on synthesized missions.
pub const DEFAULT_MAX_MISSIONS: usize = 5;

const RUNNING_PROGRESS: f64 = 0.5;
const COMPLETED_PROGRESS: f64 = 1.0;

#[derive(Debug, Clone, Copy)]
pub struct NormalizeOptions {
    pub now_ms: i64,
    pub recency_window_ms: i64,
    pub max_missions: usize,
}

impl NormalizeOptions {
    pub fn at(now_ms: i64) -> Self {
        Self {
            now_ms,
            recency_window_ms: DEFAULT_RECENCY_WINDOW_MS,
            max_missions: DEFAULT_MAX_MISSIONS,
        }
    }
}

/// Normalizer output.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub snapshot: CanonicalSnapshot,
    pub diagnostics: Vec<Diagnostic>,
}

/// Derive an agent's status from recency, falling back to the reported status
/// when no timestamp is known.
pub fn derive_status(
    last_active_at_ms: Option<i64>,
    reported: Option<&str>,
    now_ms: i64,
    window_ms: i64,
) -> AgentStatus {
    match last_active_at_ms {
        Some(ts) if now_ms.saturating_sub(ts) <= window_ms => AgentStatus::Active,
        Some(_) => AgentStatus::Idle,
        None => match reported.map(str::to_ascii_lowercase).as_deref() {
            Some("active") | Some("running") => AgentStatus::Active,
            Some("idle") => AgentStatus::Idle,
            _ => AgentStatus::Offline,
        },
    }
}

/// Agent id from a session key: `agent:<id>:...` → `<id>`.
pub fn agent_id_from_key(key: &str) -> &str {
    match key.strip_prefix("agent:") {
        Some(rest) => rest.split(':').next().unwrap_or(rest),
        None => key.split(':').next().unwrap_or(key),
    }
}

fn display_name(agent_id: &str) -> String {
    if let Ok(parent) = agent_id.parse::<ParentKey>() {
        return parent.display_name().to_string();
    }
    let mut chars = agent_id.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sessions
// ─────────────────────────────────────────────────────────────────────────────

struct Session<'a> {
    key: &'a str,
    obj: &'a Map<String, Value>,
    label: Option<&'a str>,
    status: Option<&'a str>,
    model: Option<&'a str>,
    tokens: u64,
    last_active_at_ms: Option<i64>,
}

impl Session<'_> {
    fn is_subagent(&self) -> bool {
        coerce::text(self.obj, "kind") == Some("subagent") || self.key.contains("subagent")
    }

    fn agent_id(&self) -> &str {
        agent_id_from_key(self.key)
    }
}

fn read_sessions<'a>(value: &'a Value, diag: &mut Diagnostics) -> Vec<Session<'a>> {
    coerce::objects(value, "sessions", diag)
        .into_iter()
        .enumerate()
        .filter_map(|(i, obj)| {
            let path = format!("sessions[{i}]");
            let Some(key) = coerce::text(obj, "key") else {
                diag.push(path, "session without key");
                return None;
            };
            Some(Session {
                key,
                obj,
                label: coerce::text(obj, "label"),
                status: coerce::text(obj, "status"),
                model: coerce::text(obj, "model"),
                tokens: coerce::count(obj, "totalTokens", &path, diag),
                last_active_at_ms: coerce::timestamp_ms(obj, "lastActiveAtMs", &path, diag),
            })
        })
        .collect()
}

/// Per-agent roll-up of its (non sub-task) sessions.
#[derive(Default)]
struct AgentActivity<'a> {
    tokens: u64,
    last_active_at_ms: Option<i64>,
    reported_active: bool,
    reported: Option<&'a str>,
    model: Option<&'a str>,
    latest_label: Option<&'a str>,
}

fn roll_up_sessions<'a>(sessions: &[Session<'a>]) -> (Vec<String>, HashMap<String, AgentActivity<'a>>) {
    let mut order = Vec::new();
    let mut activity: HashMap<String, AgentActivity<'a>> = HashMap::new();

    for session in sessions.iter().filter(|s| !s.is_subagent()) {
        let id = session.agent_id().to_string();
        let entry = activity.entry(id.clone()).or_insert_with(|| {
            order.push(id);
            AgentActivity::default()
        });

        entry.tokens = entry.tokens.saturating_add(session.tokens);
        entry.reported = entry.reported.or(session.status);
        if session.status.is_some_and(|s| s.eq_ignore_ascii_case("active")) {
            entry.reported_active = true;
        }

        let newer = match (session.last_active_at_ms, entry.last_active_at_ms) {
            (Some(t), Some(current)) => t > current,
            (Some(_), None) => true,
            (None, _) => entry.latest_label.is_none(),
        };
        if newer {
            entry.last_active_at_ms = session.last_active_at_ms.or(entry.last_active_at_ms);
            entry.model = session.model.or(entry.model);
            entry.latest_label = session.label.or(entry.latest_label);
        }
    }

    (order, activity)
}

fn current_task(status: AgentStatus, label: Option<&str>) -> String {
    match (status, label) {
        (AgentStatus::Active, Some(label)) => label.to_string(),
        _ => STANDBY.to_string(),
    }
}

fn agents_from_sessions(sessions: &[Session<'_>], options: &NormalizeOptions) -> Vec<AgentRecord> {
    let (order, mut activity) = roll_up_sessions(sessions);
    order
        .into_iter()
        .filter_map(|id| {
            let a = activity.remove(&id)?;
            let reported = if a.reported_active { Some("active") } else { a.reported };
            let status = derive_status(a.last_active_at_ms, reported, options.now_ms, options.recency_window_ms);
            Some(AgentRecord {
                display_name: display_name(&id),
                status,
                current_task: current_task(status, a.latest_label),
                last_active_at_ms: a.last_active_at_ms,
                tokens_used: a.tokens,
                model_id: a.model.map(str::to_string),
                id,
            })
        })
        .collect()
}

/// Agents from the richer `agents` resource, enriched with session labels.
fn agents_from_list(
    value: &Value,
    sessions: &[Session<'_>],
    options: &NormalizeOptions,
    diag: &mut Diagnostics,
) -> Vec<AgentRecord> {
    let (_, activity) = roll_up_sessions(sessions);
    coerce::objects(value, "agents", diag)
        .into_iter()
        .enumerate()
        .filter_map(|(i, obj)| {
            let path = format!("agents[{i}]");
            let Some(id) = coerce::id(obj, "id") else {
                diag.push(path, "agent without id");
                return None;
            };
            let last_active_at_ms = coerce::timestamp_ms(obj, "lastActiveAtMs", &path, diag);
            let status = derive_status(
                last_active_at_ms,
                coerce::text(obj, "status"),
                options.now_ms,
                options.recency_window_ms,
            );
            let from_sessions = activity.get(&id);
            Some(AgentRecord {
                display_name: coerce::text(obj, "name")
                    .map(str::to_string)
                    .unwrap_or_else(|| display_name(&id)),
                status,
                current_task: current_task(status, from_sessions.and_then(|a| a.latest_label)),
                last_active_at_ms,
                tokens_used: coerce::count(obj, "totalTokens", &path, diag),
                model_id: coerce::text(obj, "model")
                    .or_else(|| from_sessions.and_then(|a| a.model))
                    .map(str::to_string),
                id,
            })
        })
        .collect()
}

fn subtasks_from_sessions(
    sessions: &[Session<'_>],
    naming: &NamingRegistry,
    options: &NormalizeOptions,
    diag: &mut Diagnostics,
) -> Vec<SubTaskRecord> {
    sessions
        .iter()
        .filter(|s| s.is_subagent())
        .map(|s| {
            let parent = s.agent_id().to_string();
            let label = s.label.unwrap_or_default();
            let record = coerce::text(s.obj, "structuredName")
                .and_then(|n| naming.parse(n))
                .or_else(|| naming.parse(label))
                .or_else(|| naming.migrate_legacy(s.label, Some(&parent)));

            let recent = s
                .last_active_at_ms
                .is_some_and(|t| options.now_ms.saturating_sub(t) <= options.recency_window_ms);
            let running = match s.status.map(str::to_ascii_lowercase).as_deref() {
                Some("active") | Some("running") => true,
                Some(_) => false,
                None => recent,
            };
            let status = if running {
                SubTaskStatus::Running
            } else {
                SubTaskStatus::Completed
            };
            let default_progress = if running { RUNNING_PROGRESS } else { COMPLETED_PROGRESS };

            SubTaskRecord {
                id: s.key.to_string(),
                structured_name: record.as_ref().map(ToString::to_string),
                parent_agent_id: parent,
                role_id: record.map(|r| r.role_key),
                task: label.to_string(),
                status,
                progress: coerce::fraction(s.obj, "progress").unwrap_or(default_progress),
                started_at_ms: coerce::timestamp_ms(s.obj, "startedAtMs", s.key, diag)
                    .or(s.last_active_at_ms)
                    .unwrap_or(options.now_ms),
            }
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Memory & metrics
// ─────────────────────────────────────────────────────────────────────────────

fn memory_summary(value: &Value, diag: &mut Diagnostics) -> MemorySummary {
    let obj = match value {
        Value::Object(obj) => obj,
        Value::Null => return MemorySummary::default(),
        _ => {
            diag.push("memory", "expected object");
            return MemorySummary::default();
        }
    };
    let files = coerce::objects(obj.get("files").unwrap_or(&Value::Null), "memory.files", diag);
    let last_modified_at_ms = files
        .iter()
        .enumerate()
        .filter_map(|(i, f)| coerce::timestamp_ms(f, "modifiedAtMs", &format!("memory.files[{i}]"), diag))
        .max();

    MemorySummary {
        file_count: files.len(),
        main_document_bytes: obj.get("mainDocument").and_then(Value::as_str).map_or(0, str::len),
        has_todo: coerce::text(obj, "todoDocument").is_some(),
        last_modified_at_ms,
    }
}

/// Normalize a raw payload. Never fails.
pub fn normalize(raw: &RawPayload, naming: &NamingRegistry, options: &NormalizeOptions) -> Normalized {
    let mut diag = Diagnostics::default();

    let sessions = read_sessions(&raw.sessions, &mut diag);
    let has_agent_list = raw.agents.as_array().is_some_and(|a| !a.is_empty());
    let agents = if has_agent_list {
        agents_from_list(&raw.agents, &sessions, options, &mut diag)
    } else {
        coerce::expect_list(&raw.agents, "agents", &mut diag);
        agents_from_sessions(&sessions, options)
    };
    let subtasks = subtasks_from_sessions(&sessions, naming, options, &mut diag);
    let missions = missions::synthesize(&subtasks, &agents, options.now_ms, options.max_missions);
    let crons = crons::normalize_crons(&raw.crons, &mut diag);
    let memory = memory_summary(&raw.memory, &mut diag);

    let total_tokens = if sessions.is_empty() {
        agents.iter().map(|a| a.tokens_used).sum()
    } else {
        sessions.iter().map(|s| s.tokens).sum()
    };
    let metrics = MetricsRecord {
        total_tokens,
        active_agents: agents.iter().filter(|a| a.status == AgentStatus::Active).count(),
        active_subtasks: subtasks.iter().filter(|s| s.status == SubTaskStatus::Running).count(),
        cost_estimate: MetricsRecord::cost_for(total_tokens),
    };

    Normalized {
        snapshot: CanonicalSnapshot {
            agents,
            subtasks,
            missions,
            crons,
            metrics,
            memory,
            generated_at_ms: options.now_ms,
        },
        diagnostics: diag.into_vec(),
    }
}
