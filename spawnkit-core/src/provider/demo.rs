//! Synthetic fleet used when no real provider is reachable.
//!
//! Payloads go through the regular normalizer, so demo snapshots always have
//! the canonical shape. Token counts drift a little on every fetch.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};

use super::{RawPayload, TelemetryProvider};
use crate::error::Result;

const MINUTE_MS: i64 = 60_000;

/// (agent id, current label, base tokens, minutes since last activity, model)
const FLEET: &[(&str, &str, u64, i64, &str)] = &[
    ("main", "Coordinating the fleet standup", 184_200, 1, "claude-opus-4"),
    ("hunter", "Scanning competitor launch notes", 92_750, 2, "claude-sonnet-4"),
    ("forge", "Build release pipeline for v2", 311_400, 0, "claude-opus-4"),
    ("echo", "Drafting the weekly newsletter", 58_900, 3, "claude-sonnet-4"),
    ("atlas", "Nightly backup verification", 40_300, 25, "claude-haiku-4"),
    ("sentinel", "Review access audit logs", 27_650, 4, "claude-sonnet-4"),
];

/// (session key, structured name, label, status)
const SUBAGENTS: &[(&str, &str, &str, &str)] = &[
    ("agent:forge:subagent:demo-1", "Forge.TaskRunner-01", "Refactor the data bridge", "active"),
    ("agent:hunter:subagent:demo-2", "Hunter.Researcher-01", "Competitor pricing sweep", "done"),
];

/// (id, name, expression, first run minutes past midnight UTC, interval minutes)
const CRONS: &[(&str, &str, &str, i64, i64)] = &[
    ("morning-brief", "Morning Brief", "0 6 * * *", 6 * 60, 24 * 60),
    ("git-backup", "Git Auto-Backup", "0 */6 * * *", 0, 6 * 60),
    ("fleet-standup", "Fleet Standup", "0 8 * * 1-5", 8 * 60, 24 * 60),
];

/// Most recent slot on the `offset + k * every` grid at or before `now_ms`.
/// Stable across calls within one interval, so repeated fetches agree on it.
fn last_slot(now_ms: i64, offset_minutes: i64, every_minutes: i64) -> i64 {
    let offset = offset_minutes * MINUTE_MS;
    let every = every_minutes * MINUTE_MS;
    now_ms - (now_ms - offset).rem_euclid(every)
}

pub struct DemoProvider {
    seed: u64,
    generation: AtomicU64,
}

impl Default for DemoProvider {
    fn default() -> Self {
        Self::new(0x5EED)
    }
}

impl DemoProvider {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            generation: AtomicU64::new(0),
        }
    }

    /// Build one synthetic payload anchored at `now_ms`.
    pub fn generate(&self, now_ms: i64) -> RawPayload {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(generation));

        let mut sessions: Vec<Value> = FLEET
            .iter()
            .map(|(id, label, base, idle_minutes, model)| {
                let drift = generation * rng.gen_range(50..400u64);
                json!({
                    "key": format!("agent:{id}:main"),
                    "label": label,
                    "status": if *idle_minutes < 5 { "active" } else { "idle" },
                    "model": model,
                    "totalTokens": base + drift,
                    "lastActiveAtMs": now_ms - idle_minutes * MINUTE_MS,
                    "channel": "demo",
                })
            })
            .collect();

        sessions.extend(SUBAGENTS.iter().map(|(key, name, label, status)| {
            json!({
                "key": key,
                "kind": "subagent",
                "structuredName": name,
                "label": label,
                "status": status,
                "totalTokens": rng.gen_range(2_000..12_000u64),
                "startedAtMs": now_ms - 12 * MINUTE_MS,
            })
        }));

        let crons: Vec<Value> = CRONS
            .iter()
            .map(|(id, name, expr, offset, every)| {
                let last_run = last_slot(now_ms, *offset, *every);
                json!({
                    "id": id,
                    "name": name,
                    "scheduleExpr": expr,
                    "enabled": true,
                    "lastRunAtMs": last_run,
                    "nextRunAtMs": last_run + every * MINUTE_MS,
                    "lastStatus": "ok",
                })
            })
            .collect();

        let files: Vec<Value> = (0..3)
            .map(|day| {
                json!({
                    "name": format!("daily-{}.md", day + 1),
                    "size": 1_200 + day * 340,
                    "modifiedAtMs": now_ms - (3 - day) * 24 * 60 * MINUTE_MS,
                })
            })
            .collect();

        RawPayload {
            sessions: Value::Array(sessions),
            crons: Value::Array(crons),
            memory: json!({
                "mainDocument": "# Fleet memory\n\nDemo data. Connect a provider for live telemetry.\n",
                "todoDocument": "- [ ] Connect a live provider\n",
                "files": files,
            }),
            agents: Value::Null,
            soft_errors: Vec::new(),
        }
    }
}

#[async_trait]
impl TelemetryProvider for DemoProvider {
    fn name(&self) -> &str {
        "demo"
    }

    async fn fetch_all(&self) -> Result<RawPayload> {
        Ok(self.generate(chrono::Utc::now().timestamp_millis()))
    }

    async fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::NamingRegistry;
    use crate::normalize::{NormalizeOptions, normalize};
    use crate::types::{AgentStatus, SubTaskStatus};

    const NOW: i64 = 1_700_000_000_000;

    #[test]
    fn test_demo_payload_normalizes_cleanly() {
        let raw = DemoProvider::default().generate(NOW);
        let out = normalize(&raw, &NamingRegistry::new(), &NormalizeOptions::at(NOW));
        assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);

        let snap = out.snapshot;
        assert_eq!(snap.agents.len(), 6);
        assert_eq!(snap.agent("atlas").unwrap().status, AgentStatus::Idle);
        assert_eq!(snap.agent("forge").unwrap().status, AgentStatus::Active);
        assert_eq!(snap.subtasks.len(), 2);
        assert_eq!(snap.subtasks[0].structured_name.as_deref(), Some("Forge.TaskRunner-01"));
        assert_eq!(snap.subtasks[1].status, SubTaskStatus::Completed);
        assert_eq!(snap.crons.len(), 3);
        assert_eq!(snap.crons[0].human_readable_schedule, "6:00 AM daily");
        assert_eq!(snap.memory.file_count, 3);
        assert!(!snap.missions.is_empty() && snap.missions.len() <= 5);
        assert!(snap.metrics.total_tokens > 0);
    }

    #[test]
    fn test_tokens_drift_between_generations() {
        let demo = DemoProvider::new(7);
        let first = demo.generate(NOW);
        let second = demo.generate(NOW);
        let tokens = |raw: &RawPayload| raw.sessions[2]["totalTokens"].as_u64().unwrap();
        assert!(tokens(&second) > tokens(&first));

        // Same seed, same sequence
        let again = DemoProvider::new(7);
        assert_eq!(again.generate(NOW), first);
    }

    #[test]
    fn test_cron_runs_hold_within_an_interval() {
        let demo = DemoProvider::default();
        let runs = |raw: &RawPayload| -> Vec<(i64, i64)> {
            raw.crons
                .as_array()
                .unwrap()
                .iter()
                .map(|c| (c["lastRunAtMs"].as_i64().unwrap(), c["nextRunAtMs"].as_i64().unwrap()))
                .collect()
        };
        let first = runs(&demo.generate(NOW));
        let second = runs(&demo.generate(NOW + 30_000));
        assert_eq!(first, second);
        for (last, next) in &first {
            assert!(*last <= NOW && NOW < *next);
        }

        // Crossing the six-hour backup slot moves only that cron
        let later = runs(&demo.generate(first[1].1 + 1));
        assert_eq!(later[1].0, first[1].1);
        assert_eq!(later[0], first[0]);
    }

    #[test]
    fn test_last_slot_aligns_to_grid() {
        let day = 24 * 60;
        let six_am = 6 * 60 * MINUTE_MS;
        assert_eq!(last_slot(six_am, 6 * 60, day), six_am);
        assert_eq!(last_slot(six_am - 1, 6 * 60, day), six_am - 24 * 60 * MINUTE_MS);
        assert_eq!(last_slot(six_am + 90 * MINUTE_MS, 0, 6 * 60), six_am);
    }
}
