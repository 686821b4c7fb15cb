//! Cron job records and schedule humanization.

use serde_json::{Map, Value};

use super::coerce::{self, Diagnostics};
use crate::types::CronRecord;

/// Known cron expressions and how they read.
const KNOWN_SCHEDULES: &[(&str, &str)] = &[
    ("0 6 * * *", "6:00 AM daily"),
    ("0 8 * * 1-5", "8:00 AM Mon-Fri"),
    ("0 */6 * * *", "Every 6h"),
    ("*/30 * * * *", "Every 30 min"),
];

/// Map a cron expression to a human string; unknown expressions pass through.
pub fn humanize_schedule(expr: &str) -> String {
    let normalized = expr.split_whitespace().collect::<Vec<_>>().join(" ");
    KNOWN_SCHEDULES
        .iter()
        .find(|(known, _)| *known == normalized)
        .map(|(_, human)| human.to_string())
        .unwrap_or_else(|| expr.to_string())
}

/// Crons arrive as a bare list or wrapped as `{ "jobs": [...] }`.
fn job_list(value: &Value) -> &Value {
    match value {
        Value::Object(map) => map.get("jobs").unwrap_or(&Value::Null),
        other => other,
    }
}

fn schedule_expr(obj: &Map<String, Value>) -> Option<String> {
    let raw = obj.get("scheduleExpr").or_else(|| obj.get("schedule"))?;
    match raw {
        Value::String(s) => Some(s.clone()),
        Value::Object(inner) => coerce::text(inner, "expr").map(str::to_string),
        _ => None,
    }
}

pub fn normalize_crons(value: &Value, diag: &mut Diagnostics) -> Vec<CronRecord> {
    if value.is_object() && !value.get("jobs").is_some_and(Value::is_array) {
        diag.push("crons", "expected array or {jobs: [...]}");
        return Vec::new();
    }

    coerce::objects(job_list(value), "crons", diag)
        .into_iter()
        .enumerate()
        .map(|(i, job)| {
            let path = format!("crons[{i}]");
            // Run state may be flattened or nested under `state`.
            let state = job.get("state").and_then(Value::as_object).unwrap_or(job);
            let lookup = |key: &str, diag: &mut Diagnostics| {
                coerce::timestamp_ms(job, key, &path, diag)
                    .or_else(|| coerce::timestamp_ms(state, key, &path, diag))
            };

            CronRecord {
                id: coerce::id(job, "id").unwrap_or_else(|| format!("cron-{i}")),
                name: coerce::text(job, "name").unwrap_or("Unnamed cron").to_string(),
                human_readable_schedule: schedule_expr(job)
                    .map(|e| humanize_schedule(&e))
                    .unwrap_or_default(),
                enabled: coerce::flag(job, "enabled", true),
                next_run_at_ms: lookup("nextRunAtMs", diag),
                last_run_at_ms: lookup("lastRunAtMs", diag),
                last_status: coerce::text(job, "lastStatus")
                    .or_else(|| coerce::text(state, "lastStatus"))
                    .map(str::to_string),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_humanize_schedule() {
        assert_eq!(humanize_schedule("0 6 * * *"), "6:00 AM daily");
        assert_eq!(humanize_schedule("0 8 * * 1-5"), "8:00 AM Mon-Fri");
        assert_eq!(humanize_schedule("0  */6 * * *"), "Every 6h");
        assert_eq!(humanize_schedule("*/30 * * * *"), "Every 30 min");
        assert_eq!(humanize_schedule("15 3 * * 0"), "15 3 * * 0");
    }

    #[test]
    fn test_flat_and_wrapped_shapes() {
        let mut diag = Diagnostics::default();
        let flat = json!([{
            "id": "brief",
            "name": "Morning Brief",
            "scheduleExpr": "0 6 * * *",
            "enabled": true,
            "lastRunAtMs": 1000,
            "lastStatus": "ok"
        }]);
        let wrapped = json!({"jobs": [{
            "id": "brief",
            "name": "Morning Brief",
            "schedule": {"expr": "0 6 * * *"},
            "state": {"lastRunAtMs": 1000, "lastStatus": "ok"}
        }]});
        let a = normalize_crons(&flat, &mut diag);
        let b = normalize_crons(&wrapped, &mut diag);
        assert_eq!(a, b);
        assert_eq!(a[0].human_readable_schedule, "6:00 AM daily");
        assert_eq!(a[0].last_run_at_ms, Some(1000));
        assert!(diag.into_vec().is_empty());
    }

    #[test]
    fn test_defaults_and_malformed() {
        let mut diag = Diagnostics::default();
        let crons = normalize_crons(&json!([{}, "junk"]), &mut diag);
        assert_eq!(crons.len(), 1);
        assert_eq!(crons[0].id, "cron-0");
        assert_eq!(crons[0].name, "Unnamed cron");
        assert!(crons[0].enabled);
        assert!(crons[0].last_run_at_ms.is_none());

        assert!(normalize_crons(&json!({"jobs": "none"}), &mut diag).is_empty());
        assert!(normalize_crons(&json!(7), &mut diag).is_empty());
        assert_eq!(diag.into_vec().len(), 3);
    }
}
