//! Defensive accessors over untyped JSON.
//!
//! Every accessor returns a usable default. When the input had the wrong shape
//! the accessor records a [`Diagnostic`] instead of failing.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

/// A field that was present but unusable and has been replaced by a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub path: String,
    pub problem: String,
}

#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn push(&mut self, path: impl Into<String>, problem: impl Into<String>) {
        let entry = Diagnostic {
            path: path.into(),
            problem: problem.into(),
        };
        debug!(path = %entry.path, problem = %entry.problem, "Malformed payload field");
        self.entries.push(entry);
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Treat anything other than an array as empty. `null` is silent (absent source).
pub fn list<'a>(value: &'a Value, path: &str, diag: &mut Diagnostics) -> &'a [Value] {
    match value {
        Value::Array(items) => items.as_slice(),
        Value::Null => &[],
        other => {
            diag.push(path, format!("expected array, found {}", kind(other)));
            &[]
        }
    }
}

/// Records a diagnostic when `value` is present but not an array.
pub fn expect_list(value: &Value, path: &str, diag: &mut Diagnostics) {
    if !matches!(value, Value::Array(_) | Value::Null) {
        diag.push(path, format!("expected array, found {}", kind(value)));
    }
}

/// Objects of a list; other entries are dropped with a diagnostic.
pub fn objects<'a>(value: &'a Value, path: &str, diag: &mut Diagnostics) -> Vec<&'a Map<String, Value>> {
    let mut out = Vec::new();
    for (i, item) in list(value, path, diag).iter().enumerate() {
        match item {
            Value::Object(map) => out.push(map),
            other => diag.push(format!("{path}[{i}]"), format!("expected object, found {}", kind(other))),
        }
    }
    out
}

/// Non-empty string field.
pub fn text<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// String or number field rendered as text, for ids.
pub fn id(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Non-negative count. Absent fields are silent; wrong types are recorded.
pub fn count(obj: &Map<String, Value>, key: &str, path: &str, diag: &mut Diagnostics) -> u64 {
    match obj.get(key) {
        None | Some(Value::Null) => 0,
        Some(Value::Number(n)) => {
            if let Some(v) = n.as_u64() {
                v
            } else if let Some(f) = n.as_f64().filter(|f| f.is_finite() && *f >= 0.0) {
                f as u64
            } else {
                diag.push(format!("{path}.{key}"), format!("expected non-negative count, found {n}"));
                0
            }
        }
        Some(other) => {
            diag.push(format!("{path}.{key}"), format!("expected number, found {}", kind(other)));
            0
        }
    }
}

/// Largest magnitude accepted for an epoch-millisecond timestamp (±100M days).
pub const MAX_TIMESTAMP_MS: i64 = 8_640_000_000_000_000;

/// Epoch-millisecond timestamp. Accepts integers and RFC 3339 strings.
/// Numbers outside `±MAX_TIMESTAMP_MS` are dropped with a diagnostic.
pub fn timestamp_ms(obj: &Map<String, Value>, key: &str, path: &str, diag: &mut Diagnostics) -> Option<i64> {
    match obj.get(key)? {
        Value::Null => None,
        Value::Number(n) => {
            let ms = match n.as_i64() {
                Some(i) => Some(i),
                None => n
                    .as_f64()
                    .filter(|f| f.is_finite() && f.abs() <= MAX_TIMESTAMP_MS as f64)
                    .map(|f| f as i64),
            };
            match ms.filter(|ms| (-MAX_TIMESTAMP_MS..=MAX_TIMESTAMP_MS).contains(ms)) {
                Some(ms) => Some(ms),
                None => {
                    diag.push(format!("{path}.{key}"), format!("timestamp {n} out of range"));
                    None
                }
            }
        }
        Value::String(s) => match chrono::DateTime::parse_from_rfc3339(s.trim()) {
            Ok(dt) => Some(dt.timestamp_millis()),
            Err(_) => {
                diag.push(format!("{path}.{key}"), format!("unparseable timestamp '{s}'"));
                None
            }
        },
        other => {
            diag.push(format!("{path}.{key}"), format!("expected timestamp, found {}", kind(other)));
            None
        }
    }
}

/// Fraction in `[0, 1]`, if the field holds a number.
pub fn fraction(obj: &Map<String, Value>, key: &str) -> Option<f64> {
    obj.get(key)
        .and_then(Value::as_f64)
        .filter(|f| f.is_finite())
        .map(|f| f.clamp(0.0, 1.0))
}

pub fn flag(obj: &Map<String, Value>, key: &str, default: bool) -> bool {
    obj.get(key).and_then(Value::as_bool).unwrap_or(default)
}
