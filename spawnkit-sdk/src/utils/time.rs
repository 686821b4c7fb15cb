//! Time Utilities

use chrono::Utc;

/// Current time as epoch milliseconds
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Short "how long ago" label for an epoch-millisecond timestamp
pub fn relative_time(at_ms: Option<i64>, now_ms: i64) -> String {
    let Some(at) = at_ms else {
        return "never".to_string();
    };
    let seconds = now_ms.saturating_sub(at).max(0) / 1000;
    match seconds {
        0..=59 => "just now".to_string(),
        60..=3_599 => format!("{}m ago", seconds / 60),
        3_600..=86_399 => format!("{}h ago", seconds / 3_600),
        _ => format!("{}d ago", seconds / 86_400),
    }
}
