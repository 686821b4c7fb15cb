//! Engine Configuration
//!
//! Defines the options recognised by the SpawnKit facade. Keys are snake_case
//! in TOML; the camelCase spellings used by JSON clients are accepted as aliases.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use spawnkit_core::Mode;

/// Engine configuration options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Poll interval while in Live mode, in milliseconds (default: 10000)
    #[serde(alias = "refreshIntervalLiveMs")]
    pub refresh_interval_live_ms: u64,

    /// Poll interval while in Demo mode, in milliseconds (default: 30000)
    #[serde(alias = "refreshIntervalDemoMs")]
    pub refresh_interval_demo_ms: u64,

    /// Start live updates as part of `init()` (default: true)
    #[serde(alias = "autoStart")]
    pub auto_start: bool,

    /// Probe provider availability on every Nth consecutive failure (default: 3)
    #[serde(alias = "failureThresholdForModeCheck")]
    pub failure_threshold_for_mode_check: u32,

    /// Upper bound on a single provider call, in milliseconds (default: 8000)
    #[serde(alias = "fetchTimeoutMs")]
    pub fetch_timeout_ms: u64,

    /// Window within which an agent counts as active (default: 300000 = 5 minutes)
    #[serde(alias = "recencyWindowMs")]
    pub recency_window_ms: u64,

    /// Maximum synthesized missions per snapshot (default: 5)
    #[serde(alias = "maxMissions")]
    pub max_missions: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            refresh_interval_live_ms: 10_000,
            refresh_interval_demo_ms: 30_000,
            auto_start: true,
            failure_threshold_for_mode_check: 3,
            fetch_timeout_ms: 8_000,
            recency_window_ms: 300_000, // 5 minutes
            max_missions: 5,
        }
    }
}

impl EngineConfig {
    /// Set both poll intervals
    pub fn with_intervals(mut self, live_ms: u64, demo_ms: u64) -> Self {
        self.refresh_interval_live_ms = live_ms;
        self.refresh_interval_demo_ms = demo_ms;
        self
    }

    /// Set whether `init()` starts live updates
    pub fn with_auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start = auto_start;
        self
    }

    /// Set the failure threshold for availability probes
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold_for_mode_check = threshold;
        self
    }

    /// Set the provider call timeout
    pub fn with_fetch_timeout(mut self, timeout_ms: u64) -> Self {
        self.fetch_timeout_ms = timeout_ms;
        self
    }

    /// Poll interval for a mode
    pub fn interval_for(&self, mode: Mode) -> Duration {
        Duration::from_millis(match mode {
            Mode::Live => self.refresh_interval_live_ms,
            Mode::Demo => self.refresh_interval_demo_ms,
        })
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let positive = [
            ("refresh_interval_live_ms", self.refresh_interval_live_ms),
            ("refresh_interval_demo_ms", self.refresh_interval_demo_ms),
            (
                "failure_threshold_for_mode_check",
                u64::from(self.failure_threshold_for_mode_check),
            ),
            ("fetch_timeout_ms", self.fetch_timeout_ms),
            ("recency_window_ms", self.recency_window_ms),
            ("max_missions", self.max_missions as u64),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigValidationError::InvalidValue {
                    field: field.into(),
                    message: "must be greater than 0".into(),
                });
            }
        }

        if self.recency_window_ms > i64::MAX as u64 {
            return Err(ConfigValidationError::InvalidValue {
                field: "recency_window_ms".into(),
                message: "out of range".into(),
            });
        }

        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}
