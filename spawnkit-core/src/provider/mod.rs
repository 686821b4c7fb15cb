//! Telemetry providers.
//!
//! A provider fetches raw, backend-specific payloads and performs no
//! validation; the normalizer owns every shape decision. Sub-fetch failures
//! are reported as [`SoftError`]s next to whatever did succeed. Only a total
//! failure is returned as an error.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tokio::sync::mpsc;

use crate::error::Result;

pub mod demo;
pub mod local;
#[cfg(feature = "relay")]
pub mod relay;

pub use demo::DemoProvider;
pub use local::{LocalProvider, PushHandle};
#[cfg(feature = "relay")]
pub use relay::RelayProvider;

/// Resources every provider attempts to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Sessions,
    Crons,
    Memory,
    Agents,
}

impl Resource {
    /// Resources whose combined failure makes a fetch a total failure.
    pub const REQUIRED: [Resource; 3] = [Resource::Sessions, Resource::Crons, Resource::Memory];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Sessions => "sessions",
            Resource::Crons => "crons",
            Resource::Memory => "memory",
            Resource::Agents => "agents",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Marker for a sub-fetch that failed while others succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftError {
    pub resource: Resource,
    pub message: String,
}

/// Untyped bag of backend payloads. Failed or absent resources are `Null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPayload {
    #[serde(default)]
    pub sessions: Value,
    #[serde(default)]
    pub crons: Value,
    #[serde(default)]
    pub memory: Value,
    #[serde(default)]
    pub agents: Value,
    #[serde(default)]
    pub soft_errors: Vec<SoftError>,
}

impl RawPayload {
    /// Store the outcome of one sub-fetch, recording a soft error on failure.
    pub fn set<E: fmt::Display>(&mut self, resource: Resource, outcome: std::result::Result<Value, E>) {
        let value = match outcome {
            Ok(value) => value,
            Err(e) => {
                self.soft_errors.push(SoftError {
                    resource,
                    message: e.to_string(),
                });
                Value::Null
            }
        };
        match resource {
            Resource::Sessions => self.sessions = value,
            Resource::Crons => self.crons = value,
            Resource::Memory => self.memory = value,
            Resource::Agents => self.agents = value,
        }
    }

    pub fn failed(&self, resource: Resource) -> bool {
        self.soft_errors.iter().any(|e| e.resource == resource)
    }

    /// True when every required resource failed.
    pub fn is_total_failure(&self) -> bool {
        Resource::REQUIRED.iter().all(|r| self.failed(*r))
    }

    /// Summary of soft errors for log lines.
    pub fn soft_error_summary(&self) -> String {
        self.soft_errors
            .iter()
            .map(|e| format!("{}: {}", e.resource, e.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Source of raw telemetry.
#[async_trait]
pub trait TelemetryProvider: Send + Sync {
    /// Short name for logs and errors.
    fn name(&self) -> &str;

    /// Fetch every resource. Partial failures surface as soft errors.
    async fn fetch_all(&self) -> Result<RawPayload>;

    /// Cheap reachability probe.
    async fn is_available(&self) -> bool;

    /// Out-of-band update stream, if the provider has one. Yields the
    /// receiver once; later calls return `None`.
    fn take_updates(&self) -> Option<mpsc::Receiver<RawPayload>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_records_soft_errors() {
        let mut raw = RawPayload::default();
        raw.set(Resource::Sessions, Ok::<_, String>(json!([{"key": "agent:main:main"}])));
        raw.set(Resource::Crons, Err::<Value, _>("timeout"));
        assert!(raw.sessions.is_array());
        assert!(raw.crons.is_null());
        assert!(raw.failed(Resource::Crons));
        assert!(!raw.is_total_failure());

        raw.set(Resource::Sessions, Err::<Value, _>("refused"));
        raw.set(Resource::Memory, Err::<Value, _>("refused"));
        assert!(raw.is_total_failure());
        assert!(raw.soft_error_summary().contains("crons: timeout"));
    }
}
