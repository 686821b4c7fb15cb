//! Provider backed by a remote relay that aggregates several fleets.
//!
//! # Usage
//!
//! ```rust,no_run
//! use spawnkit_core::provider::{RelayProvider, TelemetryProvider};
//!
//! #[tokio::main]
//! async fn main() -> spawnkit_core::Result<()> {
//!     let relay = RelayProvider::new("https://relay.example.com")?.with_token("secret");
//!     if relay.is_available().await {
//!         let raw = relay.fetch_all().await?;
//!         println!("{} soft errors", raw.soft_errors.len());
//!     }
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::{RawPayload, Resource, TelemetryProvider};
use crate::error::{Error, Result};

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(8);

#[derive(Debug, Deserialize)]
struct HealthResponse {
    #[serde(default)]
    ok: bool,
}

#[derive(Clone)]
pub struct RelayProvider {
    /// Base URL without trailing slash
    base_url: String,
    /// Bearer token sent with every request
    token: Option<String>,
    client: reqwest::Client,
}

impl RelayProvider {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            client,
        })
    }

    /// Set the authentication token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = (!token.trim().is_empty()).then_some(token);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn path_for(resource: Resource) -> &'static str {
        match resource {
            Resource::Sessions => "/api/oc/sessions",
            Resource::Crons => "/api/oc/crons",
            Resource::Memory => "/api/oc/memory",
            Resource::Agents => "/api/oc/agents",
        }
    }

    async fn get(&self, path: &str) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Relay request: GET {}", url);

        let mut req = self.client.get(&url);
        if let Some(ref token) = self.token {
            req = req.header("Authorization", format!("Bearer {}", token));
        }

        let resp = req.send().await?;
        let status = resp.status();
        if status.is_success() {
            Ok(resp.json().await?)
        } else {
            let error_text = resp.text().await.unwrap_or_default();
            Err(Error::Other(format!("relay error {}: {}", status, error_text.trim())))
        }
    }

    async fn fetch(&self, resource: Resource) -> Result<Value> {
        self.get(Self::path_for(resource)).await
    }
}

#[async_trait]
impl TelemetryProvider for RelayProvider {
    fn name(&self) -> &str {
        "relay"
    }

    async fn fetch_all(&self) -> Result<RawPayload> {
        let (sessions, crons, memory, agents) = tokio::join!(
            self.fetch(Resource::Sessions),
            self.fetch(Resource::Crons),
            self.fetch(Resource::Memory),
            self.fetch(Resource::Agents),
        );

        let mut raw = RawPayload::default();
        raw.set(Resource::Sessions, sessions);
        raw.set(Resource::Crons, crons);
        raw.set(Resource::Memory, memory);
        raw.set(Resource::Agents, agents);

        if raw.is_total_failure() {
            return Err(Error::unavailable(self.name(), raw.soft_error_summary()));
        }
        Ok(raw)
    }

    async fn is_available(&self) -> bool {
        match self.get("/api/oc/health").await {
            Ok(value) => serde_json::from_value::<HealthResponse>(value)
                .map(|h| h.ok)
                .unwrap_or(false),
            Err(e) => {
                debug!(error = %e, "Relay health check failed");
                false
            }
        }
    }
}
