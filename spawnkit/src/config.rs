//! Configuration management for spawnkit.
//!
//! Configuration is loaded from multiple sources with precedence:
//! 1. Command-line flags
//! 2. Environment variables (OPENCLAW_HOME, OC_RELAY_URL, OC_RELAY_TOKEN)
//! 3. Config file ($SPAWNKIT_CONFIG or <data dir>/config.toml)
//! 4. Default values

use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use spawnkit_core::TelemetryProvider;
use spawnkit_core::provider::{DemoProvider, LocalProvider, RelayProvider};
use spawnkit_sdk::EngineConfig;

use crate::cli::{ProviderFlags, ProviderKind};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Engine timing and thresholds
    #[serde(default)]
    pub engine: EngineConfig,

    /// Telemetry source
    #[serde(default)]
    pub provider: ProviderConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub kind: ProviderKind,

    /// OpenClaw state directory; discovered when unset
    pub root: Option<PathBuf>,

    /// Relay base URL
    pub relay_url: Option<String>,

    /// Bearer token sent to the relay
    pub relay_token: Option<String>,
}

fn default_data_dir() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("dev", "spawnkit", "spawnkit") {
        proj_dirs.data_dir().to_path_buf()
    } else {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".spawnkit")
    }
}

impl Config {
    /// Load configuration from file and environment.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path())?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load a config file; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        let config: Config = if path.exists() {
            let content = std::fs::read_to_string(path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")?
        } else {
            Config::default()
        };

        config
            .engine
            .validate()
            .with_context(|| format!("Invalid [engine] section in {}", path.display()))?;
        Ok(config)
    }

    /// Get the config file path.
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("SPAWNKIT_CONFIG") {
            PathBuf::from(path)
        } else {
            default_data_dir().join("config.toml")
        }
    }

    /// Apply environment overrides. A relay URL in the environment selects
    /// the relay provider.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(root) = var("OPENCLAW_HOME").filter(|v| !v.is_empty()) {
            self.provider.root = Some(PathBuf::from(root));
        }
        if let Some(url) = var("OC_RELAY_URL").filter(|v| !v.is_empty()) {
            self.provider.relay_url = Some(url);
            self.provider.kind = ProviderKind::Relay;
        }
        if let Some(token) = var("OC_RELAY_TOKEN").filter(|v| !v.is_empty()) {
            self.provider.relay_token = Some(token);
        }
    }

    pub fn apply_flags(&mut self, flags: &ProviderFlags) {
        if let Some(root) = &flags.root {
            self.provider.root = Some(root.clone());
            self.provider.kind = ProviderKind::Local;
        }
        if let Some(url) = &flags.relay_url {
            self.provider.relay_url = Some(url.clone());
            self.provider.kind = ProviderKind::Relay;
        }
        if let Some(kind) = flags.provider {
            self.provider.kind = kind;
        }
    }

    /// Build the configured provider.
    pub fn build_provider(&self) -> Result<Arc<dyn TelemetryProvider>> {
        let timeout = Duration::from_millis(self.engine.fetch_timeout_ms);
        let provider: Arc<dyn TelemetryProvider> = match self.provider.kind {
            ProviderKind::Local => {
                let provider = match &self.provider.root {
                    Some(root) => LocalProvider::new(root),
                    None => LocalProvider::discover().context("No OpenClaw state directory found")?,
                };
                Arc::new(provider.with_timeout(timeout))
            }
            ProviderKind::Relay => {
                let Some(url) = &self.provider.relay_url else {
                    bail!("Relay provider selected but no relay_url configured (set OC_RELAY_URL)");
                };
                let mut relay = RelayProvider::with_timeout(url.as_str(), timeout)
                    .context("Failed to build relay client")?;
                if let Some(token) = &self.provider.relay_token {
                    relay = relay.with_token(token.as_str());
                }
                Arc::new(relay)
            }
            ProviderKind::Demo => Arc::new(DemoProvider::default()),
        };
        Ok(provider)
    }

    /// Engine settings for one-shot commands: no background loop.
    pub fn one_shot_engine(&self) -> EngineConfig {
        self.engine.clone().with_auto_start(false)
    }
}
