//! Command implementations for the spawnkit CLI.

pub mod name;
pub mod snapshot;
pub mod status;
pub mod watch;

use anyhow::{Context, Result};
use spawnkit_sdk::{EngineConfig, SpawnKit};

use crate::config::Config;

/// Build the facade over the configured provider.
pub(crate) fn open(config: &Config, engine: EngineConfig) -> Result<SpawnKit> {
    let provider = config.build_provider()?;
    SpawnKit::new(provider, engine).context("Failed to start engine")
}
