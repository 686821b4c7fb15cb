//! SpawnKit SDK
//!
//! Runtime around `spawnkit-core`: the refresh state machine, live/demo
//! mode handling, the live update loop and a topic-based event bus.
//!
//! # Topics
//!
//! - `data:refresh` - a new snapshot was stored
//! - `mode:live` / `mode:demo` - the engine switched modes
//! - `agent:status`, `subagent:spawn`, `mission:new`, `cron:trigger` - diff events
//! - `live:started` / `live:stopped` - the live loop changed state
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use spawnkit_core::provider::DemoProvider;
//! use spawnkit_sdk::{EngineConfig, SpawnKit};
//!
//! async fn example() -> spawnkit_sdk::SDKResult<()> {
//!     let kit = SpawnKit::new(Arc::new(DemoProvider::default()), EngineConfig::default())?;
//!     kit.subscribe("data:refresh", |event| {
//!         if let Some(snapshot) = event.snapshot() {
//!             println!("{} agents", snapshot.agents.len());
//!         }
//!     });
//!     kit.init().await;
//!     Ok(())
//! }
//! ```

pub mod events;
pub mod utils;

mod config;
mod engine;
mod error;
mod scheduler;
mod sdk;

#[cfg(test)]
mod testing;

pub use config::{ConfigValidationError, EngineConfig};
pub use engine::{DebugInfo, TickOutcome};
pub use error::{SDKError, SDKResult};
pub use events::{EngineEvent, EventBus, SubscriptionId};
pub use sdk::SpawnKit;

/// Re-export of the core crate.
pub use spawnkit_core as core;
