//! SpawnKit Core
//!
//! Telemetry reconciliation for an agent fleet: raw provider payloads are
//! normalized into a [`CanonicalSnapshot`], compared against the previous
//! snapshot by the [`diff`] engine, and sub-tasks get stable structured names
//! from the [`naming`] registry.
//!
//! This crate has no background tasks. Scheduling, events and mode handling
//! live in `spawnkit-sdk`.

pub mod diff;
pub mod error;
pub mod naming;
pub mod normalize;
pub mod provider;
pub mod types;

pub use diff::{ChangeEvent, diff};
pub use error::{Error, NamingValidationError, Result};
pub use naming::{NamingRecord, NamingRegistry, ParentKey, RoleRegistration};
pub use normalize::{Normalized, NormalizeOptions, normalize};
pub use provider::{RawPayload, TelemetryProvider};
pub use types::*;
