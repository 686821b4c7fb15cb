//! Deterministic hierarchical naming for sub-tasks.
//!
//! Names take the form `<ParentDisplay>.<Role>-<IdSuffix>`, e.g.
//! `Forge.CodeBuilder-01` (abbreviated `F.CB-01`).

mod registry;
mod roles;
mod suffix;

pub use registry::{NamingRecord, NamingRegistry, RoleListing};
pub use roles::{CoreRole, CustomRole, ParentKey, Role, RoleInfo, RoleRegistration};
pub use suffix::{IdSuffix, MAX_NUMERIC, next_suffix};
