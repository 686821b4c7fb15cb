//! Parent agents and role kinds.
//!
//! Both the parent set and the core role set are closed. Custom roles live in
//! [`super::NamingRegistry`] and are merged with these only at lookup time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::NamingValidationError;

// ─────────────────────────────────────────────────────────────────────────────
// Parents
// ─────────────────────────────────────────────────────────────────────────────

/// A top-level agent under which sub-tasks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParentKey {
    Main,
    Forge,
    Atlas,
    Hunter,
    Echo,
    Sentinel,
}

impl ParentKey {
    pub const ALL: [ParentKey; 6] = [
        ParentKey::Main,
        ParentKey::Forge,
        ParentKey::Atlas,
        ParentKey::Hunter,
        ParentKey::Echo,
        ParentKey::Sentinel,
    ];

    /// Lowercase key used by providers (`forge`).
    pub fn key(&self) -> &'static str {
        match self {
            ParentKey::Main => "main",
            ParentKey::Forge => "forge",
            ParentKey::Atlas => "atlas",
            ParentKey::Hunter => "hunter",
            ParentKey::Echo => "echo",
            ParentKey::Sentinel => "sentinel",
        }
    }

    /// Display form used inside structured names (`Forge`).
    pub fn display_name(&self) -> &'static str {
        match self {
            ParentKey::Main => "Main",
            ParentKey::Forge => "Forge",
            ParentKey::Atlas => "Atlas",
            ParentKey::Hunter => "Hunter",
            ParentKey::Echo => "Echo",
            ParentKey::Sentinel => "Sentinel",
        }
    }

    /// First letter of the display name, used by the abbreviated form.
    pub fn initial(&self) -> char {
        match self {
            ParentKey::Main => 'M',
            ParentKey::Forge => 'F',
            ParentKey::Atlas => 'A',
            ParentKey::Hunter => 'H',
            ParentKey::Echo => 'E',
            ParentKey::Sentinel => 'S',
        }
    }

    /// Resolve a display name (`Forge`) back to its key.
    pub fn from_display(display: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.display_name() == display)
    }

    /// Role assumed by legacy migration when no keyword matches.
    pub fn fallback_role(&self) -> CoreRole {
        match self {
            ParentKey::Main => CoreRole::Coordinator,
            ParentKey::Forge => CoreRole::CodeBuilder,
            ParentKey::Atlas => CoreRole::OpsRunner,
            ParentKey::Hunter => CoreRole::Researcher,
            ParentKey::Echo => CoreRole::ContentCreator,
            ParentKey::Sentinel => CoreRole::Auditor,
        }
    }
}

impl fmt::Display for ParentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ParentKey {
    type Err = NamingValidationError;

    /// Parses the lowercase key; display names are accepted case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.key() == lowered)
            .ok_or_else(|| NamingValidationError::UnknownParent(s.to_string()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Core roles
// ─────────────────────────────────────────────────────────────────────────────

/// The fixed set of role kinds every installation ships with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoreRole {
    TaskRunner,
    CodeBuilder,
    DataProcessor,
    ContentCreator,
    OpsRunner,
    Auditor,
    Researcher,
    Coordinator,
}

impl CoreRole {
    pub const ALL: [CoreRole; 8] = [
        CoreRole::TaskRunner,
        CoreRole::CodeBuilder,
        CoreRole::DataProcessor,
        CoreRole::ContentCreator,
        CoreRole::OpsRunner,
        CoreRole::Auditor,
        CoreRole::Researcher,
        CoreRole::Coordinator,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CoreRole::TaskRunner => "TaskRunner",
            CoreRole::CodeBuilder => "CodeBuilder",
            CoreRole::DataProcessor => "DataProcessor",
            CoreRole::ContentCreator => "ContentCreator",
            CoreRole::OpsRunner => "OpsRunner",
            CoreRole::Auditor => "Auditor",
            CoreRole::Researcher => "Researcher",
            CoreRole::Coordinator => "Coordinator",
        }
    }

    pub fn abbreviation(&self) -> &'static str {
        match self {
            CoreRole::TaskRunner => "TR",
            CoreRole::CodeBuilder => "CB",
            CoreRole::DataProcessor => "DP",
            CoreRole::ContentCreator => "CC",
            CoreRole::OpsRunner => "OR",
            CoreRole::Auditor => "AU",
            CoreRole::Researcher => "RE",
            CoreRole::Coordinator => "CO",
        }
    }

    /// Parents allowed to spawn this role.
    pub fn parents(&self) -> &'static [ParentKey] {
        use ParentKey::*;
        match self {
            CoreRole::TaskRunner => &[Forge, Atlas, Main],
            CoreRole::CodeBuilder => &[Forge],
            CoreRole::DataProcessor => &[Atlas],
            CoreRole::ContentCreator => &[Echo],
            CoreRole::OpsRunner => &[Atlas],
            CoreRole::Auditor => &[Sentinel],
            CoreRole::Researcher => &[Hunter, Echo],
            CoreRole::Coordinator => &[Main, Atlas],
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            CoreRole::TaskRunner => "Executes tasks and workflows",
            CoreRole::CodeBuilder => "Writes and reviews code",
            CoreRole::DataProcessor => "Transforms and moves data",
            CoreRole::ContentCreator => "Content creation and copywriting",
            CoreRole::OpsRunner => "DevOps and infrastructure",
            CoreRole::Auditor => "Auditing and review",
            CoreRole::Researcher => "Gathers and analyzes information",
            CoreRole::Coordinator => "Coordinates work across agents",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.name() == name)
    }

    pub fn from_abbreviation(abbreviation: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.abbreviation() == abbreviation)
    }
}

impl fmt::Display for CoreRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Merged view
// ─────────────────────────────────────────────────────────────────────────────

/// A runtime-registered role kind. Never replaces a core role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomRole {
    pub name: String,
    pub abbreviation: String,
    pub parents: Vec<ParentKey>,
    pub category: String,
    pub description: String,
    pub registered_at: chrono::DateTime<chrono::Utc>,
}

/// Request for [`super::NamingRegistry::register_role`].
///
/// Parents are raw strings so the registry can report every unknown key at once.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleRegistration {
    pub abbreviation: String,
    pub parents: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl RoleRegistration {
    pub fn new(abbreviation: impl Into<String>, parents: &[&str]) -> Self {
        Self {
            abbreviation: abbreviation.into(),
            parents: parents.iter().map(|p| p.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Either a core role or a custom one, as seen from a lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Core(CoreRole),
    Custom(CustomRole),
}

impl Role {
    pub fn name(&self) -> &str {
        match self {
            Role::Core(r) => r.name(),
            Role::Custom(r) => &r.name,
        }
    }

    pub fn abbreviation(&self) -> &str {
        match self {
            Role::Core(r) => r.abbreviation(),
            Role::Custom(r) => &r.abbreviation,
        }
    }

    pub fn parents(&self) -> &[ParentKey] {
        match self {
            Role::Core(r) => r.parents(),
            Role::Custom(r) => &r.parents,
        }
    }

    pub fn allows(&self, parent: ParentKey) -> bool {
        self.parents().contains(&parent)
    }

    pub fn is_core(&self) -> bool {
        matches!(self, Role::Core(_))
    }
}

/// Flat description of a role for listings and CLI output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleInfo {
    pub name: String,
    pub abbreviation: String,
    pub parents: Vec<ParentKey>,
    pub category: String,
    pub description: String,
    pub core: bool,
}

impl From<&Role> for RoleInfo {
    fn from(role: &Role) -> Self {
        match role {
            Role::Core(r) => RoleInfo {
                name: r.name().to_string(),
                abbreviation: r.abbreviation().to_string(),
                parents: r.parents().to_vec(),
                category: "core".to_string(),
                description: r.description().to_string(),
                core: true,
            },
            Role::Custom(r) => RoleInfo {
                name: r.name.clone(),
                abbreviation: r.abbreviation.clone(),
                parents: r.parents.clone(),
                category: r.category.clone(),
                description: r.description.clone(),
                core: false,
            },
        }
    }
}
