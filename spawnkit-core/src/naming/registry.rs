//! Identity allocation and the role registry.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::LazyLock;
use tracing::{debug, info};

use super::roles::{CoreRole, CustomRole, ParentKey, Role, RoleInfo, RoleRegistration};
use super::suffix::{IdSuffix, next_suffix};
use crate::error::{Error, NamingValidationError, Result};

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\w+)\.(\w+)-([A-Z]?\d+)$").expect("valid name regex"));
static ROLE_NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][a-zA-Z0-9]{2,19}$").expect("valid role regex"));
static ABBREVIATION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9]{2,4}$").expect("valid abbreviation regex"));
static VERSION_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-v?(\d+)$").expect("valid version regex"));

/// Keyword → role table for legacy labels, checked in order.
const LEGACY_KEYWORDS: &[(&[&str], CoreRole)] = &[
    (&["audit", "review"], CoreRole::Auditor),
    (&["data", "bridge"], CoreRole::TaskRunner),
    (&["gameboy", "enhance"], CoreRole::CodeBuilder),
    (&["ops", "hetzner"], CoreRole::OpsRunner),
    (&["landing", "content"], CoreRole::ContentCreator),
    (&["videocast", "video"], CoreRole::CodeBuilder),
];

/// One allocated identity: `<ParentDisplay>.<Role>-<IdSuffix>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamingRecord {
    pub parent_key: ParentKey,
    pub role_key: String,
    pub id_suffix: IdSuffix,
}

impl fmt::Display for NamingRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}-{}",
            self.parent_key.display_name(),
            self.role_key,
            self.id_suffix
        )
    }
}

/// Roles grouped for display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleListing {
    pub core: Vec<RoleInfo>,
    pub custom: Vec<RoleInfo>,
}

impl RoleListing {
    pub fn total(&self) -> usize {
        self.core.len() + self.custom.len()
    }
}

/// Owns the custom-role side table and every suffix handed out so far.
///
/// Core roles are never stored here; lookups merge them in.
#[derive(Debug, Default)]
pub struct NamingRegistry {
    custom_roles: Vec<CustomRole>,
    issued: HashMap<(ParentKey, String), BTreeSet<IdSuffix>>,
}

impl NamingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Role lookup
    // ─────────────────────────────────────────────────────────────────────────

    /// Look up a role by name, core first.
    pub fn role(&self, name: &str) -> Option<Role> {
        if let Some(core) = CoreRole::from_name(name) {
            return Some(Role::Core(core));
        }
        self.custom_roles
            .iter()
            .find(|r| r.name == name)
            .cloned()
            .map(Role::Custom)
    }

    pub fn role_info(&self, name: &str) -> Option<RoleInfo> {
        self.role(name).as_ref().map(RoleInfo::from)
    }

    pub fn is_core_role(&self, name: &str) -> bool {
        CoreRole::from_name(name).is_some()
    }

    pub fn is_custom_role(&self, name: &str) -> bool {
        self.custom_roles.iter().any(|r| r.name == name)
    }

    pub fn list_roles(&self) -> RoleListing {
        RoleListing {
            core: CoreRole::ALL
                .iter()
                .map(|r| RoleInfo::from(&Role::Core(*r)))
                .collect(),
            custom: self
                .custom_roles
                .iter()
                .map(|r| RoleInfo::from(&Role::Custom(r.clone())))
                .collect(),
        }
    }

    /// Every role (core and custom) that may run under `parent`.
    pub fn available_roles(&self, parent: ParentKey) -> Vec<RoleInfo> {
        let listing = self.list_roles();
        listing
            .core
            .into_iter()
            .chain(listing.custom)
            .filter(|r| r.parents.contains(&parent))
            .collect()
    }

    fn abbreviation_owner(&self, abbreviation: &str) -> Option<String> {
        if let Some(core) = CoreRole::from_abbreviation(abbreviation) {
            return Some(core.name().to_string());
        }
        self.custom_roles
            .iter()
            .find(|r| r.abbreviation == abbreviation)
            .map(|r| r.name.clone())
    }

    /// Register a new role kind. Nothing is stored unless every check passes.
    pub fn register_role(
        &mut self,
        name: &str,
        registration: RoleRegistration,
    ) -> std::result::Result<RoleInfo, NamingValidationError> {
        if !ROLE_NAME_PATTERN.is_match(name) {
            return Err(NamingValidationError::InvalidRoleName(name.to_string()));
        }
        if self.role(name).is_some() {
            return Err(NamingValidationError::RoleExists(name.to_string()));
        }

        let abbreviation = registration.abbreviation;
        if !ABBREVIATION_PATTERN.is_match(&abbreviation) {
            return Err(NamingValidationError::InvalidAbbreviation(abbreviation));
        }
        if let Some(role) = self.abbreviation_owner(&abbreviation) {
            return Err(NamingValidationError::AbbreviationTaken { abbreviation, role });
        }

        if registration.parents.is_empty() {
            return Err(NamingValidationError::EmptyParents);
        }
        let mut parents = Vec::with_capacity(registration.parents.len());
        let mut invalid = Vec::new();
        for raw in &registration.parents {
            match raw.parse::<ParentKey>() {
                Ok(parent) if !parents.contains(&parent) => parents.push(parent),
                Ok(_) => {}
                Err(_) => invalid.push(raw.clone()),
            }
        }
        if !invalid.is_empty() {
            return Err(NamingValidationError::InvalidParents(invalid));
        }

        let role = CustomRole {
            name: name.to_string(),
            abbreviation,
            parents,
            category: registration.category.unwrap_or_else(|| "custom".to_string()),
            description: registration.description.unwrap_or_default(),
            registered_at: chrono::Utc::now(),
        };
        info!(role = %role.name, abbreviation = %role.abbreviation, "Registered custom role");

        let registered = RoleInfo::from(&Role::Custom(role.clone()));
        self.custom_roles.push(role);
        Ok(registered)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Allocation
    // ─────────────────────────────────────────────────────────────────────────

    /// Check that `role` exists and may run under `parent`.
    pub fn validate_pair(
        &self,
        parent: &str,
        role: &str,
    ) -> std::result::Result<(ParentKey, Role), NamingValidationError> {
        let parent: ParentKey = parent.parse()?;
        let role = self
            .role(role)
            .ok_or_else(|| NamingValidationError::UnknownRole(role.to_string()))?;
        if !role.allows(parent) {
            return Err(NamingValidationError::RoleNotPermitted {
                role: role.name().to_string(),
                parent,
            });
        }
        Ok((parent, role))
    }

    /// Allocate the next identity for `(parent, role)`.
    ///
    /// `observed` holds names already visible elsewhere (e.g. in the current
    /// snapshot); they count as in use alongside everything this registry issued.
    pub fn allocate<'a, I>(&mut self, parent: &str, role: &str, observed: I) -> Result<NamingRecord>
    where
        I: IntoIterator<Item = &'a NamingRecord>,
    {
        let (parent, role) = self.validate_pair(parent, role)?;
        let role_key = role.name().to_string();

        let issued = self.issued.entry((parent, role_key.clone())).or_default();
        let in_use = issued.iter().copied().chain(
            observed
                .into_iter()
                .filter(|r| r.parent_key == parent && r.role_key == role_key)
                .map(|r| r.id_suffix),
        );

        let id_suffix = next_suffix(in_use).ok_or_else(|| Error::IdSpaceExhausted {
            parent,
            role: role_key.clone(),
        })?;
        issued.insert(id_suffix);

        let record = NamingRecord {
            parent_key: parent,
            role_key,
            id_suffix,
        };
        debug!(name = %record, "Allocated sub-task identity");
        Ok(record)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Parsing & migration
    // ─────────────────────────────────────────────────────────────────────────

    /// Parse a structured name. Anything malformed or unknown yields `None`.
    pub fn parse(&self, name: &str) -> Option<NamingRecord> {
        let caps = NAME_PATTERN.captures(name.trim())?;
        let parent = ParentKey::from_display(&caps[1])?;
        let role = self.role(&caps[2])?;
        if !role.allows(parent) {
            return None;
        }
        let id_suffix = IdSuffix::parse(&caps[3])?;
        Some(NamingRecord {
            parent_key: parent,
            role_key: role.name().to_string(),
            id_suffix,
        })
    }

    /// Short form of a record, e.g. `F.CB-01`.
    pub fn abbreviated(&self, record: &NamingRecord) -> Option<String> {
        let role = self.role(&record.role_key)?;
        Some(format!(
            "{}.{}-{}",
            record.parent_key.initial(),
            role.abbreviation(),
            record.id_suffix
        ))
    }

    /// Infer a structured name from a free-text legacy label.
    ///
    /// Returns `None` when the inferred role may not run under `parent`.
    pub fn migrate_legacy(&self, label: Option<&str>, parent: Option<&str>) -> Option<NamingRecord> {
        let label = label?.trim().to_lowercase();
        let parent: ParentKey = parent?.parse().ok()?;

        let role = LEGACY_KEYWORDS
            .iter()
            .find(|(keywords, _)| keywords.iter().any(|k| label.contains(k)))
            .map(|(_, role)| *role)
            .unwrap_or_else(|| parent.fallback_role());

        if !role.parents().contains(&parent) {
            debug!(label = %label, parent = %parent, role = %role, "Legacy label does not resolve");
            return None;
        }

        let id_suffix = VERSION_SUFFIX
            .captures(&label)
            .and_then(|caps| caps[1].parse::<u32>().ok())
            .and_then(IdSuffix::from_number)
            .unwrap_or(IdSuffix::Numeric(1));

        Some(NamingRecord {
            parent_key: parent,
            role_key: role.name().to_string(),
            id_suffix,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn migrated(registry: &NamingRegistry, label: &str, parent: &str) -> Option<String> {
        registry
            .migrate_legacy(Some(label), Some(parent))
            .map(|r| r.to_string())
    }

    #[test]
    fn test_allocate_numeric_then_overflow_then_exhausted() {
        let mut registry = NamingRegistry::new();
        for n in 1..=99 {
            let record = registry.allocate("forge", "CodeBuilder", []).unwrap();
            assert_eq!(record.id_suffix.to_string(), format!("{:02}", n));
        }

        let first_overflow = registry.allocate("forge", "CodeBuilder", []).unwrap();
        assert_eq!(first_overflow.to_string(), "Forge.CodeBuilder-A1");

        let mut last = first_overflow;
        for _ in 1..234 {
            last = registry.allocate("forge", "CodeBuilder", []).unwrap();
        }
        assert_eq!(last.id_suffix.to_string(), "Z9");

        let err = registry.allocate("forge", "CodeBuilder", []).unwrap_err();
        assert!(matches!(err, Error::IdSpaceExhausted { parent: ParentKey::Forge, .. }));

        // Other pairs are unaffected
        let other = registry.allocate("forge", "TaskRunner", []).unwrap();
        assert_eq!(other.to_string(), "Forge.TaskRunner-01");
    }

    #[test]
    fn test_allocate_respects_observed_names() {
        let mut registry = NamingRegistry::new();
        let seen = vec![
            registry.parse("Atlas.OpsRunner-07").unwrap(),
            registry.parse("Atlas.TaskRunner-30").unwrap(),
        ];
        let record = registry.allocate("atlas", "OpsRunner", &seen).unwrap();
        assert_eq!(record.to_string(), "Atlas.OpsRunner-08");
    }

    #[test]
    fn test_allocate_rejects_bad_pairs() {
        let mut registry = NamingRegistry::new();
        let err = registry.allocate("zeus", "TaskRunner", []).unwrap_err();
        assert!(matches!(err, Error::Naming(NamingValidationError::UnknownParent(_))));

        let err = registry.allocate("echo", "CodeBuilder", []).unwrap_err();
        assert!(matches!(
            err,
            Error::Naming(NamingValidationError::RoleNotPermitted { .. })
        ));

        let err = registry.allocate("echo", "Juggler", []).unwrap_err();
        assert!(matches!(err, Error::Naming(NamingValidationError::UnknownRole(_))));
    }

    #[test]
    fn test_parse_round_trip() {
        let registry = NamingRegistry::new();
        for name in ["Forge.CodeBuilder-01", "Hunter.Researcher-A1", "Main.Coordinator-99"] {
            let record = registry.parse(name).unwrap();
            assert_eq!(record.to_string(), name);
        }
        let record = registry.parse("Forge.TaskRunner-01").unwrap();
        assert_eq!(registry.abbreviated(&record).unwrap(), "F.TR-01");
    }

    #[test]
    fn test_parse_rejects_invalid() {
        let registry = NamingRegistry::new();
        for name in [
            "",
            "Forge",
            "Forge.CodeBuilder",
            "Zeus.CodeBuilder-01",
            "Echo.CodeBuilder-01",
            "Forge.Nope-01",
            "Forge.CodeBuilder-1",
            "Forge.CodeBuilder-00",
            "Forge.CodeBuilder-100",
            "forge.CodeBuilder-01",
        ] {
            assert!(registry.parse(name).is_none(), "{name} should be invalid");
        }
    }

    #[test]
    fn test_register_role() {
        let mut registry = NamingRegistry::new();
        let info = registry
            .register_role(
                "Designer",
                RoleRegistration::new("DS", &["echo", "forge"]).with_description("UI work"),
            )
            .unwrap();
        assert!(!info.core);
        assert_eq!(info.category, "custom");
        assert!(registry.is_custom_role("Designer"));

        let record = registry.allocate("echo", "Designer", []).unwrap();
        assert_eq!(record.to_string(), "Echo.Designer-01");
        assert_eq!(registry.abbreviated(&record).unwrap(), "E.DS-01");
        assert!(registry.parse("Forge.Designer-04").is_some());
        assert_eq!(registry.available_roles(ParentKey::Echo).len(), 3);
    }

    #[test]
    fn test_register_role_rejects_core_abbreviation() {
        let mut registry = NamingRegistry::new();
        let before = registry.list_roles();
        let err = registry
            .register_role("Tracker", RoleRegistration::new("TR", &["forge"]))
            .unwrap_err();
        assert_eq!(
            err,
            NamingValidationError::AbbreviationTaken {
                abbreviation: "TR".into(),
                role: "TaskRunner".into()
            }
        );
        let after = registry.list_roles();
        assert_eq!(after.core, before.core);
        assert!(after.custom.is_empty());
        assert_eq!(registry.role("TaskRunner"), Some(Role::Core(CoreRole::TaskRunner)));
    }

    #[test]
    fn test_register_role_validation() {
        let mut registry = NamingRegistry::new();
        let cases = [
            ("ab", RoleRegistration::new("AB", &["forge"])),
            ("lowercase", RoleRegistration::new("LC", &["forge"])),
            ("Auditor", RoleRegistration::new("AD", &["forge"])),
            ("Mapper", RoleRegistration::new("m", &["forge"])),
            ("Mapper", RoleRegistration::new("TOOLONG", &["forge"])),
            ("Mapper", RoleRegistration::new("MP", &[])),
            ("Mapper", RoleRegistration::new("MP", &["forge", "zeus"])),
        ];
        for (name, registration) in cases {
            assert!(registry.register_role(name, registration).is_err(), "{name}");
        }
        assert!(registry.list_roles().custom.is_empty());

        registry
            .register_role("Mapper", RoleRegistration::new("MP", &["atlas"]))
            .unwrap();
        let err = registry
            .register_role("Mapper", RoleRegistration::new("MQ", &["atlas"]))
            .unwrap_err();
        assert_eq!(err, NamingValidationError::RoleExists("Mapper".into()));
        let err = registry
            .register_role("Plotter", RoleRegistration::new("MP", &["atlas"]))
            .unwrap_err();
        assert!(matches!(err, NamingValidationError::AbbreviationTaken { .. }));
    }

    #[test]
    fn test_migrate_legacy() {
        let registry = NamingRegistry::new();
        assert_eq!(
            migrated(&registry, "sentinel-gameboy-audit", "sentinel").as_deref(),
            Some("Sentinel.Auditor-01")
        );
        assert_eq!(
            migrated(&registry, "forge-data-bridge", "forge").as_deref(),
            Some("Forge.TaskRunner-01")
        );
        assert_eq!(
            migrated(&registry, "echo-landing-v2", "echo").as_deref(),
            Some("Echo.ContentCreator-02")
        );
        assert_eq!(
            migrated(&registry, "forge-videocast-v2", "forge").as_deref(),
            Some("Forge.CodeBuilder-02")
        );
        assert_eq!(
            migrated(&registry, "unknown-task", "hunter").as_deref(),
            Some("Hunter.Researcher-01")
        );
        assert_eq!(
            migrated(&registry, "nightly-sync-12", "atlas").as_deref(),
            Some("Atlas.OpsRunner-12")
        );
    }

    #[test]
    fn test_migrate_legacy_unresolvable() {
        let registry = NamingRegistry::new();
        // TaskRunner is not permitted under echo
        assert!(registry.migrate_legacy(Some("echo-data-pipeline"), Some("echo")).is_none());
        assert!(registry.migrate_legacy(None, Some("forge")).is_none());
        assert!(registry.migrate_legacy(Some("forge-build"), None).is_none());
        assert!(registry.migrate_legacy(Some("forge-build"), Some("zeus")).is_none());
        // Out-of-range version numbers start at 01
        assert_eq!(
            migrated(&registry, "forge-build-v250", "forge").as_deref(),
            Some("Forge.CodeBuilder-01")
        );
    }
}
