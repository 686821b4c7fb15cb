//! Error types for spawnkit-core.

use thiserror::Error;

use crate::naming::ParentKey;

/// Result type alias using spawnkit-core Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for telemetry and naming operations
#[derive(Error, Debug)]
pub enum Error {
    // Provider errors
    #[error("provider '{provider}' unavailable: {reason}")]
    ProviderUnavailable { provider: String, reason: String },

    // Naming errors
    #[error("naming validation failed: {0}")]
    Naming(#[from] NamingValidationError),

    #[error("id space exhausted for {parent}.{role} (all 333 suffixes in use)")]
    IdSpaceExhausted { parent: ParentKey, role: String },

    // Transport errors
    #[cfg(feature = "relay")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a provider unavailable error
    pub fn unavailable(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ProviderUnavailable {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    /// Check if this error came from a provider (recoverable, drives mode fallback)
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::ProviderUnavailable { .. })
    }

    /// Check if this error is a caller mistake in the naming layer
    pub fn is_naming(&self) -> bool {
        matches!(self, Self::Naming(_) | Self::IdSpaceExhausted { .. })
    }
}

/// Rejections raised by the identity allocator and role registry.
///
/// These are always returned to the caller; nothing in the engine swallows them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NamingValidationError {
    #[error("unknown parent: {0}")]
    UnknownParent(String),

    #[error("unknown role: {0}")]
    UnknownRole(String),

    #[error("role {role} is not permitted under parent {parent}")]
    RoleNotPermitted { role: String, parent: ParentKey },

    #[error("invalid role name '{0}': must start uppercase, be alphanumeric, 3-20 chars")]
    InvalidRoleName(String),

    #[error("invalid abbreviation '{0}': must be 2-4 uppercase alphanumeric chars")]
    InvalidAbbreviation(String),

    #[error("role already exists: {0}")]
    RoleExists(String),

    #[error("abbreviation {abbreviation} already used by role {role}")]
    AbbreviationTaken { abbreviation: String, role: String },

    #[error("role must allow at least one parent")]
    EmptyParents,

    #[error("invalid parents: {}", .0.join(", "))]
    InvalidParents(Vec<String>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::unavailable("relay", "connection refused");
        assert!(err.is_unavailable());
        assert!(!err.is_naming());
        assert!(err.to_string().contains("relay"));
        assert!(err.to_string().contains("connection refused"));

        let err: Error = NamingValidationError::UnknownParent("zeus".into()).into();
        assert!(err.is_naming());
        assert!(err.to_string().contains("zeus"));

        let err = Error::IdSpaceExhausted {
            parent: ParentKey::Forge,
            role: "CodeBuilder".into(),
        };
        assert!(err.is_naming());
        assert!(err.to_string().contains("forge.CodeBuilder"));
    }

    #[test]
    fn test_invalid_parents_lists_all() {
        let err = NamingValidationError::InvalidParents(vec!["zeus".into(), "hera".into()]);
        assert_eq!(err.to_string(), "invalid parents: zeus, hera");
    }
}
