//! SDK Error Types

use thiserror::Error;

/// SDK Result type alias
pub type SDKResult<T> = Result<T, SDKError>;

/// SDK errors
#[derive(Debug, Error)]
pub enum SDKError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigValidationError),

    /// Error from the core library (naming, providers)
    #[error(transparent)]
    Core(#[from] spawnkit_core::Error),
}

impl SDKError {
    /// Check if this error is a naming rejection (bad parent/role, exhausted ids)
    pub fn is_naming(&self) -> bool {
        matches!(self, Self::Core(e) if e.is_naming())
    }

    /// Check if this error is a configuration error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

impl From<spawnkit_core::NamingValidationError> for SDKError {
    fn from(err: spawnkit_core::NamingValidationError) -> Self {
        Self::Core(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigValidationError;

    #[test]
    fn test_error_classification() {
        let err: SDKError = spawnkit_core::NamingValidationError::EmptyParents.into();
        assert!(err.is_naming());
        assert!(!err.is_config());
        assert!(err.to_string().contains("at least one parent"));

        let err: SDKError = ConfigValidationError::InvalidValue {
            field: "refresh_interval_live_ms".into(),
            message: "must be greater than 0".into(),
        }
        .into();
        assert!(err.is_config());
        assert!(err.to_string().contains("refresh_interval_live_ms"));

        let err: SDKError = spawnkit_core::Error::unavailable("relay", "down").into();
        assert!(!err.is_naming());
    }
}
