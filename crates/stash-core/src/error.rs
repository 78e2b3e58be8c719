//! Unified error types for all layers of Stash.

use crate::capability::Capability;
use std::fmt::Debug;
use thiserror::Error;

/// Unified error type for Stash.
///
/// Only backing-store errors and contract violations are meant to reach the
/// caller of an orchestrator. Cache and lock errors are produced by the
/// lower layers but absorbed by the read-through paths.
#[derive(Error, Debug)]
pub enum StashError {
    // ============ Contract Errors ============
    /// A record type lacks a capability required by the call path
    #[error("Capability missing: record does not implement {0}")]
    CapabilityMissing(Capability),

    /// Operation not supported by this component
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    // ============ Data Errors ============
    /// Resource not found
    #[error("Resource not found: {resource_type} with key {key}")]
    NotFound {
        resource_type: &'static str,
        key: String,
    },

    /// Payload could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    // ============ Infrastructure Errors ============
    /// Key-value backend error
    #[error("Cache error: {0}")]
    Cache(String),

    /// Backing store error
    #[error("Database error: {0}")]
    Database(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    // ============ Internal Errors ============
    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StashError {
    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::CapabilityMissing(_) => "CAPABILITY_MISSING",
            Self::Unsupported(_) => "UNSUPPORTED",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Cache(_) => "CACHE_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Internal(_) | Self::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// Creates a not found error for a resource.
    #[must_use]
    pub fn not_found<T: ToString>(resource_type: &'static str, key: T) -> Self {
        Self::NotFound {
            resource_type,
            key: key.to_string(),
        }
    }

    /// Creates a cache error.
    #[must_use]
    pub fn cache<T: Into<String>>(message: T) -> Self {
        Self::Cache(message.into())
    }

    /// Creates a validation error.
    #[must_use]
    pub fn validation<T: Into<String>>(message: T) -> Self {
        Self::Validation(message.into())
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self::Internal(message.into())
    }

    /// Checks if this error is retriable.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(self, Self::Cache(_) | Self::Database(_))
    }

    /// Checks if this error is a programming contract violation.
    ///
    /// Contract violations fail fast and are never retried.
    #[must_use]
    pub const fn is_contract_violation(&self) -> bool {
        matches!(self, Self::CapabilityMissing(_) | Self::Unsupported(_))
    }
}

#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for StashError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Self::NotFound {
                resource_type: "database_row",
                key: "unknown".to_string(),
            },
            _ => Self::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for StashError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            StashError::CapabilityMissing(Capability::Key).error_code(),
            "CAPABILITY_MISSING"
        );
        assert_eq!(StashError::not_found("Person", 99).error_code(), "NOT_FOUND");
        assert_eq!(StashError::cache("down").error_code(), "CACHE_ERROR");
        assert_eq!(StashError::Database("gone".to_string()).error_code(), "DATABASE_ERROR");
        assert_eq!(StashError::internal("oops").error_code(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_retriable_errors() {
        assert!(StashError::cache("connection refused").is_retriable());
        assert!(StashError::Database("connection lost".to_string()).is_retriable());
        assert!(!StashError::CapabilityMissing(Capability::Key).is_retriable());
        assert!(!StashError::validation("bad").is_retriable());
    }

    #[test]
    fn test_contract_violations() {
        assert!(StashError::CapabilityMissing(Capability::IsEmpty).is_contract_violation());
        assert!(StashError::Unsupported("write".to_string()).is_contract_violation());
        assert!(!StashError::cache("down").is_contract_violation());
    }

    #[test]
    fn test_capability_missing_names_capability() {
        let err = StashError::CapabilityMissing(Capability::Key);
        assert!(err.to_string().contains("Key"));
    }

    #[test]
    fn test_from_serde_json() {
        let err: StashError = serde_json::from_str::<u32>("not json").unwrap_err().into();
        assert_eq!(err.error_code(), "SERIALIZATION_ERROR");
    }
}
