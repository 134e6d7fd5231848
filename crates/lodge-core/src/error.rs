//! Error types for the Lodge client core.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the entire Lodge client core.
///
/// This provides typed, structured error variants with automatic conversion
/// from common error types via the `From` trait.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum LodgeError {
    /// Entity not found error with type information
    #[error("Entity not found: {entity} '{id}'")]
    NotFound { entity: String, id: String },

    /// Network error (request failed to reach the backend, or the backend
    /// answered with a non-auth server error)
    #[error("Network error: {0}")]
    Network(String),

    /// A bounded operation ran past its deadline. Treated like a network
    /// error for fallback purposes, distinguished only in logs.
    #[error("Timed out: {operation}")]
    Timeout { operation: String },

    /// Authentication error (bad credentials, rate limiting, revoked token).
    /// The message is user-facing and must stay short and actionable.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// A fetched record's id does not match the session subject.
    /// Fatal to the session: the caller must force re-authentication.
    #[error("Identity mismatch: expected '{expected}', got '{actual}'")]
    IdentityMismatch { expected: String, actual: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LodgeError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a NotFound error
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a Network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Creates a Timeout error
    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    /// Creates an Auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    /// Creates an IdentityMismatch error
    pub fn identity_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::IdentityMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is an Auth error
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    /// Check if this is an IdentityMismatch error
    pub fn is_identity_mismatch(&self) -> bool {
        matches!(self, Self::IdentityMismatch { .. })
    }

    /// Check if this error is transient: a network failure or a timeout.
    ///
    /// Transient errors are recovered locally by falling back to cached
    /// state where one exists; they are never fatal to the session.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout { .. })
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for LodgeError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for LodgeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for LodgeError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for LodgeError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// Conversion from String (for error messages)
impl From<String> for LodgeError {
    fn from(err: String) -> Self {
        Self::Internal(err)
    }
}

/// A type alias for `Result<T, LodgeError>`.
pub type Result<T> = std::result::Result<T, LodgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_predicate() {
        let err = LodgeError::not_found("profile", "abc");
        assert!(err.is_not_found());
        assert!(!err.is_transient());
    }

    #[test]
    fn test_transient_covers_network_and_timeout() {
        assert!(LodgeError::network("connection refused").is_transient());
        assert!(LodgeError::timeout("profile fetch").is_transient());
        assert!(!LodgeError::auth("invalid credentials").is_transient());
    }

    #[test]
    fn test_identity_mismatch_message() {
        let err = LodgeError::identity_mismatch("a", "b");
        assert_eq!(err.to_string(), "Identity mismatch: expected 'a', got 'b'");
    }
}
