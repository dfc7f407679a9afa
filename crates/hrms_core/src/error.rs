//! Error types for hrms_core operations.

use thiserror::Error;

/// Core error type for hrms_core operations.
///
/// Errors are `Clone` because a single failed load is handed to every
/// caller that joined the same in-flight fetch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HrmsError {
    /// The record service could not be reached, or the caller's session
    /// context is not ready yet.
    #[error("service not available: {0}")]
    ServiceUnavailable(String),

    /// Mutation arguments were malformed or rejected by validation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The service answered a boolean mutation with `false`.
    #[error("{operation} was rejected by the record service")]
    Rejected {
        /// Name of the rejected operation
        operation: String,
    },

    /// The caller lacks the administrator capability.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// A cached value was read back as a different type than it was stored with.
    #[error("cache entry {fingerprint} holds a value of a different type")]
    CacheTypeMismatch {
        /// Fingerprint of the offending entry
        fingerprint: String,
    },

    /// Configuration error (loading, parsing, invalid values).
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(String),

    /// Serialization or deserialization of a document failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for HrmsError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl HrmsError {
    /// Returns true for failures that may succeed on a plain retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ServiceUnavailable(_))
    }

    /// Returns a user-friendly recovery suggestion for the error, if available.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            Self::ServiceUnavailable(_) => {
                Some("Check your connection and sign in again if the problem persists.")
            }
            Self::AccessDenied(_) => Some("Ask an administrator to grant you the admin role."),
            Self::Rejected { .. } => {
                Some("The record may have changed or been removed. Reload and try again.")
            }
            Self::Config(_) => Some("Fix hrms.toml or remove it to fall back to defaults."),
            Self::CacheTypeMismatch { .. } => {
                Some("Two queries share a fingerprint. Sign out to clear the cache.")
            }
            _ => None,
        }
    }
}

/// Convenience Result type for hrms_core operations.
pub type Result<T> = std::result::Result<T, HrmsError>;
