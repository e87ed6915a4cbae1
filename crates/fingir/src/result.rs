//! Result and error types for Fingir.

use thiserror::Error;

/// Result type for Fingir operations
pub type FingirResult<T> = Result<T, FingirError>;

/// Errors that can occur in Fingir
#[derive(Debug, Error)]
pub enum FingirError {
    /// Setup value slot initialized twice
    #[error("Setup for {member} already initialized, cannot initialize twice")]
    AlreadyInitialized {
        /// Member whose setup was re-initialized
        member: String,
    },

    /// Member accessed without a matching setup (opt-in via `throw_when_not_setup`)
    #[error("{member} accessed without prior setup (arguments: {arguments})")]
    NotSetup {
        /// Qualified member name
        member: String,
        /// Rendered argument list
        arguments: String,
    },

    /// Verification wait timed out
    #[error("Verification timed out after {ms}ms")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Verification wait cancelled by an external token with no explicit duration
    #[error("Verification wait was cancelled")]
    Cancelled,

    /// Error produced by a user-configured raising setup
    #[error("Raised by setup: {message}")]
    Raised {
        /// Message supplied by the setup
        message: String,
    },

    /// JSON conversion error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FingirError {
    /// Create a raised-by-setup error
    #[must_use]
    pub fn raised(message: impl Into<String>) -> Self {
        Self::Raised {
            message: message.into(),
        }
    }
}
