//! Error types for the access system.

use thiserror::Error;

/// The main error type for access system operations.
///
/// A denied permission check is a normal `false` result, never an error;
/// these variants cover infrastructure and validation failures only.
#[derive(Error, Debug)]
pub enum Error {
    /// A fetch from the identity or rule-storage collaborator failed.
    #[error("Fetch from {source_name} failed: {reason}")]
    Fetch {
        /// Which collaborator failed (e.g. "identity", "rule storage").
        source_name: String,
        /// Human-readable failure description.
        reason: String,
    },

    /// A fetch from a collaborator did not complete within the configured timeout.
    #[error("Fetch from {0} timed out")]
    FetchTimeout(String),

    /// A permission rule violates the target invariant (exactly one of
    /// user target / role-tag target must be set).
    #[error("Invalid permission rule '{id}': {reason}")]
    InvalidRule {
        /// Identifier of the offending rule record.
        id: String,
        /// Why the record was rejected.
        reason: String,
    },

    /// A role string from the identity collaborator is not a recognized role.
    #[error("Unrecognized role '{0}'")]
    InvalidRole(String),

    /// A role-tag failed validation.
    #[error("Invalid role tag: {0}")]
    InvalidRoleTag(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Serialization error.
    #[cfg(feature = "persistence")]
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Build a fetch error for the identity collaborator.
    pub fn identity_fetch(reason: impl Into<String>) -> Self {
        Error::Fetch {
            source_name: "identity".to_string(),
            reason: reason.into(),
        }
    }

    /// Build a fetch error for the rule-storage collaborator.
    pub fn rule_fetch(reason: impl Into<String>) -> Self {
        Error::Fetch {
            source_name: "rule storage".to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for access system operations.
pub type Result<T> = std::result::Result<T, Error>;
