//! Unified error type definition

use serde::Serialize;
use thiserror::Error;

// Re-export library error type
pub use caddy_orchestrator_admin::AdminError;

/// Core layer error type
#[derive(Error, Debug, Serialize)]
#[serde(tag = "code", content = "details")]
pub enum CoreError {
    /// Malformed mutation input, rejected before touching the store
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Storage layer error
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Route not found
    #[error("Route not found: {0}")]
    RouteNotFound(String),

    /// Instance not found
    #[error("Instance not found: {0}")]
    InstanceNotFound(String),

    /// An instance with this ID is already registered
    #[error("Instance already exists: {0}")]
    InstanceExists(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Admin API error (converted from the client library)
    #[error("{0}")]
    Admin(#[from] AdminError),
}

impl CoreError {
    /// Whether this is expected behavior (user input, missing resource, remote
    /// refusal). Used for log classification.
    ///
    /// Use level `warn` when this returns `true` and `error` otherwise.
    /// **Update this method when adding variants.**
    #[must_use]
    pub fn is_expected(&self) -> bool {
        match self {
            Self::ValidationError(_)
            | Self::RouteNotFound(_)
            | Self::InstanceNotFound(_)
            | Self::InstanceExists(_) => true,
            Self::Admin(e) => e.is_expected(),
            Self::StorageError(_) | Self::SerializationError(_) => false,
        }
    }
}

/// Core layer Result type alias
pub type CoreResult<T> = std::result::Result<T, CoreError>;
