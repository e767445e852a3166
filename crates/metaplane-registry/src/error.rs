//! Error taxonomy for the topology registry.

use thiserror::Error;

/// Result type alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors surfaced by registry operations.
///
/// All variants carry a non-empty, caller-facing message. `Conflict` is
/// produced only after the optimistic update loop exhausts its retry
/// budget; the other variants are client errors and are never retried.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl RegistryError {
    /// Standard message for an unknown universe identifier.
    pub fn unknown_universe(universe_id: &str) -> Self {
        RegistryError::NotFound(format!("universe {universe_id} not found"))
    }
}
