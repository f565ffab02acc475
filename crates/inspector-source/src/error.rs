//! Error types for colony registry access.

use thiserror::Error;

use crate::source::ColonyId;

/// Result type alias for source operations.
pub type SourceResult<T> = Result<T, SourceError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The registry could not be reached, failed, or timed out.
    #[error("colony source unavailable: {0}")]
    Unavailable(String),

    /// The colony id is outside the registry's range.
    #[error("colony {0} not found")]
    NotFound(ColonyId),

    /// The registry answered with something we can't interpret.
    #[error("protocol error: {0}")]
    Protocol(String),
}
