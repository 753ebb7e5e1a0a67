//! Error types for the pipeline crate.

use thiserror::Error;

/// Errors raised by the durable store.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// Record not found.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// A record with this key already exists.
    #[error("Record already exists: {0}")]
    AlreadyExists(String),

    /// Optimistic version check failed at commit.
    #[error("Transaction conflict on record: {0}")]
    Conflict(String),

    /// Commit attempted past the transaction deadline.
    #[error("Transaction deadline exceeded")]
    TransactionTimeout,

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Store backend failure.
    #[error("Store error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether retrying the whole operation later may succeed.
    ///
    /// Transient failures abort the in-flight transaction with nothing
    /// persisted; the affected records are picked up again by a later
    /// worker invocation.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::Conflict(_) | StoreError::TransactionTimeout | StoreError::Backend(_)
        )
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in pipeline stages.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PipelineError {
    /// Store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Backend failure.
    #[error(transparent)]
    Hal(#[from] alsvid_hal::HalError),

    /// Placement failure.
    #[error(transparent)]
    Place(#[from] alsvid_place::PlaceError),

    /// Program could not be parsed.
    #[error("Error converting QASM string to circuit: {0}")]
    Converting(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A lifecycle invariant was violated. This is a defect in the
    /// pipeline, not a property of the job; processing aborts.
    #[error("Invariant violated: {0}")]
    Invariant(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    /// Whether the underlying failure is transient.
    pub fn is_transient(&self) -> bool {
        matches!(self, PipelineError::Store(e) if e.is_transient())
    }
}

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(StoreError::Conflict("k".to_string()).is_transient());
        assert!(StoreError::TransactionTimeout.is_transient());
        assert!(!StoreError::NotFound("k".to_string()).is_transient());

        let err: PipelineError = StoreError::TransactionTimeout.into();
        assert!(err.is_transient());
        assert!(!PipelineError::Invariant("bad".to_string()).is_transient());
    }

    #[test]
    fn test_converting_message() {
        let err = PipelineError::Converting("unexpected token".to_string());
        assert!(err.to_string().contains("converting"));
    }
}
