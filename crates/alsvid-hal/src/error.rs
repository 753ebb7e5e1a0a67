//! Error types for the HAL crate.

use thiserror::Error;

/// Errors that can occur in HAL operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HalError {
    /// Backend is not available.
    #[error("Backend not available: {0}")]
    BackendUnavailable(String),

    /// Batch submission failed.
    #[error("Batch submission failed: {0}")]
    SubmissionFailed(String),

    /// Batch execution failed.
    #[error("Batch failed: {0}")]
    BatchFailed(String),

    /// Batch not found.
    #[error("Batch not found: {0}")]
    BatchNotFound(String),

    /// Results requested before the batch reached a terminal state.
    #[error("Batch not finished: {0}")]
    BatchNotFinished(String),

    /// Invalid circuit.
    #[error("Invalid circuit: {0}")]
    InvalidCircuit(String),

    /// Circuit exceeds backend capabilities.
    #[error("Circuit exceeds backend capabilities: {0}")]
    CircuitTooLarge(String),

    /// Invalid number of repetitions.
    #[error("Invalid repetitions: {0}")]
    InvalidRepetitions(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Unsupported feature.
    #[error("Unsupported feature: {0}")]
    Unsupported(String),

    /// Generic backend error.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result type for HAL operations.
pub type HalResult<T> = Result<T, HalError>;
