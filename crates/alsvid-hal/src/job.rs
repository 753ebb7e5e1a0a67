//! Batch lifecycle types.
//!
//! The batch state machine:
//!
//! ```text
//!   submit_batch() ──→ Pending ──→ Success
//!                         │
//!                         └──→ Failure(reason)
//! ```
//!
//! **Invariants:**
//! - `submit_batch()` MUST return `Pending` on first poll at the latest.
//! - Terminal states (`Success`, `Failure`) are permanent.
//! - `results()` is only valid when status is `Success`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a submitted batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchId(pub String);

impl BatchId {
    /// Create a batch ID from an existing string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random batch ID.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for BatchId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for BatchId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Status of a submitted batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchStatus {
    /// Batch is queued or running.
    Pending,
    /// Batch completed and results are available.
    Success,
    /// Batch failed with an error message.
    Failure(String),
}

impl BatchStatus {
    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, BatchStatus::Pending)
    }

    /// Check if the batch completed successfully.
    pub fn is_success(&self) -> bool {
        matches!(self, BatchStatus::Success)
    }
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchStatus::Pending => write!(f, "Pending"),
            BatchStatus::Success => write!(f, "Success"),
            BatchStatus::Failure(msg) => write!(f, "Failure: {msg}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_terminal() {
        assert!(!BatchStatus::Pending.is_terminal());
        assert!(BatchStatus::Success.is_terminal());
        assert!(BatchStatus::Failure("error".into()).is_terminal());
    }

    #[test]
    fn test_generated_ids_unique() {
        assert_ne!(BatchId::generate(), BatchId::generate());
    }
}
