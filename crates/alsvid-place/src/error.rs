//! Error types for placement and routing.

use thiserror::Error;

/// Errors that can occur during placement.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PlaceError {
    /// The line search could not produce a contiguous sequence of the
    /// required length.
    #[error("No line placement found for {needed} qubits")]
    NoPlacement { needed: usize },

    /// The circuit contains an operation the placer cannot map.
    #[error("Unsupported operation: {0}")]
    UnsupportedOp(String),

    /// Two measurements would end up with the same key. This is an
    /// invariant violation in the caller, not a recoverable condition.
    #[error("Duplicate measurement key: {0}")]
    DuplicateKey(String),

    /// No routing path exists between two physical qubits.
    #[error("No routing path between physical qubits {from} and {to}")]
    RoutingFailed { from: u32, to: u32 },

    /// The placed circuit failed final validation. Indicates a defect in
    /// the placement algorithm itself.
    #[error("Placed circuit failed validation: {0}")]
    Validation(String),

    /// Error from circuit construction.
    #[error("Circuit error: {0}")]
    Ir(alsvid_ir::IrError),
}

impl From<alsvid_ir::IrError> for PlaceError {
    /// Key collisions keep their own variant so callers can distinguish
    /// an invariant violation from an ordinary construction error.
    fn from(err: alsvid_ir::IrError) -> Self {
        match err {
            alsvid_ir::IrError::DuplicateMeasureKey(key) => PlaceError::DuplicateKey(key),
            other => PlaceError::Ir(other),
        }
    }
}

/// Result type for placement operations.
pub type PlaceResult<T> = Result<T, PlaceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_key_keeps_own_variant() {
        let err: PlaceError =
            alsvid_ir::IrError::DuplicateMeasureKey("m.q1".to_string()).into();
        assert!(matches!(err, PlaceError::DuplicateKey(_)));

        let err: PlaceError = alsvid_ir::IrError::QubitOutOfRange {
            qubit: alsvid_ir::QubitId(9),
            num_qubits: 2,
        }
        .into();
        assert!(matches!(err, PlaceError::Ir(_)));
    }
}
