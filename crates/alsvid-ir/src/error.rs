//! Error types for the IR crate.

use crate::qubit::{ClbitId, QubitId};
use thiserror::Error;

/// Errors that can occur in IR operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IrError {
    /// Qubit index outside the circuit.
    #[error("Qubit {qubit} out of range for circuit with {num_qubits} qubits")]
    QubitOutOfRange {
        /// The offending qubit.
        qubit: QubitId,
        /// Number of qubits in the circuit.
        num_qubits: u32,
    },

    /// Classical bit index outside the circuit.
    #[error("Classical bit {clbit} out of range for circuit with {num_clbits} bits")]
    ClbitOutOfRange {
        /// The offending bit.
        clbit: ClbitId,
        /// Number of classical bits in the circuit.
        num_clbits: u32,
    },

    /// Gate applied with the wrong number of qubits.
    #[error("Gate '{gate}' requires {expected} qubits, got {got}")]
    QubitCountMismatch {
        /// Name of the gate.
        gate: String,
        /// Expected number of qubits.
        expected: u32,
        /// Actual number provided.
        got: u32,
    },

    /// Same qubit used twice in one operation.
    #[error("Duplicate qubit {qubit} in '{gate}' operation")]
    DuplicateQubit {
        /// The duplicate qubit.
        qubit: QubitId,
        /// Name of the operation.
        gate: String,
    },

    /// Two measurements would end up with the same key.
    ///
    /// Measurement keys identify result streams after multiplexing;
    /// a collision would silently merge two jobs' readouts, so it is
    /// always an error.
    #[error("Duplicate measurement key '{0}'")]
    DuplicateMeasureKey(String),

    /// Measurement with mismatched qubit/clbit operand counts.
    #[error("Measurement '{key}': {qubits} qubits but {clbits} classical bits")]
    MeasureArityMismatch {
        /// Measurement key.
        key: String,
        /// Qubit operand count.
        qubits: usize,
        /// Classical bit operand count.
        clbits: usize,
    },
}

/// Result type for IR operations.
pub type IrResult<T> = Result<T, IrError>;
