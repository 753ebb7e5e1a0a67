//! Standard gate definitions.

use serde::{Deserialize, Serialize};

/// Built-in gates understood by the pipeline.
///
/// Rotation angles are concrete values; the interchange format the pipeline
/// accepts carries only literal parameters, so no symbolic expression type
/// is needed here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StandardGate {
    /// Identity gate.
    I,
    /// Pauli-X gate.
    X,
    /// Pauli-Y gate.
    Y,
    /// Pauli-Z gate.
    Z,
    /// Hadamard gate.
    H,
    /// S gate (sqrt(Z)).
    S,
    /// S-dagger gate.
    Sdg,
    /// T gate.
    T,
    /// T-dagger gate.
    Tdg,
    /// X-rotation by an angle in radians.
    Rx(f64),
    /// Y-rotation by an angle in radians.
    Ry(f64),
    /// Z-rotation by an angle in radians.
    Rz(f64),
    /// Controlled-NOT.
    CX,
    /// Controlled-Z.
    CZ,
    /// SWAP gate.
    Swap,
}

impl StandardGate {
    /// Get the lowercase gate name as it appears in the interchange format.
    pub fn name(&self) -> &'static str {
        match self {
            StandardGate::I => "id",
            StandardGate::X => "x",
            StandardGate::Y => "y",
            StandardGate::Z => "z",
            StandardGate::H => "h",
            StandardGate::S => "s",
            StandardGate::Sdg => "sdg",
            StandardGate::T => "t",
            StandardGate::Tdg => "tdg",
            StandardGate::Rx(_) => "rx",
            StandardGate::Ry(_) => "ry",
            StandardGate::Rz(_) => "rz",
            StandardGate::CX => "cx",
            StandardGate::CZ => "cz",
            StandardGate::Swap => "swap",
        }
    }

    /// Number of qubits this gate acts on.
    pub fn num_qubits(&self) -> u32 {
        match self {
            StandardGate::CX | StandardGate::CZ | StandardGate::Swap => 2,
            _ => 1,
        }
    }

    /// Rotation angle, if this gate is parameterized.
    pub fn angle(&self) -> Option<f64> {
        match self {
            StandardGate::Rx(t) | StandardGate::Ry(t) | StandardGate::Rz(t) => Some(*t),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_name() {
        assert_eq!(StandardGate::H.name(), "h");
        assert_eq!(StandardGate::CX.name(), "cx");
        assert_eq!(StandardGate::Rx(1.0).name(), "rx");
    }

    #[test]
    fn test_gate_arity() {
        assert_eq!(StandardGate::H.num_qubits(), 1);
        assert_eq!(StandardGate::CZ.num_qubits(), 2);
        assert_eq!(StandardGate::Swap.num_qubits(), 2);
    }

    #[test]
    fn test_gate_is_copied_from_shared_ref() {
        let gates = vec![StandardGate::CX, StandardGate::Rx(0.5)];
        // Gates are read out of instructions by value behind shared
        // references; a plain dereference must suffice.
        let first: StandardGate = *gates.first().unwrap();
        assert_eq!(first, StandardGate::CX);
    }

    #[test]
    fn test_gate_angle() {
        assert_eq!(StandardGate::Rz(0.5).angle(), Some(0.5));
        assert_eq!(StandardGate::X.angle(), None);
    }
}
