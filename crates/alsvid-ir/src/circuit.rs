//! High-level circuit builder API.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::gate::StandardGate;
use crate::instruction::{Instruction, InstructionKind};
use crate::qubit::{ClbitId, QubitId};

/// A quantum circuit as an ordered instruction sequence.
///
/// Instructions are validated on append: operand indices must be in range,
/// multi-qubit operations may not repeat an operand, and measurement keys
/// must be unique within the circuit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circuit {
    /// Name of the circuit.
    name: String,
    /// Number of qubits addressable in the circuit.
    num_qubits: u32,
    /// Number of classical bits addressable in the circuit.
    num_clbits: u32,
    /// The instruction sequence.
    ops: Vec<Instruction>,
}

impl Circuit {
    /// Create a new empty circuit with no operands.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_size(name, 0, 0)
    }

    /// Create a circuit with a given number of qubits and classical bits.
    pub fn with_size(name: impl Into<String>, num_qubits: u32, num_clbits: u32) -> Self {
        Self {
            name: name.into(),
            num_qubits,
            num_clbits,
            ops: vec![],
        }
    }

    /// Append an instruction, validating its operands.
    pub fn append(&mut self, instruction: Instruction) -> IrResult<&mut Self> {
        if let Some(gate) = instruction.as_gate() {
            let got = instruction.qubits.len() as u32;
            if got != gate.num_qubits() {
                return Err(IrError::QubitCountMismatch {
                    gate: gate.name().to_string(),
                    expected: gate.num_qubits(),
                    got,
                });
            }
        }
        for (i, &q) in instruction.qubits.iter().enumerate() {
            if q.0 >= self.num_qubits {
                return Err(IrError::QubitOutOfRange {
                    qubit: q,
                    num_qubits: self.num_qubits,
                });
            }
            if instruction.qubits[..i].contains(&q) {
                return Err(IrError::DuplicateQubit {
                    qubit: q,
                    gate: instruction.name().to_string(),
                });
            }
        }
        for &c in &instruction.clbits {
            if c.0 >= self.num_clbits {
                return Err(IrError::ClbitOutOfRange {
                    clbit: c,
                    num_clbits: self.num_clbits,
                });
            }
        }
        if let Some(key) = instruction.measure_key() {
            if self.ops.iter().any(|op| op.measure_key() == Some(key)) {
                return Err(IrError::DuplicateMeasureKey(key.to_string()));
            }
        }
        self.ops.push(instruction);
        Ok(self)
    }

    // =========================================================================
    // Single-qubit gates
    // =========================================================================

    /// Apply Hadamard gate.
    pub fn h(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.append(Instruction::single_qubit_gate(StandardGate::H, qubit))
    }

    /// Apply Pauli-X gate.
    pub fn x(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.append(Instruction::single_qubit_gate(StandardGate::X, qubit))
    }

    /// Apply Pauli-Y gate.
    pub fn y(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.append(Instruction::single_qubit_gate(StandardGate::Y, qubit))
    }

    /// Apply Pauli-Z gate.
    pub fn z(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.append(Instruction::single_qubit_gate(StandardGate::Z, qubit))
    }

    /// Apply S gate.
    pub fn s(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.append(Instruction::single_qubit_gate(StandardGate::S, qubit))
    }

    /// Apply S-dagger gate.
    pub fn sdg(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.append(Instruction::single_qubit_gate(StandardGate::Sdg, qubit))
    }

    /// Apply T gate.
    pub fn t(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.append(Instruction::single_qubit_gate(StandardGate::T, qubit))
    }

    /// Apply T-dagger gate.
    pub fn tdg(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.append(Instruction::single_qubit_gate(StandardGate::Tdg, qubit))
    }

    /// Apply Rx rotation gate.
    pub fn rx(&mut self, theta: f64, qubit: QubitId) -> IrResult<&mut Self> {
        self.append(Instruction::single_qubit_gate(StandardGate::Rx(theta), qubit))
    }

    /// Apply Ry rotation gate.
    pub fn ry(&mut self, theta: f64, qubit: QubitId) -> IrResult<&mut Self> {
        self.append(Instruction::single_qubit_gate(StandardGate::Ry(theta), qubit))
    }

    /// Apply Rz rotation gate.
    pub fn rz(&mut self, theta: f64, qubit: QubitId) -> IrResult<&mut Self> {
        self.append(Instruction::single_qubit_gate(StandardGate::Rz(theta), qubit))
    }

    // =========================================================================
    // Two-qubit gates
    // =========================================================================

    /// Apply CNOT (CX) gate.
    pub fn cx(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.append(Instruction::two_qubit_gate(StandardGate::CX, control, target))
    }

    /// Apply CZ gate.
    pub fn cz(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.append(Instruction::two_qubit_gate(StandardGate::CZ, control, target))
    }

    /// Apply SWAP gate.
    pub fn swap(&mut self, q1: QubitId, q2: QubitId) -> IrResult<&mut Self> {
        self.append(Instruction::two_qubit_gate(StandardGate::Swap, q1, q2))
    }

    // =========================================================================
    // Other operations
    // =========================================================================

    /// Measure a qubit to a classical bit under a key.
    pub fn measure(
        &mut self,
        key: impl Into<String>,
        qubit: QubitId,
        clbit: ClbitId,
    ) -> IrResult<&mut Self> {
        self.append(Instruction::measure(key, qubit, clbit))
    }

    /// Measure all qubits under one key.
    pub fn measure_all(&mut self, key: impl Into<String>) -> IrResult<&mut Self> {
        if self.num_clbits < self.num_qubits {
            self.num_clbits = self.num_qubits;
        }
        let qubits: Vec<_> = (0..self.num_qubits).map(QubitId).collect();
        let clbits: Vec<_> = (0..self.num_qubits).map(ClbitId).collect();
        self.append(Instruction::measure_many(key, qubits, clbits)?)
    }

    /// Apply a barrier to specified qubits.
    pub fn barrier(&mut self, qubits: impl IntoIterator<Item = QubitId>) -> IrResult<&mut Self> {
        self.append(Instruction::barrier(qubits))
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get the circuit name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the number of qubits.
    pub fn num_qubits(&self) -> u32 {
        self.num_qubits
    }

    /// Get the number of classical bits.
    pub fn num_clbits(&self) -> u32 {
        self.num_clbits
    }

    /// Get the instruction sequence.
    pub fn ops(&self) -> &[Instruction] {
        &self.ops
    }

    /// Get the number of instructions.
    pub fn num_ops(&self) -> usize {
        self.ops.len()
    }

    /// Qubits actually referenced by at least one instruction, in order.
    pub fn used_qubits(&self) -> Vec<QubitId> {
        let set: BTreeSet<QubitId> = self
            .ops
            .iter()
            .flat_map(|op| op.qubits.iter().copied())
            .collect();
        set.into_iter().collect()
    }

    /// All measurement keys, in instruction order.
    pub fn measurement_keys(&self) -> Vec<String> {
        self.ops
            .iter()
            .filter_map(|op| op.measure_key().map(str::to_string))
            .collect()
    }

    /// Count of operations acting on more than one qubit.
    pub fn multi_qubit_ops(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| op.is_gate() && op.qubits.len() > 1)
            .count()
    }

    // =========================================================================
    // Rewriting
    // =========================================================================

    /// Rewrite measurement keys through a mapping.
    ///
    /// Keys absent from the map are kept. Fails if the rewrite would
    /// produce two measurements with the same key.
    pub fn with_key_mapping(&self, map: &FxHashMap<String, String>) -> IrResult<Circuit> {
        let mut out = Circuit::with_size(self.name.clone(), self.num_qubits, self.num_clbits);
        for op in &self.ops {
            let mut op = op.clone();
            if let InstructionKind::Measure { key } = &mut op.kind {
                if let Some(new) = map.get(key) {
                    *key = new.clone();
                }
            }
            out.append(op)?;
        }
        Ok(out)
    }

    /// Relabel qubits through a mapping into a circuit of a new width.
    ///
    /// Every referenced qubit must have an entry in the map. Used when
    /// placing a logical circuit onto physical device indices.
    pub fn relabeled(
        &self,
        map: &FxHashMap<QubitId, QubitId>,
        new_num_qubits: u32,
    ) -> IrResult<Circuit> {
        let mut out = Circuit::with_size(self.name.clone(), new_num_qubits, self.num_clbits);
        for op in &self.ops {
            let mut op = op.clone();
            for q in &mut op.qubits {
                let mapped = map.get(q).copied().ok_or(IrError::QubitOutOfRange {
                    qubit: *q,
                    num_qubits: new_num_qubits,
                })?;
                *q = mapped;
            }
            out.append(op)?;
        }
        Ok(out)
    }

    /// Append all instructions of another circuit of the same width.
    ///
    /// The caller must have namespaced measurement keys beforehand; a key
    /// collision fails the merge.
    pub fn merge(&mut self, other: &Circuit) -> IrResult<&mut Self> {
        if other.num_clbits > self.num_clbits {
            self.num_clbits = other.num_clbits;
        }
        for op in &other.ops {
            self.append(op.clone())?;
        }
        Ok(self)
    }

    // =========================================================================
    // Pre-built circuits
    // =========================================================================

    /// Create a Bell state circuit with measurement.
    pub fn bell() -> IrResult<Self> {
        let mut circuit = Self::with_size("bell", 2, 2);
        circuit.h(QubitId(0))?.cx(QubitId(0), QubitId(1))?;
        circuit.measure_all("m")?;
        Ok(circuit)
    }

    /// Create a GHZ state circuit with measurement.
    pub fn ghz(n: u32) -> IrResult<Self> {
        if n == 0 {
            return Ok(Self::new("ghz_0"));
        }
        let mut circuit = Self::with_size("ghz", n, n);
        circuit.h(QubitId(0))?;
        for i in 0..n - 1 {
            circuit.cx(QubitId(i), QubitId(i + 1))?;
        }
        circuit.measure_all("m")?;
        Ok(circuit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_circuit() {
        let circuit = Circuit::new("test");
        assert_eq!(circuit.name(), "test");
        assert_eq!(circuit.num_qubits(), 0);
        assert_eq!(circuit.num_ops(), 0);
    }

    #[test]
    fn test_bell_state() {
        let circuit = Circuit::bell().unwrap();
        assert_eq!(circuit.num_qubits(), 2);
        assert_eq!(circuit.num_ops(), 3);
        assert_eq!(circuit.multi_qubit_ops(), 1);
    }

    #[test]
    fn test_out_of_range() {
        let mut circuit = Circuit::with_size("test", 1, 0);
        let err = circuit.x(QubitId(5));
        assert!(matches!(err, Err(IrError::QubitOutOfRange { .. })));
    }

    #[test]
    fn test_duplicate_qubit() {
        let mut circuit = Circuit::with_size("test", 2, 0);
        let err = circuit.cx(QubitId(0), QubitId(0));
        assert!(matches!(err, Err(IrError::DuplicateQubit { .. })));
    }

    #[test]
    fn test_duplicate_measure_key() {
        let mut circuit = Circuit::with_size("test", 2, 2);
        circuit.measure("m", QubitId(0), ClbitId(0)).unwrap();
        let err = circuit.measure("m", QubitId(1), ClbitId(1));
        assert!(matches!(err, Err(IrError::DuplicateMeasureKey(_))));
    }

    #[test]
    fn test_used_qubits() {
        let mut circuit = Circuit::with_size("test", 5, 0);
        circuit.h(QubitId(3)).unwrap();
        circuit.cx(QubitId(1), QubitId(3)).unwrap();
        assert_eq!(circuit.used_qubits(), vec![QubitId(1), QubitId(3)]);
    }

    #[test]
    fn test_key_mapping() {
        let circuit = Circuit::bell().unwrap();
        let mut map = FxHashMap::default();
        map.insert("m".to_string(), "0.m".to_string());
        let mapped = circuit.with_key_mapping(&map).unwrap();
        assert_eq!(mapped.measurement_keys(), vec!["0.m".to_string()]);
    }

    #[test]
    fn test_relabeled() {
        let mut circuit = Circuit::with_size("test", 2, 0);
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        let mut map = FxHashMap::default();
        map.insert(QubitId(0), QubitId(4));
        map.insert(QubitId(1), QubitId(5));
        let placed = circuit.relabeled(&map, 9).unwrap();
        assert_eq!(placed.ops()[0].qubits, vec![QubitId(4), QubitId(5)]);
        assert_eq!(placed.num_qubits(), 9);
    }

    #[test]
    fn test_merge_key_collision() {
        let mut a = Circuit::bell().unwrap();
        let b = Circuit::bell().unwrap();
        let err = a.merge(&b);
        assert!(matches!(err, Err(IrError::DuplicateMeasureKey(_))));
    }
}
