//! QASM 2.0 emitter for serializing circuits.

use alsvid_ir::{Circuit, Instruction, InstructionKind};

/// Emit a circuit as QASM 2.0 source code.
///
/// The circuit's qubits land in a single `qreg q[n]` and its classical
/// bits in a single `creg c[m]`. Measurement keys are not representable
/// in QASM 2.0 and are dropped; a round trip through [`crate::parse`]
/// re-keys measurements from the creg.
pub fn emit(circuit: &Circuit) -> String {
    let mut emitter = Emitter::new();
    emitter.emit_circuit(circuit)
}

/// QASM 2.0 emitter.
struct Emitter {
    output: String,
}

impl Emitter {
    fn new() -> Self {
        Self {
            output: String::new(),
        }
    }

    fn emit_circuit(&mut self, circuit: &Circuit) -> String {
        self.writeln("OPENQASM 2.0;");
        self.writeln("include \"qelib1.inc\";");
        self.writeln("");

        let num_qubits = circuit.num_qubits();
        if num_qubits > 0 {
            self.writeln(&format!("qreg q[{num_qubits}];"));
        }
        let num_clbits = circuit.num_clbits();
        if num_clbits > 0 {
            self.writeln(&format!("creg c[{num_clbits}];"));
        }
        if num_qubits > 0 || num_clbits > 0 {
            self.writeln("");
        }

        for instruction in circuit.ops() {
            self.emit_instruction(instruction);
        }

        std::mem::take(&mut self.output)
    }

    fn emit_instruction(&mut self, instruction: &Instruction) {
        match &instruction.kind {
            InstructionKind::Gate(gate) => {
                let name = gate.name();
                let qubits = self.emit_qubits(instruction);
                if let Some(theta) = gate.angle() {
                    self.writeln(&format!("{name}({theta}) {qubits};"));
                } else {
                    self.writeln(&format!("{name} {qubits};"));
                }
            }

            InstructionKind::Measure { .. } => {
                for (q, c) in instruction.qubits.iter().zip(instruction.clbits.iter()) {
                    self.writeln(&format!("measure q[{}] -> c[{}];", q.0, c.0));
                }
            }

            InstructionKind::Barrier => {
                let qubits = self.emit_qubits(instruction);
                if qubits.is_empty() {
                    self.writeln("barrier;");
                } else {
                    self.writeln(&format!("barrier {qubits};"));
                }
            }
        }
    }

    fn emit_qubits(&self, instruction: &Instruction) -> String {
        instruction
            .qubits
            .iter()
            .map(|q| format!("q[{}]", q.0))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn writeln(&mut self, line: &str) {
        self.output.push_str(line);
        self.output.push('\n');
    }
}
