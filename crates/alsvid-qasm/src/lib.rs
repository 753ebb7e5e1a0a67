//! `OpenQASM` 2.0 parser and emitter for Alsvid.
//!
//! Job programs arrive as `OPENQASM 2.0` text; this crate lowers them to
//! [`alsvid_ir::Circuit`] values and serializes circuits back out.
//!
//! # Supported Features
//!
//! | Feature | Example |
//! |---------|---------|
//! | Version declaration | `OPENQASM 2.0;` |
//! | Register declarations | `qreg q[5];`, `creg c[5];` |
//! | Standard gates | `h q[0];`, `cx q[0], q[1];` |
//! | Parameterized gates | `rx(pi/4) q[0];` |
//! | Measurements | `measure q -> c;`, `measure q[0] -> c[1];` |
//! | Barriers | `barrier q;` |
//! | Broadcast | `h q;` applies to every qubit of `q` |
//! | Comments | `// comment`, `/* block */` |
//!
//! # Example
//!
//! ```rust
//! use alsvid_qasm::{emit, parse};
//!
//! let qasm = r#"
//!     OPENQASM 2.0;
//!     include "qelib1.inc";
//!     qreg q[2];
//!     creg c[2];
//!     h q[0];
//!     cx q[0], q[1];
//!     measure q -> c;
//! "#;
//!
//! let circuit = parse(qasm).unwrap();
//! assert_eq!(circuit.num_qubits(), 2);
//!
//! let emitted = emit(&circuit);
//! assert!(emitted.contains("cx q[0], q[1];"));
//! ```
//!
//! # Supported Gates
//!
//! Single-qubit: `id`, `x`, `y`, `z`, `h`, `s`, `sdg`, `t`, `tdg`
//!
//! Parameterized: `rx(θ)`, `ry(θ)`, `rz(θ)`
//!
//! Two-qubit: `cx`, `cz`, `swap`

mod emitter;
mod error;
mod lexer;
mod parser;

pub use emitter::emit;
pub use error::{ParseError, ParseResult};
pub use parser::parse;
