//! Statevector simulator backend for Alsvid.
//!
//! Implements the [`Backend`](alsvid_hal::Backend) trait with an
//! in-process statevector simulator. Useful for the pipeline's tests
//! and for local end-to-end runs without device access.
//!
//! The simulator holds `2^n` complex amplitudes per circuit, so memory
//! doubles with every qubit; the default cap is 20 qubits. Batches
//! execute eagerly at submission and are immediately terminal, which
//! exercises the same poll-then-fetch client code a remote device
//! needs.
//!
//! # Example
//!
//! ```ignore
//! use alsvid_adapter_sim::SimBackend;
//! use alsvid_hal::Backend;
//! use alsvid_ir::Circuit;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let backend = SimBackend::square(2);
//!
//!     // Run a Bell state: expect ~50% "00" and ~50% "11"
//!     let readout = backend.run(&Circuit::bell()?, 1000).await?;
//!     println!("counts: {:?}", readout.key("m"));
//!
//!     Ok(())
//! }
//! ```

pub mod simulator;
pub mod statevector;

pub use simulator::SimBackend;
pub use statevector::Statevector;
