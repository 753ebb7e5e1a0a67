//! Hardware abstraction layer for Alsvid.
//!
//! This crate defines the contract between the job pipeline and grid
//! devices: the async [`Backend`] trait, the [`GridTopology`] qubit grid
//! with its dense index assignment, calibration snapshots, [`Readout`]
//! counts, and the batch lifecycle types.
//!
//! Circuits cross this boundary in physical form: qubit ids are dense
//! topology indices and two-qubit gates act only on coupled pairs. The
//! placement layer (`alsvid-place`) produces such circuits; backends
//! only need to check, not to route.

pub mod backend;
pub mod calibration;
pub mod error;
pub mod job;
pub mod result;
pub mod topology;

pub use backend::Backend;
pub use calibration::{Calibration, CalibrationEntry};
pub use error::{HalError, HalResult};
pub use job::{BatchId, BatchStatus};
pub use result::{Counts, Readout};
pub use topology::{GridNode, GridTopology};
