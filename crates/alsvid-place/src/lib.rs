//! Grid placement, swap routing and circuit multiplexing for Alsvid.
//!
//! Maps abstract circuits onto a device's [`GridTopology`](alsvid_hal::GridTopology):
//! a deterministic line search along a fixed traversal curve picks the
//! physical qubits, a greedy router inserts swaps for non-coupled pairs,
//! and the [`Multiplexer`] packs independent circuits onto one device,
//! splitting into further batches when the grid fills up.
//!
//! ```rust
//! use alsvid_hal::GridTopology;
//! use alsvid_ir::Circuit;
//! use alsvid_place::Placer;
//! use rustc_hash::FxHashSet;
//!
//! let topology = GridTopology::square(3);
//! let placer = Placer::serpentine(&topology).unwrap();
//! let placement = placer
//!     .place(&Circuit::bell().unwrap(), &FxHashSet::default(), None)
//!     .unwrap();
//! assert_eq!(placement.used.len(), 2);
//! ```

pub mod curve;
pub mod error;
pub mod exclusion;
pub mod layout;
pub mod line;
pub mod mux;
pub mod place;
pub mod route;

pub use curve::TraversalCurve;
pub use error::{PlaceError, PlaceResult};
pub use exclusion::faulty_nodes;
pub use layout::Layout;
pub use line::{Line, line_search};
pub use mux::{MuxBatch, Multiplexer};
pub use place::{Placement, Placer, with_index_prefix};
