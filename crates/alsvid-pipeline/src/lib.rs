//! Job pipeline for Alsvid.
//!
//! Externally submitted programs are persisted as [`JobRecord`]s in a
//! shared [`JobStore`] and move through three worker stages:
//!
//! ```text
//!   unverified ──verify──→ verified ──claim+submit──→ sent ──collect──→ done
//!        │                     │
//!        └── rejected ─────────┴── placement failed ──→ done
//! ```
//!
//! Every transition is transactional; multiple worker invocations may
//! run concurrently against one store and each job is verified once,
//! placed once and executed at most once. `done` is terminal.
//!
//! The stages are independent entry points ([`Verifier`], [`Processor`],
//! [`Collector`]) so deployments can run them on separate schedules.

pub mod collect;
pub mod config;
pub mod error;
pub mod process;
pub mod record;
pub mod store;
pub mod verify;

pub use collect::Collector;
pub use config::WorkerConfig;
pub use error::{PipelineError, PipelineResult, StoreError, StoreResult};
pub use process::Processor;
pub use record::{JobKey, JobRecord, RecordFilter, ResultRef};
pub use store::{JobStore, MemoryStore, StoreTransaction};
pub use verify::{Verifier, verify_record};
