//! Backend trait.
//!
//! The [`Backend`] trait defines the lifecycle for interacting with a
//! grid device:
//!
//! ```text
//!   topology() ──→ calibration() ──→ submit_batch() ──→ status() ──→ results()
//!    (sync, &ref)     (async)           (async)          (async)      (async)
//! ```
//!
//! ## Design principles
//!
//! - **Async-native**: all I/O methods are async.
//! - **Thread-safe**: `Send + Sync` bound enables shared ownership.
//! - **Infallible introspection**: `topology()` is synchronous and
//!   infallible — a backend that cannot report its qubit grid without
//!   I/O is not correctly initialized.

use async_trait::async_trait;

use alsvid_ir::Circuit;

use crate::calibration::Calibration;
use crate::error::HalResult;
use crate::job::{BatchId, BatchStatus};
use crate::result::Readout;
use crate::topology::GridTopology;

/// Trait for grid-device backends.
///
/// # Contract
///
/// - `topology()` MUST be synchronous and infallible; the grid MUST be
///   cached at construction time.
/// - Circuits passed to `run` and `submit_batch` are already physical:
///   every qubit id is a dense topology index and every two-qubit gate
///   acts on a coupled pair. Backends MAY reject circuits that violate
///   this.
/// - `submit_batch()` accepts the batch; execution is asynchronous and
///   observed through `status()`.
/// - `results()` MUST only be called when `status()` is `Success`, and
///   MUST return one readout per submitted circuit, in order.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Get the name of this backend.
    fn name(&self) -> &str;

    /// Get the qubit grid of this backend.
    fn topology(&self) -> &GridTopology;

    /// Fetch the current calibration snapshot.
    async fn calibration(&self) -> HalResult<Calibration>;

    /// Execute one circuit synchronously and return its readout.
    async fn run(&self, circuit: &Circuit, repetitions: u32) -> HalResult<Readout>;

    /// Submit a batch of circuits for asynchronous execution.
    async fn submit_batch(&self, circuits: &[Circuit], repetitions: u32) -> HalResult<BatchId>;

    /// Get the status of a submitted batch.
    async fn status(&self, batch: &BatchId) -> HalResult<BatchStatus>;

    /// Get the readouts of a successful batch, one per circuit in
    /// submission order.
    async fn results(&self, batch: &BatchId) -> HalResult<Vec<Readout>>;

    /// Wait for a batch to finish and return its readouts.
    ///
    /// Default implementation polls every 500ms for up to 5 minutes.
    async fn wait(&self, batch: &BatchId) -> HalResult<Vec<Readout>> {
        use crate::error::HalError;
        use tokio::time::sleep;

        let poll_interval = std::time::Duration::from_millis(500);
        let max_polls = 600; // 5 minutes max

        for _ in 0..max_polls {
            match self.status(batch).await? {
                BatchStatus::Success => return self.results(batch).await,
                BatchStatus::Failure(msg) => return Err(HalError::BatchFailed(msg)),
                BatchStatus::Pending => sleep(poll_interval).await,
            }
        }

        Err(HalError::BatchNotFinished(batch.0.clone()))
    }
}
