//! Result collector stage.
//!
//! Polls submitted records, checks their batch status on the backend
//! and writes finished results back into the store. Only success is
//! terminal here: pending batches, backend-reported failures and status
//! poll errors all leave the record `sent=true, done=false` for a later
//! invocation, so a batch that recovers or is re-run externally can
//! still complete the job.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use alsvid_hal::{Backend, BatchStatus};

use crate::config::WorkerConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::record::{JobRecord, RecordFilter, ResultRef};
use crate::store::JobStore;

/// Collection worker stage.
pub struct Collector {
    store: Arc<dyn JobStore>,
    backend: Arc<dyn Backend>,
    config: WorkerConfig,
}

impl Collector {
    /// Create a collector over a store and a backend.
    pub fn new(store: Arc<dyn JobStore>, backend: Arc<dyn Backend>, config: WorkerConfig) -> Self {
        Self {
            store,
            backend,
            config,
        }
    }

    /// Collect results for all in-flight records.
    ///
    /// Returns the number of records finalized.
    #[instrument(skip(self))]
    pub async fn run(&self) -> PipelineResult<usize> {
        let keys = self.store.query_keys(&RecordFilter::in_flight()).await?;
        let mut finalized = 0;
        for key in keys {
            let Some(record) = self.store.get(&key).await? else {
                continue;
            };
            let Some(result_ref) = record.result_ref.clone() else {
                // Solo jobs finish inline and never reach here; a sent
                // record without a locator is mid-submission.
                debug!(%key, "in-flight record has no result ref yet");
                continue;
            };
            if self.collect_one(record, &result_ref).await? {
                finalized += 1;
            }
        }
        info!(finalized, "collection pass complete");
        Ok(finalized)
    }

    /// Resolve one in-flight record. Returns true if it was finalized.
    async fn collect_one(
        &self,
        record: JobRecord,
        result_ref: &ResultRef,
    ) -> PipelineResult<bool> {
        let value = match self.backend.status(&result_ref.batch).await {
            Ok(BatchStatus::Pending) => return Ok(false),
            Ok(BatchStatus::Failure(reason)) => {
                // Non-success never finalizes the job; it stays in
                // flight for a future poll.
                warn!(key = %record.key, %reason, "batch failed, record left in flight");
                return Ok(false);
            }
            Err(err) => {
                warn!(key = %record.key, %err, "status poll failed, record left in flight");
                return Ok(false);
            }
            Ok(BatchStatus::Success) => {
                let readouts = self.backend.results(&result_ref.batch).await?;
                let readout = readouts.get(result_ref.index).ok_or_else(|| {
                    PipelineError::Invariant(format!(
                        "batch {} has no readout at index {}",
                        result_ref.batch, result_ref.index
                    ))
                })?;
                let extracted = readout.extract(
                    |key| key.starts_with(&result_ref.prefix),
                    |key| key[result_ref.prefix.len()..].to_string(),
                );
                serde_json::to_value(&extracted)?
            }
        };

        let mut txn = self.store.transaction().await?;
        let Some(mut fresh) = txn.get(&record.key).await? else {
            return Ok(false);
        };
        if !fresh.is_in_flight() {
            return Ok(false);
        }
        fresh.result = Some(value);
        fresh.message = "Success".to_string();
        fresh.done = true;
        txn.put(fresh);
        match txn.commit().await {
            Ok(()) => Ok(true),
            Err(err) if err.is_transient() => {
                warn!(key = %record.key, %err, "collection commit lost, record untouched");
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// The configured worker limits. Kept for symmetry with the other
    /// stages; collection itself has no tunables beyond the store.
    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::Processor;
    use crate::store::MemoryStore;
    use alsvid_adapter_sim::SimBackend;

    fn ghz_qasm() -> String {
        [
            "OPENQASM 2.0;",
            "include \"qelib1.inc\";",
            "qreg q[3];",
            "creg c[3];",
            "h q[0];",
            "cx q[0], q[1];",
            "cx q[1], q[2];",
            "measure q -> c;",
        ]
        .join("\n")
    }

    #[tokio::test]
    async fn test_collects_submitted_job() {
        let store = Arc::new(MemoryStore::new());
        let mut record = JobRecord::new(ghz_qasm(), 20);
        record.verified = true;
        let key = store.insert(record).await.unwrap();

        let backend = Arc::new(SimBackend::square(3));
        let config = WorkerConfig::default();
        Processor::new(store.clone(), backend.clone(), config.clone())
            .run()
            .await
            .unwrap();

        let collector = Collector::new(store.clone(), backend, config);
        let finalized = collector.run().await.unwrap();
        assert_eq!(finalized, 1);

        let record = store.get(&key).await.unwrap().unwrap();
        assert!(record.done);
        assert_eq!(record.message, "Success");
        let result = record.result.unwrap();
        // Keys come back with the member prefix stripped.
        assert!(result["counts"].get("c").is_some());
    }

    #[tokio::test]
    async fn test_failed_batch_leaves_record_in_flight() {
        let store = Arc::new(MemoryStore::new());
        let mut record = JobRecord::new(ghz_qasm(), 20);
        record.verified = true;
        let key = store.insert(record).await.unwrap();

        // Submission succeeds but execution fails, so the batch
        // reports Failure.
        let backend = Arc::new(SimBackend::square(3).with_max_qubits(2));
        let config = WorkerConfig::default();
        Processor::new(store.clone(), backend.clone(), config.clone())
            .run()
            .await
            .unwrap();

        let collector = Collector::new(store.clone(), backend, config);
        assert_eq!(collector.run().await.unwrap(), 0);

        let record = store.get(&key).await.unwrap().unwrap();
        assert!(record.sent);
        assert!(!record.done);
        assert!(record.result.is_none());
    }

    #[tokio::test]
    async fn test_unknown_batch_leaves_record_in_flight() {
        use alsvid_hal::BatchId;

        let store = Arc::new(MemoryStore::new());
        let mut record = JobRecord::new(ghz_qasm(), 20);
        record.verified = true;
        record.sent = true;
        record.result_ref = Some(ResultRef {
            batch: BatchId("gone".to_string()),
            index: 0,
            prefix: "0.".to_string(),
        });
        let key = store.insert(record).await.unwrap();

        let backend = Arc::new(SimBackend::square(3));
        let collector = Collector::new(store.clone(), backend, WorkerConfig::default());
        assert_eq!(collector.run().await.unwrap(), 0);

        let record = store.get(&key).await.unwrap().unwrap();
        assert!(record.is_in_flight());
    }

    #[tokio::test]
    async fn test_nothing_in_flight_is_a_noop() {
        let store = Arc::new(MemoryStore::new());
        let backend = Arc::new(SimBackend::square(3));
        let collector = Collector::new(store, backend, WorkerConfig::default());
        assert_eq!(collector.run().await.unwrap(), 0);
    }
}
