//! Batching processor stage.
//!
//! Claims pages of verified records, places their circuits on the
//! backend topology, multiplexes compatible jobs into combined batches
//! and submits them. The claim happens in one transaction before any
//! backend call, so a job observed by two overlapping workers runs at
//! most once: the loser's claim fails with a conflict and touches
//! nothing.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use alsvid_hal::Backend;
use alsvid_place::{Multiplexer, PlaceError, Placer, faulty_nodes};

use crate::config::WorkerConfig;
use crate::error::{PipelineError, PipelineResult, StoreError};
use crate::record::{JobRecord, RecordFilter, ResultRef};
use crate::store::JobStore;

/// Execution worker stage.
pub struct Processor {
    store: Arc<dyn JobStore>,
    backend: Arc<dyn Backend>,
    config: WorkerConfig,
}

impl Processor {
    /// Create a processor over a store and a backend.
    pub fn new(store: Arc<dyn JobStore>, backend: Arc<dyn Backend>, config: WorkerConfig) -> Self {
        Self {
            store,
            backend,
            config,
        }
    }

    /// Claim and process pages of verified records until none remain.
    ///
    /// Returns the number of jobs claimed.
    #[instrument(skip(self))]
    pub async fn run(&self) -> PipelineResult<usize> {
        let calibration = self.backend.calibration().await?;
        let exclude = faulty_nodes(&calibration, self.config.error_threshold);
        if !exclude.is_empty() {
            debug!(excluded = exclude.len(), "calibration excludes nodes");
        }

        let mut total = 0;
        loop {
            let page = self.claim_page().await?;
            if page.is_empty() {
                break;
            }
            total += page.len();
            self.process_page(page, &exclude).await?;
        }
        info!(total, "processing pass complete");
        Ok(total)
    }

    /// Claim one page of claimable records in a single transaction.
    ///
    /// The returned records already carry `sent=true` in the store; the
    /// caller owns their completion. A conflicting claim is retried with
    /// a fresh query up to the configured bound.
    async fn claim_page(&self) -> PipelineResult<Vec<JobRecord>> {
        let filter = RecordFilter::claimable().with_limit(self.config.page_size);
        for _ in 0..=self.config.max_claim_conflicts {
            let keys = self.store.query_keys(&filter).await?;
            if keys.is_empty() {
                return Ok(Vec::new());
            }

            let mut txn = self.store.transaction().await?;
            let mut claimed = Vec::new();
            for key in keys {
                let Some(mut record) = txn.get(&key).await? else {
                    continue;
                };
                if !record.is_claimable() {
                    continue;
                }
                record.sent = true;
                record.processed_at = Some(Utc::now());
                record.worker_version = self.config.worker_version.clone();
                txn.put(record.clone());
                claimed.push(record);
            }
            if claimed.is_empty() {
                return Ok(Vec::new());
            }

            match txn.commit().await {
                Ok(()) => {
                    debug!(claimed = claimed.len(), "page claimed");
                    return Ok(claimed);
                }
                Err(err) if err.is_transient() => {
                    warn!(%err, "page claim lost, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(StoreError::Conflict("page claim retries exhausted".to_string()).into())
    }

    /// Place, batch and submit one claimed page.
    async fn process_page(
        &self,
        records: Vec<JobRecord>,
        exclude: &rustc_hash::FxHashSet<alsvid_hal::GridNode>,
    ) -> PipelineResult<()> {
        let placer = Placer::serpentine(self.backend.topology()).ok_or_else(|| {
            PipelineError::Config("backend topology has no nodes".to_string())
        })?;

        let mut updates = Vec::new();
        let mut solo = Vec::new();
        let mut members = Vec::new();
        let mut circuits = Vec::new();

        for mut record in records {
            // Verification already parsed the program and it is
            // immutable, so a failure here is unexpected but still
            // finalized rather than retried forever.
            match alsvid_qasm::parse(&record.program) {
                Ok(circuit) if record.batchable => {
                    members.push(record);
                    circuits.push(circuit);
                }
                Ok(circuit) => solo.push((record, circuit)),
                Err(err) => {
                    record.finalize_failed(
                        PipelineError::Converting(err.to_string()).to_string(),
                    );
                    updates.push(record);
                }
            }
        }

        for (mut record, circuit) in solo {
            self.run_solo(&placer, exclude, &mut record, &circuit).await?;
            updates.push(record);
        }

        if !members.is_empty() {
            let mux = Multiplexer::new(&placer, circuits, exclude.clone());
            for mut round in mux {
                for (index, err) in std::mem::take(&mut round.failed) {
                    // Duplicate keys and validation failures are pipeline
                    // defects, not job properties; abort loudly.
                    if matches!(
                        err,
                        PlaceError::DuplicateKey(_) | PlaceError::Validation(_)
                    ) {
                        return Err(err.into());
                    }
                    warn!(key = %members[index].key, %err, "placement failed");
                    members[index].finalize_failed(format!("Placement failed: {err}"));
                }
                if round.is_empty() {
                    continue;
                }

                // One submission per multiplexer round, sampled at the
                // largest request among its members.
                let repetitions = round
                    .included
                    .iter()
                    .map(|&i| members[i].repetitions)
                    .max()
                    .unwrap_or(1);
                let mapped = alsvid_qasm::emit(&round.circuit);
                match self
                    .backend
                    .submit_batch(std::slice::from_ref(&round.circuit), repetitions)
                    .await
                {
                    Ok(batch) => {
                        debug!(%batch, members = round.included.len(), "round submitted");
                        for &i in &round.included {
                            members[i].mapped_program = Some(mapped.clone());
                            members[i].result_ref = Some(ResultRef {
                                batch: batch.clone(),
                                index: 0,
                                prefix: format!("{i}."),
                            });
                        }
                    }
                    Err(err) => {
                        let message = format!("Submission failed: {err}");
                        for &i in &round.included {
                            members[i].finalize_failed(message.clone());
                        }
                    }
                }
            }
            updates.extend(members);
        }

        self.store.put_multi(updates).await?;
        Ok(())
    }

    /// Place and synchronously execute a job that opted out of batching.
    async fn run_solo(
        &self,
        placer: &Placer<'_>,
        exclude: &rustc_hash::FxHashSet<alsvid_hal::GridNode>,
        record: &mut JobRecord,
        circuit: &alsvid_ir::Circuit,
    ) -> PipelineResult<()> {
        let placement = match placer.place(circuit, exclude, None) {
            Ok(placement) => placement,
            // Duplicate keys and validation failures are pipeline
            // defects, not job properties; abort loudly.
            Err(err @ (PlaceError::DuplicateKey(_) | PlaceError::Validation(_))) => {
                return Err(err.into());
            }
            Err(err) => {
                warn!(key = %record.key, %err, "placement failed");
                record.finalize_failed(format!("Placement failed: {err}"));
                return Ok(());
            }
        };

        record.mapped_program = Some(alsvid_qasm::emit(&placement.circuit));
        match self.backend.run(&placement.circuit, record.repetitions).await {
            Ok(readout) => {
                record.result = Some(serde_json::to_value(&readout)?);
                record.done = true;
                record.message = "Success".to_string();
            }
            Err(err) => {
                warn!(key = %record.key, %err, "execution failed");
                record.finalize_failed(format!("Execution failed: {err}"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use alsvid_adapter_sim::SimBackend;

    fn bell_qasm() -> String {
        [
            "OPENQASM 2.0;",
            "include \"qelib1.inc\";",
            "qreg q[2];",
            "creg c[2];",
            "h q[0];",
            "cx q[0], q[1];",
            "measure q -> c;",
        ]
        .join("\n")
    }

    async fn seed_verified(store: &MemoryStore, batchable: bool) -> crate::record::JobKey {
        let mut record = JobRecord::new(bell_qasm(), 10).with_batchable(batchable);
        record.verified = true;
        store.insert(record).await.unwrap()
    }

    #[tokio::test]
    async fn test_claim_sets_sent_before_completion() {
        let store = Arc::new(MemoryStore::new());
        let key = seed_verified(&store, true).await;

        let backend = Arc::new(SimBackend::square(3));
        let processor = Processor::new(store.clone(), backend, WorkerConfig::default());
        let claimed = processor.run().await.unwrap();
        assert_eq!(claimed, 1);

        let record = store.get(&key).await.unwrap().unwrap();
        assert!(record.sent);
        assert!(record.processed_at.is_some());
        assert!(record.result_ref.is_some());
        assert!(record.mapped_program.is_some());
        assert!(!record.done);
    }

    #[tokio::test]
    async fn test_unbatchable_job_runs_synchronously() {
        let store = Arc::new(MemoryStore::new());
        let key = seed_verified(&store, false).await;

        let backend = Arc::new(SimBackend::square(3));
        let processor = Processor::new(store.clone(), backend, WorkerConfig::default());
        processor.run().await.unwrap();

        let record = store.get(&key).await.unwrap().unwrap();
        assert!(record.sent);
        assert!(record.done);
        assert_eq!(record.message, "Success");
        assert!(record.result.is_some());
        assert!(record.result_ref.is_none());
    }

    #[tokio::test]
    async fn test_empty_store_claims_nothing() {
        let store = Arc::new(MemoryStore::new());
        let backend = Arc::new(SimBackend::square(3));
        let processor = Processor::new(store.clone(), backend, WorkerConfig::default());
        assert_eq!(processor.run().await.unwrap(), 0);
    }
}
