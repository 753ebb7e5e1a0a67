//! Verification stage.
//!
//! Pulls unverified records and checks each program against the worker
//! limits before it can be claimed for execution. Verification is a
//! tri-state outcome: accepted (`verified=true`), rejected
//! (`done=true`, the program never runs), or untouched on transient
//! store failure.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use crate::config::WorkerConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::record::{JobRecord, RecordFilter};
use crate::store::JobStore;

/// Check one record against the worker limits.
///
/// The record must be unverified and not terminal; anything else means
/// a query or claim bug upstream and aborts with
/// [`PipelineError::Invariant`].
pub fn verify_record(
    record: &JobRecord,
    config: &WorkerConfig,
    now: DateTime<Utc>,
) -> PipelineResult<JobRecord> {
    if !record.is_unverified() {
        return Err(PipelineError::Invariant(format!(
            "verify called on record {} with verified={} sent={} done={}",
            record.key, record.verified, record.sent, record.done
        )));
    }

    let mut updated = record.clone();
    updated.worker_version = config.worker_version.clone();

    let circuit = match alsvid_qasm::parse(&record.program) {
        Ok(circuit) => circuit,
        Err(err) => {
            updated.finalize_failed(PipelineError::Converting(err.to_string()).to_string());
            return Ok(updated);
        }
    };

    // A wide register costs nothing by itself; only qubits that
    // operations touch count against the limit.
    let used_qubits = circuit.used_qubits().len();
    let mut violations = Vec::new();
    if used_qubits > config.max_qubits as usize {
        violations.push(format!(
            "program uses {used_qubits} qubits, limit is {}",
            config.max_qubits
        ));
    }
    if circuit.num_ops() > config.max_ops {
        violations.push(format!(
            "program has {} operations, limit is {}",
            circuit.num_ops(),
            config.max_ops
        ));
    }
    if record.repetitions > config.max_repetitions {
        violations.push(format!(
            "{} repetitions requested, limit is {}",
            record.repetitions, config.max_repetitions
        ));
    }

    if violations.is_empty() {
        updated.verified = true;
        updated.message = "Verified".to_string();
        updated.verified_at = Some(now);
    } else {
        updated.finalize_failed(violations.join("; "));
    }
    Ok(updated)
}

/// Verification worker stage.
pub struct Verifier {
    store: Arc<dyn JobStore>,
    config: WorkerConfig,
}

impl Verifier {
    /// Create a verifier over a store.
    pub fn new(store: Arc<dyn JobStore>, config: WorkerConfig) -> Self {
        Self { store, config }
    }

    /// Verify pages of unverified records until none remain.
    ///
    /// Returns the number of records resolved (accepted or rejected).
    #[instrument(skip(self))]
    pub async fn run(&self) -> PipelineResult<usize> {
        let mut total = 0;
        loop {
            let resolved = self.verify_page().await?;
            if resolved == 0 {
                break;
            }
            total += resolved;
        }
        info!(total, "verification pass complete");
        Ok(total)
    }

    /// Verify one page of records, each in its own transaction.
    pub async fn verify_page(&self) -> PipelineResult<usize> {
        let filter = RecordFilter::unverified().with_limit(self.config.page_size);
        let keys = self.store.query_keys(&filter).await?;
        if keys.is_empty() {
            return Ok(0);
        }

        let mut resolved = 0;
        for key in keys {
            let mut txn = self.store.transaction().await?;
            let Some(record) = txn.get(&key).await? else {
                continue;
            };
            if !record.is_unverified() {
                // Another worker resolved it since the query.
                continue;
            }

            let updated = verify_record(&record, &self.config, Utc::now())?;
            let accepted = updated.verified;
            txn.put(updated);
            match txn.commit().await {
                Ok(()) => {
                    debug!(%key, accepted, "record verified");
                    resolved += 1;
                }
                Err(err) if err.is_transient() => {
                    warn!(%key, %err, "verification commit lost, record untouched");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(resolved)
    }
}
