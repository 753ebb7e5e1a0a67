//! Job records and lifecycle flags.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use alsvid_hal::BatchId;

/// Unique identifier for a submitted job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobKey(pub Uuid);

impl JobKey {
    /// Create a new random job key.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a job key from a string.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for JobKey {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a submitted job's readout lives on the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRef {
    /// Backend batch the job was submitted in.
    pub batch: BatchId,
    /// Index of the job's circuit within the batch submission.
    pub index: usize,
    /// Measurement-key prefix identifying this job's counts within the
    /// combined readout.
    pub prefix: String,
}

/// A persisted job and its lifecycle state.
///
/// The flags form a state machine: unverified → `verified` → `sent` →
/// `done`, with one shortcut: rejection sets `done` without `verified`.
/// `done` is terminal; once set, only the collector completing a `sent`
/// job may still fill in `result` and `message`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Record key, assigned at construction.
    pub key: JobKey,
    /// QASM source as submitted. Immutable.
    pub program: String,
    /// Requested sample count.
    pub repetitions: u32,
    /// Passed verification.
    pub verified: bool,
    /// Claimed and submitted to a backend.
    pub sent: bool,
    /// Terminal.
    pub done: bool,
    /// Eligible for multiplexing with other jobs.
    pub batchable: bool,
    /// Human-readable status or diagnostic.
    pub message: String,
    /// Placed circuit, recorded for audit after successful placement.
    pub mapped_program: Option<String>,
    /// Backend locator for asynchronous result retrieval.
    pub result_ref: Option<ResultRef>,
    /// Final readout data.
    pub result: Option<serde_json::Value>,
    /// Optional submitter note.
    pub note: Option<String>,
    /// When the job was submitted.
    pub submitted_at: DateTime<Utc>,
    /// When verification completed.
    pub verified_at: Option<DateTime<Utc>>,
    /// When a worker claimed the job for execution.
    pub processed_at: Option<DateTime<Utc>>,
    /// Version tag of the last worker that touched the record.
    pub worker_version: Option<String>,
}

impl JobRecord {
    /// Create a fresh, unverified record.
    pub fn new(program: impl Into<String>, repetitions: u32) -> Self {
        Self {
            key: JobKey::new(),
            program: program.into(),
            repetitions,
            verified: false,
            sent: false,
            done: false,
            batchable: true,
            message: String::new(),
            mapped_program: None,
            result_ref: None,
            result: None,
            note: None,
            submitted_at: Utc::now(),
            verified_at: None,
            processed_at: None,
            worker_version: None,
        }
    }

    /// Opt the job out of multiplexing.
    pub fn with_batchable(mut self, batchable: bool) -> Self {
        self.batchable = batchable;
        self
    }

    /// Attach a submitter note.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Whether the record is awaiting verification.
    pub fn is_unverified(&self) -> bool {
        !self.verified && !self.sent && !self.done
    }

    /// Whether the record is ready to be claimed for execution.
    pub fn is_claimable(&self) -> bool {
        self.verified && !self.sent && !self.done
    }

    /// Whether the record is submitted and awaiting its result.
    pub fn is_in_flight(&self) -> bool {
        self.sent && !self.done
    }

    /// Mark the job terminally failed with a diagnostic.
    pub fn finalize_failed(&mut self, message: impl Into<String>) {
        self.done = true;
        self.message = message.into();
    }
}

/// Filter over lifecycle flags for store queries.
///
/// `None` for a flag matches either value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    /// Required `verified` value.
    pub verified: Option<bool>,
    /// Required `sent` value.
    pub sent: Option<bool>,
    /// Required `done` value.
    pub done: Option<bool>,
    /// Maximum number of keys to return.
    pub limit: Option<usize>,
}

impl RecordFilter {
    /// Records awaiting verification.
    pub fn unverified() -> Self {
        Self {
            verified: Some(false),
            sent: Some(false),
            done: Some(false),
            limit: None,
        }
    }

    /// Records ready to be claimed for execution.
    pub fn claimable() -> Self {
        Self {
            verified: Some(true),
            sent: Some(false),
            done: Some(false),
            limit: None,
        }
    }

    /// Records submitted and awaiting results.
    pub fn in_flight() -> Self {
        Self {
            sent: Some(true),
            done: Some(false),
            ..Self::default()
        }
    }

    /// Cap the number of returned keys.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether a record matches this filter.
    pub fn matches(&self, record: &JobRecord) -> bool {
        self.verified.is_none_or(|v| record.verified == v)
            && self.sent.is_none_or(|v| record.sent == v)
            && self.done.is_none_or(|v| record.done == v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_defaults() {
        let record = JobRecord::new("OPENQASM 2.0;", 100);
        assert!(!record.verified);
        assert!(!record.sent);
        assert!(!record.done);
        assert!(record.batchable);
        assert!(record.is_unverified());
        assert!(!record.is_claimable());
    }

    #[test]
    fn test_lifecycle_predicates() {
        let mut record = JobRecord::new("x", 1);
        record.verified = true;
        assert!(record.is_claimable());

        record.sent = true;
        assert!(!record.is_claimable());
        assert!(record.is_in_flight());

        record.done = true;
        assert!(!record.is_in_flight());
    }

    #[test]
    fn test_filter_matches() {
        let mut record = JobRecord::new("x", 1);
        assert!(RecordFilter::unverified().matches(&record));
        assert!(!RecordFilter::claimable().matches(&record));

        record.verified = true;
        assert!(RecordFilter::claimable().matches(&record));

        record.sent = true;
        assert!(RecordFilter::in_flight().matches(&record));

        record.done = true;
        assert!(!RecordFilter::in_flight().matches(&record));
    }

    #[test]
    fn test_record_round_trips_through_json() {
        let record = JobRecord::new("OPENQASM 2.0;", 10).with_note("hello");
        let json = serde_json::to_string(&record).unwrap();
        let back: JobRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, back);
    }
}
