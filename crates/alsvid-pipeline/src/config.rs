//! Worker configuration.

use std::time::Duration;

/// Limits and tuning knobs for one worker invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerConfig {
    /// Maximum qubits a program may address.
    pub max_qubits: u32,
    /// Maximum operations a program may contain.
    pub max_ops: usize,
    /// Maximum repetitions a job may request.
    pub max_repetitions: u32,
    /// Records claimed per page.
    pub page_size: usize,
    /// Calibration error threshold above which nodes are excluded from
    /// placement.
    pub error_threshold: f64,
    /// Deadline for store transactions.
    pub txn_timeout: Duration,
    /// How many claim conflicts to tolerate before giving up the page.
    pub max_claim_conflicts: u32,
    /// Opaque worker version tag recorded on touched records.
    pub worker_version: Option<String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_qubits: 16,
            max_ops: 120,
            max_repetitions: 100,
            page_size: 25,
            error_threshold: 25.0,
            txn_timeout: Duration::from_secs(5),
            max_claim_conflicts: 5,
            worker_version: None,
        }
    }
}

impl WorkerConfig {
    /// Defaults plus the version tag from `ALSVID_WORKER_VERSION`, if set.
    pub fn from_env() -> Self {
        Self {
            worker_version: std::env::var("ALSVID_WORKER_VERSION").ok(),
            ..Self::default()
        }
    }

    /// Override the qubit limit.
    pub fn with_max_qubits(mut self, max_qubits: u32) -> Self {
        self.max_qubits = max_qubits;
        self
    }

    /// Override the operation limit.
    pub fn with_max_ops(mut self, max_ops: usize) -> Self {
        self.max_ops = max_ops;
        self
    }

    /// Override the repetition limit.
    pub fn with_max_repetitions(mut self, max_repetitions: u32) -> Self {
        self.max_repetitions = max_repetitions;
        self
    }

    /// Override the page size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Override the calibration exclusion threshold.
    pub fn with_error_threshold(mut self, error_threshold: f64) -> Self {
        self.error_threshold = error_threshold;
        self
    }

    /// Override the worker version tag.
    pub fn with_worker_version(mut self, version: impl Into<String>) -> Self {
        self.worker_version = Some(version.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.max_qubits, 16);
        assert_eq!(config.max_ops, 120);
        assert_eq!(config.max_repetitions, 100);
        assert_eq!(config.page_size, 25);
        assert!(config.worker_version.is_none());
    }

    #[test]
    fn test_builders() {
        let config = WorkerConfig::default()
            .with_max_qubits(9)
            .with_page_size(3)
            .with_worker_version("v1");
        assert_eq!(config.max_qubits, 9);
        assert_eq!(config.page_size, 3);
        assert_eq!(config.worker_version.as_deref(), Some("v1"));
    }
}
