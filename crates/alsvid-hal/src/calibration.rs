//! Device calibration data.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::topology::GridNode;

/// One calibration measurement: a metric value (or values) for a set of
/// target qubits. Single-qubit metrics carry one target, two-qubit
/// metrics carry the coupled pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationEntry {
    /// The qubits this measurement applies to.
    pub targets: Vec<GridNode>,
    /// Measured values, most recent first.
    pub values: Vec<f64>,
}

impl CalibrationEntry {
    /// Create an entry.
    pub fn new(targets: Vec<GridNode>, values: Vec<f64>) -> Self {
        Self { targets, values }
    }

    /// The most recent value, if any.
    pub fn latest(&self) -> Option<f64> {
        self.values.first().copied()
    }
}

/// A calibration snapshot: named metrics over qubits and qubit pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    metrics: FxHashMap<String, Vec<CalibrationEntry>>,
}

impl Calibration {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a measurement under a metric name.
    pub fn insert(&mut self, metric: impl Into<String>, entry: CalibrationEntry) {
        self.metrics.entry(metric.into()).or_default().push(entry);
    }

    /// All measurements for a metric.
    pub fn metric(&self, name: &str) -> Option<&[CalibrationEntry]> {
        self.metrics.get(name).map(Vec::as_slice)
    }

    /// Metric names present in this snapshot.
    pub fn metric_names(&self) -> impl Iterator<Item = &str> {
        self.metrics.keys().map(String::as_str)
    }

    /// Check whether the snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}
