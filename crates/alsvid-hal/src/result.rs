//! Execution result types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Bitstring counts for one measurement key.
///
/// Bitstrings are little-endian over the measured qubits: the first
/// measured qubit is the first character.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts(BTreeMap<String, u32>);

impl Counts {
    /// Create empty counts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one observation of a bitstring.
    pub fn record(&mut self, bitstring: impl Into<String>) {
        *self.0.entry(bitstring.into()).or_insert(0) += 1;
    }

    /// Count for a specific bitstring.
    pub fn get(&self, bitstring: &str) -> u32 {
        self.0.get(bitstring).copied().unwrap_or(0)
    }

    /// Total observations.
    pub fn total(&self) -> u32 {
        self.0.values().sum()
    }

    /// Iterate over (bitstring, count) pairs in bitstring order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(k, &v)| (k.as_str(), v))
    }

    /// Number of distinct bitstrings observed.
    pub fn num_outcomes(&self) -> usize {
        self.0.len()
    }
}

impl FromIterator<(String, u32)> for Counts {
    fn from_iter<T: IntoIterator<Item = (String, u32)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The readout of one circuit execution: per-key counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Readout {
    /// Repetitions the circuit was sampled for.
    pub repetitions: u32,
    /// Counts per measurement key.
    pub counts: BTreeMap<String, Counts>,
}

impl Readout {
    /// Create an empty readout.
    pub fn new(repetitions: u32) -> Self {
        Self {
            repetitions,
            counts: BTreeMap::new(),
        }
    }

    /// Counts for a measurement key.
    pub fn key(&self, key: &str) -> Option<&Counts> {
        self.counts.get(key)
    }

    /// Measurement keys present, in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.counts.keys().map(String::as_str)
    }

    /// Keep only keys matching a predicate, with keys rewritten.
    ///
    /// Used to slice one member's results out of a batched readout:
    /// the predicate matches the member's key prefix and the rewrite
    /// strips it.
    pub fn extract<F, G>(&self, matches: F, rename: G) -> Readout
    where
        F: Fn(&str) -> bool,
        G: Fn(&str) -> String,
    {
        let counts = self
            .counts
            .iter()
            .filter(|(k, _)| matches(k))
            .map(|(k, v)| (rename(k), v.clone()))
            .collect();
        Readout {
            repetitions: self.repetitions,
            counts,
        }
    }
}
