//! Opportunistic multiplexing of independent circuits onto one device.
//!
//! Circuits are placed first-come-first-served; each placement's nodes
//! join a growing exclusion set so members never overlap. When a circuit
//! no longer fits, the accumulated batch closes out and a fresh one
//! starts with the circuit that overflowed. A circuit that does not fit
//! even on an otherwise empty device is a terminal failure for that
//! circuit alone, never for the batch.

use std::collections::BTreeSet;

use alsvid_hal::GridNode;
use alsvid_ir::Circuit;
use rustc_hash::FxHashSet;
use tracing::{debug, warn};

use crate::error::PlaceError;
use crate::place::{Placement, Placer, with_index_prefix};

/// One closed-out batch of multiplexed circuits.
#[derive(Debug)]
pub struct MuxBatch {
    /// The combined physical circuit.
    pub circuit: Circuit,
    /// Indices of the input circuits included in `circuit`. Measurement
    /// keys of member `i` are namespaced `i.<key>`.
    pub included: BTreeSet<usize>,
    /// Circuits that failed placement terminally since the previous
    /// batch, with the error that sank them.
    pub failed: Vec<(usize, PlaceError)>,
}

impl MuxBatch {
    /// Check whether the batch carries no placed circuits.
    pub fn is_empty(&self) -> bool {
        self.included.is_empty()
    }
}

/// Lazy batching placement over a sequence of circuits.
///
/// Yields [`MuxBatch`] values until the input is exhausted; finite input
/// gives finitely many batches.
pub struct Multiplexer<'a> {
    placer: &'a Placer<'a>,
    inputs: std::iter::Enumerate<std::vec::IntoIter<Circuit>>,
    exclude_always: FxHashSet<GridNode>,
    exclude: FxHashSet<GridNode>,
    start: Option<GridNode>,
    cumulative: Circuit,
    included: BTreeSet<usize>,
    failed: Vec<(usize, PlaceError)>,
    carry: Option<(usize, Placement)>,
    finished: bool,
}

impl<'a> Multiplexer<'a> {
    /// Create a multiplexer over a circuit sequence.
    ///
    /// `exclude_always` nodes (typically from the calibration filter)
    /// are avoided by every batch; nodes consumed by placed members are
    /// avoided only within their batch.
    pub fn new(
        placer: &'a Placer<'a>,
        circuits: Vec<Circuit>,
        exclude_always: FxHashSet<GridNode>,
    ) -> Self {
        let exclude = exclude_always.clone();
        let cumulative = Self::empty_batch(placer);
        Self {
            placer,
            inputs: circuits.into_iter().enumerate(),
            exclude_always,
            exclude,
            start: None,
            cumulative,
            included: BTreeSet::new(),
            failed: Vec::new(),
            carry: None,
            finished: false,
        }
    }

    fn empty_batch(placer: &Placer<'_>) -> Circuit {
        Circuit::with_size("mux", placer.topology().num_nodes(), 0)
    }

    /// Merge a placed member into the accumulating batch.
    fn absorb(&mut self, index: usize, placement: Placement) {
        debug!(index, nodes = placement.used.len(), "circuit joined batch");
        self.exclude.extend(placement.used.iter().copied());
        self.start = placement.next_start;
        if let Err(err) = self.cumulative.merge(&placement.circuit) {
            // Index namespacing makes key collisions impossible; anything
            // else surfacing here is a bug in the member circuit.
            warn!(index, %err, "placed circuit could not be merged");
            self.failed.push((index, err.into()));
            return;
        }
        self.included.insert(index);
    }

    /// Close out and reset the accumulating batch.
    fn take_batch(&mut self) -> MuxBatch {
        let circuit = std::mem::replace(&mut self.cumulative, Self::empty_batch(self.placer));
        MuxBatch {
            circuit,
            included: std::mem::take(&mut self.included),
            failed: std::mem::take(&mut self.failed),
        }
    }
}

impl Iterator for Multiplexer<'_> {
    type Item = MuxBatch;

    fn next(&mut self) -> Option<MuxBatch> {
        if self.finished {
            return None;
        }

        // The circuit that overflowed the previous batch opens this one.
        if let Some((index, placement)) = self.carry.take() {
            self.absorb(index, placement);
        }

        while let Some((index, circuit)) = self.inputs.next() {
            let prefixed = match with_index_prefix(&circuit, index) {
                Ok(c) => c,
                Err(err) => {
                    self.failed.push((index, err));
                    continue;
                }
            };

            match self.placer.place(&prefixed, &self.exclude, self.start) {
                Ok(placement) => self.absorb(index, placement),
                Err(PlaceError::NoPlacement { .. }) => {
                    // Check whether the circuit fits with only the base
                    // exclusions before blaming it. The accumulated set
                    // stays intact unless the retry succeeds.
                    let base = self.exclude_always.clone();
                    match self.placer.place(&prefixed, &base, None) {
                        Ok(placement) => {
                            self.exclude = base;
                            self.start = None;
                            self.carry = Some((index, placement));
                            return Some(self.take_batch());
                        }
                        Err(err) => {
                            debug!(index, %err, "circuit unplaceable even alone");
                            self.failed.push((index, err));
                        }
                    }
                }
                Err(err) => {
                    self.failed.push((index, err));
                }
            }
        }

        self.finished = true;
        if self.included.is_empty() && self.failed.is_empty() {
            None
        } else {
            Some(self.take_batch())
        }
    }
}

#[cfg(test)]
mod tests {
    use alsvid_hal::GridTopology;

    use super::*;

    fn three_qubit_chain() -> Circuit {
        Circuit::ghz(3).unwrap()
    }

    #[test]
    fn test_single_batch() {
        let topology = GridTopology::square(3);
        let placer = Placer::serpentine(&topology).unwrap();

        let circuits = vec![Circuit::bell().unwrap(), Circuit::bell().unwrap()];
        let batches: Vec<MuxBatch> =
            Multiplexer::new(&placer, circuits, FxHashSet::default()).collect();

        assert_eq!(batches.len(), 1);
        assert_eq!(
            batches[0].included,
            BTreeSet::from([0, 1])
        );
        assert!(batches[0].failed.is_empty());
    }

    #[test]
    fn test_keys_namespaced_per_member() {
        let topology = GridTopology::square(3);
        let placer = Placer::serpentine(&topology).unwrap();

        let circuits = vec![Circuit::bell().unwrap(), Circuit::bell().unwrap()];
        let batches: Vec<MuxBatch> =
            Multiplexer::new(&placer, circuits, FxHashSet::default()).collect();

        let keys = batches[0].circuit.measurement_keys();
        assert!(keys.iter().all(|k| k.starts_with("0.") || k.starts_with("1.")));
        assert!(keys.iter().any(|k| k.starts_with("0.")));
        assert!(keys.iter().any(|k| k.starts_with("1.")));
    }

    #[test]
    fn test_overflow_splits_batches() {
        let topology = GridTopology::square(3);
        let placer = Placer::serpentine(&topology).unwrap();

        // Four 3-qubit circuits need 12 nodes; only 9 exist.
        let circuits = vec![
            three_qubit_chain(),
            three_qubit_chain(),
            three_qubit_chain(),
            three_qubit_chain(),
        ];
        let batches: Vec<MuxBatch> =
            Multiplexer::new(&placer, circuits, FxHashSet::default()).collect();

        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].included, BTreeSet::from([0, 1, 2]));
        assert_eq!(batches[1].included, BTreeSet::from([3]));

        // Members of one batch never share nodes: three disjoint
        // 3-qubit placements cover all nine.
        assert_eq!(batches[0].circuit.used_qubits().len(), 9);
        assert_eq!(batches[1].circuit.used_qubits().len(), 3);
    }

    #[test]
    fn test_unplaceable_circuit_fails_alone() {
        let topology = GridTopology::square(2);
        let placer = Placer::serpentine(&topology).unwrap();

        let circuits = vec![Circuit::bell().unwrap(), Circuit::ghz(5).unwrap()];
        let batches: Vec<MuxBatch> =
            Multiplexer::new(&placer, circuits, FxHashSet::default()).collect();

        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].included, BTreeSet::from([0]));
        assert_eq!(batches[0].failed.len(), 1);
        assert_eq!(batches[0].failed[0].0, 1);
        assert!(matches!(
            batches[0].failed[0].1,
            PlaceError::NoPlacement { .. }
        ));
    }

    #[test]
    fn test_always_excluded_respected_across_batches() {
        let topology = GridTopology::square(3);
        let placer = Placer::serpentine(&topology).unwrap();
        let always: FxHashSet<GridNode> = [GridNode::new(1, 1)].into_iter().collect();

        let circuits = vec![
            three_qubit_chain(),
            three_qubit_chain(),
            three_qubit_chain(),
        ];
        let batches: Vec<MuxBatch> =
            Multiplexer::new(&placer, circuits, always.clone()).collect();

        assert!(batches.len() >= 2);
        for batch in &batches {
            for q in batch.circuit.used_qubits() {
                let node = topology.node_at(q.0).unwrap();
                assert!(!always.contains(&node));
            }
        }
    }

    #[test]
    fn test_empty_input() {
        let topology = GridTopology::square(3);
        let placer = Placer::serpentine(&topology).unwrap();
        let batches: Vec<MuxBatch> =
            Multiplexer::new(&placer, vec![], FxHashSet::default()).collect();
        assert!(batches.is_empty());
    }
}
