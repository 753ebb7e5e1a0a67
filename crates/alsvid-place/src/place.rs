//! The placement pipeline.
//!
//! Maps an abstract circuit onto the device grid in five steps:
//!
//! 1. Accept the circuit as-is when it is already native (fast path).
//! 2. Split multi-qubit measurements into per-qubit keyed measurements.
//! 3. Line-search the traversal curve for a contiguous run of available
//!    nodes and lay the circuit's qubits along it.
//! 4. Swap-route two-qubit gates over the line's coupling graph.
//! 5. Validate the result against the topology; a violation here is a
//!    defect in the pipeline and is reported as such, never accepted.

use alsvid_hal::{GridNode, GridTopology};
use alsvid_ir::{Circuit, Instruction, InstructionKind, QubitId};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::curve::TraversalCurve;
use crate::error::{PlaceError, PlaceResult};
use crate::layout::Layout;
use crate::line::line_search;
use crate::route::route;

/// A successfully placed circuit.
#[derive(Debug, Clone)]
pub struct Placement {
    /// The physical circuit; qubit ids are dense topology indices.
    pub circuit: Circuit,
    /// Grid nodes the circuit consumes.
    pub used: FxHashSet<GridNode>,
    /// Curve node for the next placement to resume from.
    pub next_start: Option<GridNode>,
}

/// Places abstract circuits onto a grid topology along a fixed curve.
#[derive(Debug, Clone)]
pub struct Placer<'a> {
    topology: &'a GridTopology,
    curve: TraversalCurve,
}

impl<'a> Placer<'a> {
    /// Create a placer with an explicit traversal curve.
    pub fn new(topology: &'a GridTopology, curve: TraversalCurve) -> Self {
        Self { topology, curve }
    }

    /// Create a placer with a serpentine curve over the topology.
    pub fn serpentine(topology: &'a GridTopology) -> Option<Self> {
        TraversalCurve::serpentine(topology).map(|curve| Self::new(topology, curve))
    }

    /// The topology this placer targets.
    pub fn topology(&self) -> &GridTopology {
        self.topology
    }

    /// The traversal curve in use.
    pub fn curve(&self) -> &TraversalCurve {
        &self.curve
    }

    /// Place one circuit, avoiding `excluded` nodes.
    ///
    /// `start` continues the line search from a previous placement's
    /// [`Placement::next_start`]; `None` starts at the head of the curve.
    pub fn place(
        &self,
        circuit: &Circuit,
        excluded: &FxHashSet<GridNode>,
        start: Option<GridNode>,
    ) -> PlaceResult<Placement> {
        self.check_supported(circuit)?;

        // Fast path: the circuit may already be native.
        if self.is_native(circuit, excluded) {
            debug!(name = circuit.name(), "circuit accepted as native");
            let used = self.nodes_of(circuit)?;
            return Ok(Placement {
                circuit: circuit.clone(),
                used,
                next_start: start,
            });
        }

        // The router only handles single-qubit measurements.
        let split = split_measurements(circuit)?;

        let width = split.used_qubits().len();
        let line = line_search(
            &self.curve,
            start.unwrap_or_else(|| self.curve.start()),
            width,
            self.topology,
            excluded,
        )?;
        debug!(name = circuit.name(), width, ?line.nodes, "line found");

        let mut layout = Layout::new();
        for (logical, node) in split.used_qubits().into_iter().zip(&line.nodes) {
            let physical = self
                .topology
                .index_of(node)
                .ok_or_else(|| PlaceError::Validation(format!("line node {node} off device")))?;
            layout.insert(logical, physical);
        }

        // Routing is confined to the line, so a concurrent placement's
        // nodes are never crossed.
        let line_set: FxHashSet<GridNode> = line.nodes.iter().copied().collect();
        let graph = self.topology.connectivity(&line_set);
        let routed = route(&split, &mut layout, &graph, self.topology.num_nodes())?;

        self.validate(&routed, excluded)?;

        let used = self.nodes_of(&routed)?;
        Ok(Placement {
            circuit: routed,
            used,
            next_start: line.next_start,
        })
    }

    /// Reject operations the pipeline cannot map.
    fn check_supported(&self, circuit: &Circuit) -> PlaceResult<()> {
        for op in circuit.ops() {
            if op.is_gate() && op.qubits.len() > 2 {
                return Err(PlaceError::UnsupportedOp(op.name().to_string()));
            }
        }
        Ok(())
    }

    /// Check whether every qubit id is an available topology index and
    /// every two-qubit gate acts on a coupled pair.
    fn is_native(&self, circuit: &Circuit, excluded: &FxHashSet<GridNode>) -> bool {
        let node = |q: QubitId| self.topology.node_at(q.0);
        for op in circuit.ops() {
            for &q in &op.qubits {
                match node(q) {
                    Some(n) if !excluded.contains(&n) => {}
                    _ => return false,
                }
            }
            if op.is_gate() && op.qubits.len() == 2 {
                let (Some(a), Some(b)) = (node(op.qubits[0]), node(op.qubits[1])) else {
                    return false;
                };
                if !self.topology.is_coupled(&a, &b) {
                    return false;
                }
            }
        }
        true
    }

    /// Final validation of a physical circuit. A failure here means the
    /// pipeline produced an illegal circuit and must not be masked.
    fn validate(&self, circuit: &Circuit, excluded: &FxHashSet<GridNode>) -> PlaceResult<()> {
        for op in circuit.ops() {
            for &q in &op.qubits {
                let node = self
                    .topology
                    .node_at(q.0)
                    .ok_or_else(|| PlaceError::Validation(format!("qubit {q} off device")))?;
                if excluded.contains(&node) {
                    return Err(PlaceError::Validation(format!(
                        "qubit {q} placed on excluded node {node}"
                    )));
                }
            }
            if op.is_gate() && op.qubits.len() == 2 {
                let a = self.topology.node_at(op.qubits[0].0);
                let b = self.topology.node_at(op.qubits[1].0);
                let coupled = match (a, b) {
                    (Some(a), Some(b)) => self.topology.is_coupled(&a, &b),
                    _ => false,
                };
                if !coupled {
                    return Err(PlaceError::Validation(format!(
                        "{} on non-coupled pair {}, {}",
                        op.name(),
                        op.qubits[0],
                        op.qubits[1]
                    )));
                }
            }
        }
        Ok(())
    }

    /// Grid nodes referenced by a physical circuit.
    fn nodes_of(&self, circuit: &Circuit) -> PlaceResult<FxHashSet<GridNode>> {
        circuit
            .used_qubits()
            .into_iter()
            .map(|q| {
                self.topology
                    .node_at(q.0)
                    .ok_or_else(|| PlaceError::Validation(format!("qubit {q} off device")))
            })
            .collect()
    }
}

/// Split every multi-qubit measurement into per-qubit measurements.
///
/// Each split measurement is keyed `key.qN` from the original key and
/// its qubit, keeping keys unique within the circuit.
fn split_measurements(circuit: &Circuit) -> PlaceResult<Circuit> {
    let mut out = Circuit::with_size(
        circuit.name(),
        circuit.num_qubits(),
        circuit.num_clbits(),
    );
    for op in circuit.ops() {
        match &op.kind {
            InstructionKind::Measure { key } if op.qubits.len() > 1 => {
                for (&q, &c) in op.qubits.iter().zip(op.clbits.iter()) {
                    out.append(Instruction::measure(format!("{key}.{q}"), q, c))?;
                }
            }
            _ => {
                out.append(op.clone())?;
            }
        }
    }
    Ok(out)
}

/// Namespace every measurement key of a circuit with a sequence index.
pub fn with_index_prefix(circuit: &Circuit, index: usize) -> PlaceResult<Circuit> {
    let map: FxHashMap<String, String> = circuit
        .measurement_keys()
        .into_iter()
        .map(|key| {
            let prefixed = format!("{index}.{key}");
            (key, prefixed)
        })
        .collect();
    Ok(circuit.with_key_mapping(&map)?)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn placer(topology: &GridTopology) -> Placer<'_> {
        Placer::serpentine(topology).unwrap()
    }

    #[test]
    fn test_fast_path_native_circuit() {
        let topology = GridTopology::square(3);
        let placer = placer(&topology);

        // Indices 0 and 1 are (0,0) and (0,1): coupled.
        let mut circuit = Circuit::with_size("native", 2, 2);
        circuit.h(QubitId(0)).unwrap();
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        circuit.measure_all("m").unwrap();

        let placement = placer.place(&circuit, &FxHashSet::default(), None).unwrap();
        assert_eq!(placement.circuit, circuit);
        assert_eq!(placement.used.len(), 2);
    }

    #[test]
    fn test_fast_path_rejected_when_node_excluded() {
        let topology = GridTopology::square(3);
        let placer = placer(&topology);

        let mut circuit = Circuit::with_size("c", 2, 0);
        circuit.cx(QubitId(0), QubitId(1)).unwrap();

        // Excluding (0,0) forces the line search; the placement must
        // avoid the excluded node.
        let excluded: FxHashSet<GridNode> = [GridNode::new(0, 0)].into_iter().collect();
        let placement = placer.place(&circuit, &excluded, None).unwrap();
        assert!(!placement.used.contains(&GridNode::new(0, 0)));
        assert_eq!(placement.used.len(), 2);
    }

    #[test]
    fn test_non_adjacent_gate_routed() {
        let topology = GridTopology::square(3);
        let placer = placer(&topology);

        // Indices 0 and 8 are opposite corners.
        let mut circuit = Circuit::with_size("far", 9, 0);
        circuit.cx(QubitId(0), QubitId(8)).unwrap();

        let placement = placer.place(&circuit, &FxHashSet::default(), None).unwrap();
        // The fast path fails and a 2-node line is placed instead.
        assert_eq!(placement.used.len(), 2);
        let ops = placement.circuit.ops();
        assert_eq!(ops.len(), 1);
    }

    #[test]
    fn test_multi_measure_split_on_slow_path() {
        let topology = GridTopology::square(3);
        let placer = placer(&topology);

        let excluded: FxHashSet<GridNode> = [GridNode::new(0, 0)].into_iter().collect();
        let mut circuit = Circuit::with_size("m", 2, 2);
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        circuit.measure_all("m").unwrap();

        let placement = placer.place(&circuit, &excluded, None).unwrap();
        let keys = placement.circuit.measurement_keys();
        assert_eq!(keys, vec!["m.q0".to_string(), "m.q1".to_string()]);
    }

    #[test]
    fn test_colliding_split_keys_are_duplicates() {
        use alsvid_ir::ClbitId;

        let topology = GridTopology::square(3);
        let placer = placer(&topology);
        // Force the slow path so the multi-qubit measurement is split.
        let excluded: FxHashSet<GridNode> = [GridNode::new(0, 0)].into_iter().collect();

        // "m.q1" collides with the split form of the "m" measurement.
        let mut circuit = Circuit::with_size("dup", 2, 3);
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        circuit.measure("m.q1", QubitId(0), ClbitId(2)).unwrap();
        let many = Instruction::measure_many(
            "m",
            [QubitId(0), QubitId(1)],
            [ClbitId(0), ClbitId(1)],
        )
        .unwrap();
        circuit.append(many).unwrap();

        let err = placer.place(&circuit, &excluded, None);
        assert!(matches!(err, Err(PlaceError::DuplicateKey(_))));
    }

    #[test]
    fn test_too_wide_fails() {
        let topology = GridTopology::square(2);
        let placer = placer(&topology);

        let mut circuit = Circuit::with_size("wide", 5, 0);
        for i in 0..4 {
            circuit.cx(QubitId(i), QubitId(i + 1)).unwrap();
        }

        let err = placer.place(&circuit, &FxHashSet::default(), None);
        assert!(matches!(err, Err(PlaceError::NoPlacement { needed: 5 })));
    }

    #[test]
    fn test_continuation_disjoint() {
        let topology = GridTopology::square(3);
        let placer = placer(&topology);
        let excluded: FxHashSet<GridNode> = [GridNode::new(0, 0)].into_iter().collect();

        let mut circuit = Circuit::with_size("c", 2, 0);
        circuit.cx(QubitId(0), QubitId(1)).unwrap();

        let first = placer.place(&circuit, &excluded, None).unwrap();
        let mut excluded2 = excluded.clone();
        excluded2.extend(first.used.iter().copied());
        let second = placer
            .place(&circuit, &excluded2, first.next_start)
            .unwrap();
        assert!(first.used.is_disjoint(&second.used));
    }

    #[test]
    fn test_index_prefix() {
        let circuit = Circuit::bell().unwrap();
        let prefixed = with_index_prefix(&circuit, 4).unwrap();
        assert_eq!(prefixed.measurement_keys(), vec!["4.m".to_string()]);
    }

    proptest! {
        // Same topology, exclusions and circuit always give the same mapping.
        #[test]
        fn placement_is_deterministic(n in 2u32..5) {
            let topology = GridTopology::square(3);
            let placer = placer(&topology);
            let excluded: FxHashSet<GridNode> = [GridNode::new(0, 1)].into_iter().collect();

            let circuit = Circuit::ghz(n).unwrap();
            let a = placer.place(&circuit, &excluded, None).unwrap();
            let b = placer.place(&circuit, &excluded, None).unwrap();
            prop_assert_eq!(a.circuit, b.circuit);
            prop_assert_eq!(a.next_start, b.next_start);
        }
    }
}
