//! Greedy swap routing onto a restricted coupling graph.

use alsvid_ir::{Circuit, Instruction, InstructionKind, QubitId, StandardGate};
use petgraph::prelude::UnGraphMap;

use crate::error::{PlaceError, PlaceResult};
use crate::layout::Layout;

/// Rewrite a logical circuit into a physical one over `graph`.
///
/// Every logical qubit must already be mapped in `layout`. Two-qubit
/// gates on non-coupled pairs get swap chains inserted along a shortest
/// path; the layout is updated as qubits move. The graph is restricted
/// to the nodes the caller allows, so routing never touches a qubit
/// outside that set.
pub fn route(
    circuit: &Circuit,
    layout: &mut Layout,
    graph: &UnGraphMap<u32, ()>,
    num_physical: u32,
) -> PlaceResult<Circuit> {
    let mut routed = Circuit::with_size(circuit.name(), num_physical, circuit.num_clbits());

    for instruction in circuit.ops() {
        match &instruction.kind {
            InstructionKind::Gate(gate) if instruction.qubits.len() == 2 => {
                let p0 = physical(layout, instruction.qubits[0])?;
                let p1 = physical(layout, instruction.qubits[1])?;

                if !graph.contains_edge(p0, p1) {
                    let path = find_path(graph, p0, p1)?;
                    for window in path.windows(2).take(path.len() - 2) {
                        routed.append(Instruction::two_qubit_gate(
                            StandardGate::Swap,
                            QubitId(window[0]),
                            QubitId(window[1]),
                        ))?;
                        layout.swap(window[0], window[1]);
                    }
                }

                let p0 = physical(layout, instruction.qubits[0])?;
                let p1 = physical(layout, instruction.qubits[1])?;
                routed.append(Instruction::two_qubit_gate(*gate, QubitId(p0), QubitId(p1)))?;
            }
            _ => {
                let mut mapped = instruction.clone();
                for q in &mut mapped.qubits {
                    *q = QubitId(physical(layout, *q)?);
                }
                routed.append(mapped)?;
            }
        }
    }

    Ok(routed)
}

fn physical(layout: &Layout, logical: QubitId) -> PlaceResult<u32> {
    layout
        .get_physical(logical)
        .ok_or_else(|| PlaceError::Validation(format!("logical qubit {logical} has no mapping")))
}

/// Shortest path between two physical qubits by breadth-first search.
fn find_path(graph: &UnGraphMap<u32, ()>, from: u32, to: u32) -> PlaceResult<Vec<u32>> {
    use std::collections::VecDeque;

    use rustc_hash::FxHashMap;

    if from == to {
        return Ok(vec![from]);
    }

    let mut visited: FxHashMap<u32, Option<u32>> = FxHashMap::default();
    let mut queue = VecDeque::new();

    visited.insert(from, None);
    queue.push_back(from);

    while let Some(current) = queue.pop_front() {
        for neighbor in graph.neighbors(current) {
            if visited.contains_key(&neighbor) {
                continue;
            }

            visited.insert(neighbor, Some(current));

            if neighbor == to {
                let mut path = vec![to];
                let mut node = to;
                while let Some(Some(prev)) = visited.get(&node) {
                    path.push(*prev);
                    node = *prev;
                }
                path.reverse();
                return Ok(path);
            }

            queue.push_back(neighbor);
        }
    }

    Err(PlaceError::RoutingFailed { from, to })
}
