//! Device topology types.
//!
//! Backends expose their qubits as nodes on a planar grid together with
//! the pairs that support a native two-qubit operation. Grid adjacency
//! is necessary but not sufficient for coupling: a device may omit the
//! coupler between two neighboring qubits. Placement and routing work
//! over the dense node indices assigned by [`GridTopology`], which stay
//! stable for the lifetime of the topology.

use petgraph::prelude::UnGraphMap;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

/// A qubit position on the device grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GridNode {
    pub row: i32,
    pub col: i32,
}

impl GridNode {
    /// Create a grid node.
    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Check whether another node is a Manhattan neighbor.
    pub fn is_adjacent(&self, other: &GridNode) -> bool {
        (self.row - other.row).abs() + (self.col - other.col).abs() == 1
    }

    /// The node one step away in a given (row, col) direction.
    pub fn offset(&self, drow: i32, dcol: i32) -> GridNode {
        GridNode {
            row: self.row + drow,
            col: self.col + dcol,
        }
    }
}

impl std::fmt::Display for GridNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// The set of qubits a backend exposes, with dense index assignment and
/// the native coupler pairs between them.
///
/// Indices are assigned in (row, col) order and double as the physical
/// qubit ids of placed circuits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "TopologyData", from = "TopologyData")]
pub struct GridTopology {
    nodes: Vec<GridNode>,
    index: FxHashMap<GridNode, u32>,
    couplers: FxHashSet<(GridNode, GridNode)>,
}

/// Wire form of a topology.
#[derive(Serialize, Deserialize)]
struct TopologyData {
    nodes: Vec<GridNode>,
    couplers: Vec<(GridNode, GridNode)>,
}

impl From<TopologyData> for GridTopology {
    fn from(data: TopologyData) -> Self {
        Self::with_couplers(data.nodes, data.couplers)
    }
}

impl From<GridTopology> for TopologyData {
    fn from(topology: GridTopology) -> Self {
        let mut couplers: Vec<(GridNode, GridNode)> =
            topology.couplers.into_iter().collect();
        couplers.sort_unstable();
        TopologyData {
            nodes: topology.nodes,
            couplers,
        }
    }
}

/// Order a coupler pair canonically.
fn coupler_key(a: GridNode, b: GridNode) -> (GridNode, GridNode) {
    if a <= b { (a, b) } else { (b, a) }
}

#[allow(clippy::cast_possible_truncation)]
impl GridTopology {
    /// Build a fully coupled topology: every pair of Manhattan-adjacent
    /// nodes carries a native coupler. Duplicates are dropped.
    pub fn new(nodes: impl IntoIterator<Item = GridNode>) -> Self {
        let mut topology = Self::with_couplers(nodes, []);
        let mut couplers = FxHashSet::default();
        for &n in &topology.nodes {
            for m in [n.offset(0, 1), n.offset(1, 0)] {
                if topology.contains(&m) {
                    couplers.insert(coupler_key(n, m));
                }
            }
        }
        topology.couplers = couplers;
        topology
    }

    /// Build a topology with an explicit native coupler set.
    ///
    /// Pairs that are not Manhattan-adjacent or reference a node outside
    /// the set are dropped.
    pub fn with_couplers(
        nodes: impl IntoIterator<Item = GridNode>,
        couplers: impl IntoIterator<Item = (GridNode, GridNode)>,
    ) -> Self {
        let set: std::collections::BTreeSet<GridNode> = nodes.into_iter().collect();
        let nodes: Vec<GridNode> = set.into_iter().collect();
        let index: FxHashMap<GridNode, u32> = nodes
            .iter()
            .enumerate()
            .map(|(i, &n)| (n, i as u32))
            .collect();
        let couplers = couplers
            .into_iter()
            .filter(|(a, b)| {
                a.is_adjacent(b) && index.contains_key(a) && index.contains_key(b)
            })
            .map(|(a, b)| coupler_key(a, b))
            .collect();
        Self {
            nodes,
            index,
            couplers,
        }
    }

    /// Build an n-by-n square grid starting at (0, 0).
    pub fn square(n: i32) -> Self {
        Self::new((0..n).flat_map(|row| (0..n).map(move |col| GridNode::new(row, col))))
    }

    /// Number of nodes.
    pub fn num_nodes(&self) -> u32 {
        self.nodes.len() as u32
    }

    /// All nodes in index order.
    pub fn nodes(&self) -> &[GridNode] {
        &self.nodes
    }

    /// Check whether a node exists on the device.
    pub fn contains(&self, node: &GridNode) -> bool {
        self.index.contains_key(node)
    }

    /// Dense index of a node.
    pub fn index_of(&self, node: &GridNode) -> Option<u32> {
        self.index.get(node).copied()
    }

    /// Node at a dense index.
    pub fn node_at(&self, index: u32) -> Option<GridNode> {
        self.nodes.get(index as usize).copied()
    }

    /// Device neighbors of a node, in index order.
    pub fn neighbors(&self, node: &GridNode) -> Vec<GridNode> {
        [(-1, 0), (0, -1), (0, 1), (1, 0)]
            .iter()
            .map(|&(dr, dc)| node.offset(dr, dc))
            .filter(|n| self.contains(n))
            .collect()
    }

    /// Check whether two device nodes share a native coupler.
    ///
    /// Stricter than [`GridNode::is_adjacent`]: neighboring nodes
    /// without a coupler are not coupled.
    pub fn is_coupled(&self, a: &GridNode, b: &GridNode) -> bool {
        self.couplers.contains(&coupler_key(*a, *b))
    }

    /// Bounding box of the node set as ((min_row, min_col), (max_row, max_col)).
    pub fn bounds(&self) -> Option<(GridNode, GridNode)> {
        let min_row = self.nodes.iter().map(|n| n.row).min()?;
        let max_row = self.nodes.iter().map(|n| n.row).max()?;
        let min_col = self.nodes.iter().map(|n| n.col).min()?;
        let max_col = self.nodes.iter().map(|n| n.col).max()?;
        Some((
            GridNode::new(min_row, min_col),
            GridNode::new(max_row, max_col),
        ))
    }

    /// Coupling graph over dense indices, restricted to available nodes.
    ///
    /// Nodes outside `available` contribute neither vertices nor edges, so
    /// routing never paths through an excluded qubit. Edges follow the
    /// native coupler set, not bare adjacency.
    pub fn connectivity(&self, available: &FxHashSet<GridNode>) -> UnGraphMap<u32, ()> {
        let mut graph = UnGraphMap::new();
        for node in &self.nodes {
            if !available.contains(node) {
                continue;
            }
            let i = self.index[node];
            graph.add_node(i);
            for neighbor in self.neighbors(node) {
                if available.contains(&neighbor) && self.is_coupled(node, &neighbor) {
                    graph.add_edge(i, self.index[&neighbor], ());
                }
            }
        }
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adjacency() {
        let a = GridNode::new(2, 3);
        assert!(a.is_adjacent(&GridNode::new(2, 4)));
        assert!(a.is_adjacent(&GridNode::new(1, 3)));
        assert!(!a.is_adjacent(&GridNode::new(3, 4)));
        assert!(!a.is_adjacent(&a));
    }

    #[test]
    fn test_square_grid() {
        let topo = GridTopology::square(3);
        assert_eq!(topo.num_nodes(), 9);
        assert_eq!(topo.index_of(&GridNode::new(0, 0)), Some(0));
        assert_eq!(topo.index_of(&GridNode::new(2, 2)), Some(8));
        assert_eq!(topo.node_at(4), Some(GridNode::new(1, 1)));
    }

    #[test]
    fn test_neighbors_clipped_at_edge() {
        let topo = GridTopology::square(2);
        let corner = GridNode::new(0, 0);
        assert_eq!(topo.neighbors(&corner).len(), 2);
    }

    #[test]
    fn test_connectivity_excludes_unavailable() {
        let topo = GridTopology::square(2);
        let available: FxHashSet<GridNode> = topo
            .nodes()
            .iter()
            .copied()
            .filter(|n| *n != GridNode::new(0, 1))
            .collect();
        let graph = topo.connectivity(&available);
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_restricted_couplers() {
        // 2x2 grid with only one of its four adjacent pairs wired.
        let nodes = GridTopology::square(2).nodes().to_vec();
        let topo = GridTopology::with_couplers(
            nodes,
            [(GridNode::new(0, 0), GridNode::new(0, 1))],
        );

        assert!(topo.is_coupled(&GridNode::new(0, 0), &GridNode::new(0, 1)));
        // Adjacent and on the device, but no native coupler.
        assert!(!topo.is_coupled(&GridNode::new(0, 0), &GridNode::new(1, 0)));

        let available: FxHashSet<GridNode> = topo.nodes().iter().copied().collect();
        let graph = topo.connectivity(&available);
        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_invalid_couplers_dropped() {
        let topo = GridTopology::with_couplers(
            [GridNode::new(0, 0), GridNode::new(0, 1), GridNode::new(1, 1)],
            [
                // Diagonal: not adjacent.
                (GridNode::new(0, 0), GridNode::new(1, 1)),
                // Off-device endpoint.
                (GridNode::new(0, 1), GridNode::new(0, 2)),
            ],
        );
        assert!(!topo.is_coupled(&GridNode::new(0, 0), &GridNode::new(1, 1)));
        assert!(!topo.is_coupled(&GridNode::new(0, 1), &GridNode::new(0, 2)));
    }

    #[test]
    fn test_coupler_order_irrelevant() {
        let topo = GridTopology::square(2);
        let a = GridNode::new(0, 0);
        let b = GridNode::new(0, 1);
        assert!(topo.is_coupled(&a, &b));
        assert!(topo.is_coupled(&b, &a));
    }

    #[test]
    fn test_irregular_topology() {
        // L-shaped device
        let topo = GridTopology::new(vec![
            GridNode::new(0, 0),
            GridNode::new(1, 0),
            GridNode::new(1, 1),
        ]);
        assert!(topo.is_coupled(&GridNode::new(0, 0), &GridNode::new(1, 0)));
        assert!(!topo.is_coupled(&GridNode::new(0, 0), &GridNode::new(1, 1)));
        assert!(!topo.is_coupled(&GridNode::new(0, 0), &GridNode::new(0, 1)));
    }
}
