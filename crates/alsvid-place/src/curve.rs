//! Deterministic traversal curves over the device grid.
//!
//! A traversal curve is a successor map: each node links to the next node
//! along a fixed walk of the grid. The line search follows this walk, so
//! the curve is the sole source of placement order and placement stays
//! reproducible across workers.

use alsvid_hal::{GridNode, GridTopology};
use rustc_hash::FxHashMap;

/// A fixed walk over grid nodes, stored as a successor map.
#[derive(Debug, Clone)]
pub struct TraversalCurve {
    next: FxHashMap<GridNode, GridNode>,
    start: GridNode,
}

impl TraversalCurve {
    /// Build a curve from an explicit node sequence.
    pub fn from_sequence(nodes: &[GridNode]) -> Option<Self> {
        let start = *nodes.first()?;
        let next = nodes.windows(2).map(|w| (w[0], w[1])).collect();
        Some(Self { next, start })
    }

    /// The level-2 Hilbert walk used on the reference device.
    ///
    /// The step rule is hard-coded: each entry moves one unit right (1),
    /// up (2), left (-1) or down (-2), starting from (5, 3). Sixteen
    /// nodes in total.
    pub fn hilbert_l2() -> Self {
        let rule: [i8; 15] = [1, 2, -1, 2, 2, 1, -2, 1, 2, 1, -2, -2, -1, -2, 1];
        let start = GridNode::new(5, 3);

        let mut next = FxHashMap::default();
        let mut node = start;
        for step in rule {
            let (drow, dcol) = match step {
                1 => (0, 1),
                2 => (-1, 0),
                -1 => (0, -1),
                _ => (1, 0),
            };
            let successor = node.offset(drow, dcol);
            next.insert(node, successor);
            node = successor;
        }
        Self { next, start }
    }

    /// A boustrophedon walk over a topology's bounding box.
    ///
    /// Rows are walked left-to-right and right-to-left alternately, so
    /// consecutive curve nodes are always grid-adjacent. Nodes absent
    /// from the topology still appear in the walk; the line search
    /// treats them like excluded nodes.
    pub fn serpentine(topology: &GridTopology) -> Option<Self> {
        let (min, max) = topology.bounds()?;
        let mut nodes = Vec::new();
        for row in min.row..=max.row {
            let cols: Vec<i32> = if (row - min.row) % 2 == 0 {
                (min.col..=max.col).collect()
            } else {
                (min.col..=max.col).rev().collect()
            };
            for col in cols {
                nodes.push(GridNode::new(row, col));
            }
        }
        Self::from_sequence(&nodes)
    }

    /// First node of the walk.
    pub fn start(&self) -> GridNode {
        self.start
    }

    /// Node following `node` on the walk, if any.
    pub fn successor(&self, node: &GridNode) -> Option<GridNode> {
        self.next.get(node).copied()
    }

    /// Number of links in the successor map.
    pub fn len(&self) -> usize {
        self.next.len()
    }

    /// Check whether the curve has no links.
    pub fn is_empty(&self) -> bool {
        self.next.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hilbert_l2_shape() {
        let curve = TraversalCurve::hilbert_l2();
        assert_eq!(curve.start(), GridNode::new(5, 3));
        assert_eq!(curve.len(), 15);

        // Walk the full curve: 16 distinct nodes, consecutive ones adjacent.
        let mut seen = vec![curve.start()];
        let mut node = curve.start();
        while let Some(next) = curve.successor(&node) {
            assert!(node.is_adjacent(&next));
            assert!(!seen.contains(&next));
            seen.push(next);
            node = next;
        }
        assert_eq!(seen.len(), 16);
    }

    #[test]
    fn test_serpentine_covers_grid() {
        let topology = GridTopology::square(3);
        let curve = TraversalCurve::serpentine(&topology).unwrap();
        assert_eq!(curve.start(), GridNode::new(0, 0));
        assert_eq!(curve.len(), 8);

        let mut node = curve.start();
        let mut count = 1;
        while let Some(next) = curve.successor(&node) {
            assert!(node.is_adjacent(&next));
            node = next;
            count += 1;
        }
        assert_eq!(count, 9);
    }

    #[test]
    fn test_empty_topology_has_no_curve() {
        let topology = GridTopology::new(std::iter::empty());
        assert!(TraversalCurve::serpentine(&topology).is_none());
    }
}
