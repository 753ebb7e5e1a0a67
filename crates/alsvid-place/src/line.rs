//! Contiguous line search along a traversal curve.

use alsvid_hal::{GridNode, GridTopology};
use rustc_hash::FxHashSet;

use crate::curve::TraversalCurve;
use crate::error::{PlaceError, PlaceResult};

/// A found line and the curve node to resume from next time.
#[derive(Debug, Clone)]
pub struct Line {
    /// Contiguous grid nodes, in curve order.
    pub nodes: Vec<GridNode>,
    /// Successor of the last line node, carried between searches so
    /// consecutive placements consume successive curve segments.
    pub next_start: Option<GridNode>,
}

/// Walk the curve from `start` until a contiguous run of `length`
/// usable nodes accumulates.
///
/// A node that is excluded or missing from the topology clears the
/// accumulated run instead of being skipped: the nodes before it are
/// discarded and the search restarts at the node after it. Adjacency
/// within the returned line must be unbroken, and a cleared prefix can
/// never rejoin the run across the gap.
pub fn line_search(
    curve: &TraversalCurve,
    start: GridNode,
    length: usize,
    topology: &GridTopology,
    excluded: &FxHashSet<GridNode>,
) -> PlaceResult<Line> {
    if length == 0 {
        return Ok(Line {
            nodes: vec![],
            next_start: Some(start),
        });
    }

    let mut run: Vec<GridNode> = Vec::new();
    let mut node = Some(start);

    while let Some(n) = node {
        if topology.contains(&n) && !excluded.contains(&n) {
            run.push(n);
            if run.len() == length {
                return Ok(Line {
                    next_start: curve.successor(&n),
                    nodes: run,
                });
            }
        } else {
            run.clear();
        }
        node = curve.successor(&n);
    }

    Err(PlaceError::NoPlacement { needed: length })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve_and_grid() -> (TraversalCurve, GridTopology) {
        let topology = GridTopology::square(3);
        let curve = TraversalCurve::serpentine(&topology).unwrap();
        (curve, topology)
    }

    #[test]
    fn test_line_from_start() {
        let (curve, topology) = curve_and_grid();
        let line = line_search(&curve, curve.start(), 3, &topology, &FxHashSet::default()).unwrap();
        assert_eq!(
            line.nodes,
            vec![GridNode::new(0, 0), GridNode::new(0, 1), GridNode::new(0, 2)]
        );
        assert_eq!(line.next_start, Some(GridNode::new(1, 2)));
    }

    #[test]
    fn test_excluded_node_clears_prefix() {
        let (curve, topology) = curve_and_grid();
        // (0,1) is second on the curve; the run restarts after it.
        let excluded: FxHashSet<GridNode> = [GridNode::new(0, 1)].into_iter().collect();
        let line = line_search(&curve, curve.start(), 3, &topology, &excluded).unwrap();
        assert_eq!(
            line.nodes,
            vec![GridNode::new(0, 2), GridNode::new(1, 2), GridNode::new(1, 1)]
        );
    }

    #[test]
    fn test_excluded_node_never_skipped() {
        let (curve, topology) = curve_and_grid();
        let excluded: FxHashSet<GridNode> = [GridNode::new(0, 1)].into_iter().collect();
        let line = line_search(&curve, curve.start(), 3, &topology, &excluded).unwrap();
        // The prefix before the excluded node must not survive.
        assert!(!line.nodes.contains(&GridNode::new(0, 0)));
        assert!(!line.nodes.contains(&GridNode::new(0, 1)));
    }

    #[test]
    fn test_too_long_fails() {
        let (curve, topology) = curve_and_grid();
        let err = line_search(&curve, curve.start(), 10, &topology, &FxHashSet::default());
        assert!(matches!(err, Err(PlaceError::NoPlacement { needed: 10 })));
    }

    #[test]
    fn test_resume_from_context() {
        let (curve, topology) = curve_and_grid();
        let excluded = FxHashSet::default();
        let first = line_search(&curve, curve.start(), 2, &topology, &excluded).unwrap();
        let second = line_search(
            &curve,
            first.next_start.unwrap(),
            2,
            &topology,
            &excluded,
        )
        .unwrap();
        // Segments are disjoint and consecutive along the curve.
        assert!(first.nodes.iter().all(|n| !second.nodes.contains(n)));
        assert_eq!(second.nodes[0], GridNode::new(0, 2));
    }

    #[test]
    fn test_zero_length() {
        let (curve, topology) = curve_and_grid();
        let line = line_search(&curve, curve.start(), 0, &topology, &FxHashSet::default()).unwrap();
        assert!(line.nodes.is_empty());
    }
}
