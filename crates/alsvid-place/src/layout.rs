//! Logical-to-physical qubit mapping.

use alsvid_ir::QubitId;
use rustc_hash::FxHashMap;

/// A bijective mapping between logical qubits and physical topology
/// indices, mutated as the router inserts swaps.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    logical_to_physical: FxHashMap<QubitId, u32>,
    physical_to_logical: FxHashMap<u32, QubitId>,
}

impl Layout {
    /// Create an empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a layout from (logical, physical) pairs.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (QubitId, u32)>) -> Self {
        let mut layout = Self::new();
        for (logical, physical) in pairs {
            layout.insert(logical, physical);
        }
        layout
    }

    /// Map a logical qubit to a physical index.
    pub fn insert(&mut self, logical: QubitId, physical: u32) {
        self.logical_to_physical.insert(logical, physical);
        self.physical_to_logical.insert(physical, logical);
    }

    /// Physical index of a logical qubit.
    pub fn get_physical(&self, logical: QubitId) -> Option<u32> {
        self.logical_to_physical.get(&logical).copied()
    }

    /// Logical qubit at a physical index.
    pub fn get_logical(&self, physical: u32) -> Option<QubitId> {
        self.physical_to_logical.get(&physical).copied()
    }

    /// Exchange the logical qubits at two physical indices.
    ///
    /// Either side may be unoccupied; a swap with an empty position
    /// moves the occupant.
    pub fn swap(&mut self, p1: u32, p2: u32) {
        let l1 = self.physical_to_logical.remove(&p1);
        let l2 = self.physical_to_logical.remove(&p2);
        if let Some(l) = l2 {
            self.physical_to_logical.insert(p1, l);
            self.logical_to_physical.insert(l, p1);
        }
        if let Some(l) = l1 {
            self.physical_to_logical.insert(p2, l);
            self.logical_to_physical.insert(l, p2);
        }
    }

    /// Number of mapped qubits.
    pub fn len(&self) -> usize {
        self.logical_to_physical.len()
    }

    /// Check whether the layout is empty.
    pub fn is_empty(&self) -> bool {
        self.logical_to_physical.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_pairs_and_lookup() {
        let layout = Layout::from_pairs([(QubitId(0), 4), (QubitId(1), 5)]);
        assert_eq!(layout.get_physical(QubitId(0)), Some(4));
        assert_eq!(layout.get_logical(5), Some(QubitId(1)));
        assert_eq!(layout.get_physical(QubitId(2)), None);
    }

    #[test]
    fn test_swap() {
        let mut layout = Layout::from_pairs([(QubitId(0), 4), (QubitId(1), 5)]);
        layout.swap(4, 5);
        assert_eq!(layout.get_physical(QubitId(0)), Some(5));
        assert_eq!(layout.get_physical(QubitId(1)), Some(4));
    }

    #[test]
    fn test_swap_with_empty_position() {
        let mut layout = Layout::from_pairs([(QubitId(0), 4)]);
        layout.swap(4, 7);
        assert_eq!(layout.get_physical(QubitId(0)), Some(7));
        assert_eq!(layout.get_logical(4), None);
    }
}
