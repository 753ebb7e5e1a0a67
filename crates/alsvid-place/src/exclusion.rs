//! Calibration-driven exclusion sets.

use alsvid_hal::{Calibration, GridNode};
use rustc_hash::FxHashSet;

/// Nodes whose leading metric value exceeds `threshold` for any metric.
///
/// Every node referenced by an offending entry is excluded, so a bad
/// two-qubit pair removes both of its qubits from placement.
pub fn faulty_nodes(calibration: &Calibration, threshold: f64) -> FxHashSet<GridNode> {
    let mut nodes = FxHashSet::default();
    for metric in calibration.metric_names() {
        let Some(entries) = calibration.metric(metric) else {
            continue;
        };
        for entry in entries {
            if entry.latest().is_some_and(|value| value > threshold) {
                nodes.extend(entry.targets.iter().copied());
            }
        }
    }
    nodes
}

#[cfg(test)]
mod tests {
    use alsvid_hal::CalibrationEntry;

    use super::*;

    #[test]
    fn test_threshold_filtering() {
        let mut cal = Calibration::new();
        cal.insert(
            "two_qubit_error",
            CalibrationEntry::new(vec![GridNode::new(0, 0), GridNode::new(0, 1)], vec![30.0]),
        );
        cal.insert(
            "two_qubit_error",
            CalibrationEntry::new(vec![GridNode::new(1, 0), GridNode::new(1, 1)], vec![5.0]),
        );
        cal.insert(
            "readout_error",
            CalibrationEntry::new(vec![GridNode::new(2, 2)], vec![26.0]),
        );

        let faulty = faulty_nodes(&cal, 25.0);
        // Both qubits of the bad pair are excluded, not just the first.
        assert!(faulty.contains(&GridNode::new(0, 0)));
        assert!(faulty.contains(&GridNode::new(0, 1)));
        assert!(faulty.contains(&GridNode::new(2, 2)));
        assert!(!faulty.contains(&GridNode::new(1, 0)));
        assert_eq!(faulty.len(), 3);
    }

    #[test]
    fn test_empty_calibration() {
        assert!(faulty_nodes(&Calibration::new(), 25.0).is_empty());
    }

    #[test]
    fn test_value_at_threshold_kept() {
        let mut cal = Calibration::new();
        cal.insert(
            "readout_error",
            CalibrationEntry::new(vec![GridNode::new(0, 0)], vec![25.0]),
        );
        assert!(faulty_nodes(&cal, 25.0).is_empty());
    }
}
