//! Simulator backend implementation.

use std::sync::Arc;

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use tokio::sync::Mutex;
use tracing::debug;

use alsvid_hal::{
    Backend, BatchId, BatchStatus, Calibration, GridTopology, HalError, HalResult, Readout,
};
use alsvid_ir::{Circuit, InstructionKind};

use crate::statevector::{Statevector, outcome_bits};

/// Default qubit cap: statevector memory doubles per qubit.
const DEFAULT_MAX_QUBITS: usize = 20;

/// A completed (or failed) batch held by the simulator.
struct SimBatch {
    status: BatchStatus,
    readouts: Vec<Readout>,
}

/// Statevector simulator backend.
///
/// Executes circuits by full statevector evolution and samples
/// measurement outcomes per shot. Batches run eagerly at submission
/// time; `status()` reports the stored terminal state.
pub struct SimBackend {
    name: String,
    topology: GridTopology,
    calibration: Calibration,
    max_qubits: usize,
    batches: Arc<Mutex<FxHashMap<String, SimBatch>>>,
}

impl SimBackend {
    /// Create a simulator over the given grid.
    pub fn new(topology: GridTopology) -> Self {
        Self {
            name: "sim".to_string(),
            topology,
            calibration: Calibration::new(),
            max_qubits: DEFAULT_MAX_QUBITS,
            batches: Arc::new(Mutex::new(FxHashMap::default())),
        }
    }

    /// Create a simulator over an n×n grid.
    pub fn square(n: i32) -> Self {
        Self::new(GridTopology::square(n))
    }

    /// Replace the calibration snapshot reported by this backend.
    pub fn with_calibration(mut self, calibration: Calibration) -> Self {
        self.calibration = calibration;
        self
    }

    /// Override the qubit cap.
    pub fn with_max_qubits(mut self, max_qubits: usize) -> Self {
        self.max_qubits = max_qubits;
        self
    }

    /// Execute one circuit for the given number of shots.
    fn execute(&self, circuit: &Circuit, repetitions: u32) -> HalResult<Readout> {
        let num_qubits = circuit.num_qubits() as usize;
        if num_qubits > self.max_qubits {
            return Err(HalError::CircuitTooLarge(format!(
                "{num_qubits} qubits exceeds simulator limit of {}",
                self.max_qubits
            )));
        }

        // Measurement keys and the qubits they observe, in program order.
        let measures: Vec<(&str, Vec<usize>)> = circuit
            .ops()
            .iter()
            .filter_map(|op| match &op.kind {
                InstructionKind::Measure { key } => Some((
                    key.as_str(),
                    op.qubits.iter().map(|q| q.0 as usize).collect(),
                )),
                _ => None,
            })
            .collect();

        let mut readout = Readout::new(repetitions);
        for _ in 0..repetitions {
            let mut state = Statevector::new(num_qubits);
            for op in circuit.ops() {
                state.apply(op);
            }
            let outcome = state.sample();
            for (key, qubits) in &measures {
                readout
                    .counts
                    .entry((*key).to_string())
                    .or_default()
                    .record(outcome_bits(outcome, qubits));
            }
        }

        debug!(
            circuit = circuit.name(),
            repetitions,
            keys = measures.len(),
            "executed circuit"
        );
        Ok(readout)
    }
}

#[async_trait]
impl Backend for SimBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn topology(&self) -> &GridTopology {
        &self.topology
    }

    async fn calibration(&self) -> HalResult<Calibration> {
        Ok(self.calibration.clone())
    }

    async fn run(&self, circuit: &Circuit, repetitions: u32) -> HalResult<Readout> {
        if repetitions == 0 {
            return Err(HalError::InvalidRepetitions(
                "repetitions must be positive".to_string(),
            ));
        }
        self.execute(circuit, repetitions)
    }

    async fn submit_batch(&self, circuits: &[Circuit], repetitions: u32) -> HalResult<BatchId> {
        if circuits.is_empty() {
            return Err(HalError::SubmissionFailed("empty batch".to_string()));
        }
        if repetitions == 0 {
            return Err(HalError::InvalidRepetitions(
                "repetitions must be positive".to_string(),
            ));
        }

        let id = BatchId::generate();

        // Execute eagerly; the batch is terminal before submit returns,
        // which keeps the poll-based lifecycle observable in tests.
        let mut readouts = Vec::with_capacity(circuits.len());
        let mut failure = None;
        for circuit in circuits {
            match self.execute(circuit, repetitions) {
                Ok(readout) => readouts.push(readout),
                Err(err) => {
                    failure = Some(err.to_string());
                    break;
                }
            }
        }

        let batch = match failure {
            None => SimBatch {
                status: BatchStatus::Success,
                readouts,
            },
            Some(msg) => SimBatch {
                status: BatchStatus::Failure(msg),
                readouts: Vec::new(),
            },
        };

        debug!(batch = %id, circuits = circuits.len(), "batch submitted");
        self.batches.lock().await.insert(id.0.clone(), batch);
        Ok(id)
    }

    async fn status(&self, batch: &BatchId) -> HalResult<BatchStatus> {
        let batches = self.batches.lock().await;
        let entry = batches
            .get(&batch.0)
            .ok_or_else(|| HalError::BatchNotFound(batch.0.clone()))?;
        Ok(entry.status.clone())
    }

    async fn results(&self, batch: &BatchId) -> HalResult<Vec<Readout>> {
        let batches = self.batches.lock().await;
        let entry = batches
            .get(&batch.0)
            .ok_or_else(|| HalError::BatchNotFound(batch.0.clone()))?;
        match &entry.status {
            BatchStatus::Success => Ok(entry.readouts.clone()),
            BatchStatus::Failure(msg) => Err(HalError::BatchFailed(msg.clone())),
            BatchStatus::Pending => Err(HalError::BatchNotFinished(batch.0.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bell_counts() {
        let backend = SimBackend::square(2);
        let circuit = Circuit::bell().unwrap();

        let readout = backend.run(&circuit, 100).await.unwrap();
        let counts = readout.key("m").unwrap();

        // Bell state: only 00 and 11 appear
        assert_eq!(counts.get("00") + counts.get("11"), 100);
        assert_eq!(counts.get("01"), 0);
        assert_eq!(counts.get("10"), 0);
    }

    #[tokio::test]
    async fn test_deterministic_x() {
        let backend = SimBackend::square(2);
        let mut circuit = Circuit::with_size("x", 1, 1);
        circuit.x(alsvid_ir::QubitId(0)).unwrap();
        circuit
            .measure("m", alsvid_ir::QubitId(0), alsvid_ir::ClbitId(0))
            .unwrap();

        let readout = backend.run(&circuit, 50).await.unwrap();
        assert_eq!(readout.key("m").unwrap().get("1"), 50);
    }

    #[tokio::test]
    async fn test_batch_lifecycle() {
        let backend = SimBackend::square(2);
        let circuits = vec![Circuit::bell().unwrap(), Circuit::bell().unwrap()];

        let id = backend.submit_batch(&circuits, 10).await.unwrap();
        assert_eq!(backend.status(&id).await.unwrap(), BatchStatus::Success);

        let readouts = backend.results(&id).await.unwrap();
        assert_eq!(readouts.len(), 2);
        assert_eq!(readouts[0].key("m").unwrap().total(), 10);
    }

    #[tokio::test]
    async fn test_unknown_batch() {
        let backend = SimBackend::square(2);
        let missing = BatchId("nope".to_string());

        assert!(matches!(
            backend.status(&missing).await,
            Err(HalError::BatchNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_too_many_qubits() {
        let backend = SimBackend::square(2).with_max_qubits(3);
        let circuit = Circuit::ghz(4).unwrap();

        assert!(matches!(
            backend.run(&circuit, 10).await,
            Err(HalError::CircuitTooLarge(_))
        ));
    }

    #[tokio::test]
    async fn test_zero_repetitions_rejected() {
        let backend = SimBackend::square(2);
        assert!(matches!(
            backend.run(&Circuit::bell().unwrap(), 0).await,
            Err(HalError::InvalidRepetitions(_))
        ));
    }

    #[tokio::test]
    async fn test_wait_returns_results() {
        let backend = SimBackend::square(2);
        let id = backend
            .submit_batch(&[Circuit::bell().unwrap()], 5)
            .await
            .unwrap();

        let readouts = backend.wait(&id).await.unwrap();
        assert_eq!(readouts.len(), 1);
    }
}
