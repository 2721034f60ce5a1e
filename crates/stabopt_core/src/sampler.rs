//! Monte-Carlo sampling of detector and observable flips.
//!
//! A shot runs the circuit once on a [`PauliFrame`], letting a
//! [`FaultSource`] decide which Paulis each noise channel inserts. Detector
//! and observable bits are parities of measurement flips, i.e. differences
//! from the noiseless reference run.

use crate::circuit::CircuitModel;
use crate::error::{Result, StabOptError};
use crate::pauli_frame::PauliFrame;
use bitvec::prelude::*;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use stabopt_common::gate::{GateKind, Operation};

/// Packed bits of one shot.
pub type ShotBits = BitVec<u64, Lsb0>;

/// Detector and observable flips of a batch of shots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleBatch {
    pub num_detectors: usize,
    pub num_observables: usize,
    pub detectors: Vec<ShotBits>,
    pub observables: Vec<ShotBits>,
}

impl SampleBatch {
    pub fn shots(&self) -> usize {
        self.detectors.len()
    }
}

/// Samples `shots` independent runs of a noisy circuit.
///
/// `seed` selects the random stream, so equal seeds give equal batches.
pub trait Simulator: Sync {
    fn simulate(&self, circuit: &CircuitModel, shots: usize, seed: u64) -> Result<SampleBatch>;
}

/// Decides the Pauli inserted by each noise channel target.
pub trait FaultSource {
    /// Called once per noise operation, with its position in the circuit.
    fn apply(&mut self, index: usize, op: &Operation, frame: &mut PauliFrame);
}

/// Pauli bits of the three non-identity single-qubit Paulis: X, Y, Z.
const PAULIS: [(bool, bool); 3] = [(true, false), (true, true), (false, true)];

/// `(x, z)` bits of the Pauli encoded as 0=I, 1=X, 2=Y, 3=Z.
pub(crate) fn pauli_bits(code: usize) -> (bool, bool) {
    match code {
        1 => PAULIS[0],
        2 => PAULIS[1],
        3 => PAULIS[2],
        _ => (false, false),
    }
}

/// Draws faults from the channel probabilities.
pub struct RandomFaults<R> {
    pub rng: R,
}

impl<R: Rng> FaultSource for RandomFaults<R> {
    fn apply(&mut self, _index: usize, op: &Operation, frame: &mut PauliFrame) {
        let p = op.probability().unwrap_or(0.0);
        if p <= 0.0 {
            return;
        }
        match op.kind {
            GateKind::X_ERROR => {
                for &q in &op.qubits {
                    if self.rng.gen_bool(p) {
                        frame.apply_pauli(q, true, false);
                    }
                }
            }
            GateKind::Z_ERROR => {
                for &q in &op.qubits {
                    if self.rng.gen_bool(p) {
                        frame.apply_pauli(q, false, true);
                    }
                }
            }
            GateKind::DEPOLARIZE1 => {
                for &q in &op.qubits {
                    if self.rng.gen_bool(p) {
                        let (x, z) = pauli_bits(self.rng.gen_range(1..4));
                        frame.apply_pauli(q, x, z);
                    }
                }
            }
            GateKind::DEPOLARIZE2 => {
                for pair in op.qubits.chunks_exact(2) {
                    if self.rng.gen_bool(p) {
                        let code = self.rng.gen_range(1..16);
                        let (x0, z0) = pauli_bits(code / 4);
                        let (x1, z1) = pauli_bits(code % 4);
                        frame.apply_pauli(pair[0], x0, z0);
                        frame.apply_pauli(pair[1], x1, z1);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Flips of one shot, before packing.
pub(crate) struct ShotFlips {
    pub detectors: Vec<bool>,
    pub observables: Vec<bool>,
}

/// Runs the circuit once from operation `start`, with no faults before it.
///
/// Measurements before `start` are recorded as unflipped, and detectors or
/// observables declared before `start` stay clear.
pub(crate) fn run_shot<F: FaultSource>(
    circuit: &CircuitModel,
    start: usize,
    num_observables: usize,
    faults: &mut F,
) -> ShotFlips {
    let ops = circuit.operations();
    let mut frame = PauliFrame::new(circuit.num_qubits);
    let mut record: Vec<bool> = Vec::with_capacity(circuit.num_measurements());
    let mut detectors = Vec::with_capacity(circuit.num_detectors());
    let mut observables = vec![false; num_observables];

    for op in &ops[..start.min(ops.len())] {
        match op.kind {
            GateKind::M => record.push(false),
            GateKind::DETECTOR => detectors.push(false),
            _ => {}
        }
    }

    let parity = |record: &[bool], lookbacks: &[usize]| {
        lookbacks
            .iter()
            .fold(false, |acc, &k| acc ^ record[record.len() - k])
    };

    for (index, op) in ops.iter().enumerate().skip(start) {
        let q = &op.qubits;
        match op.kind {
            GateKind::H => frame.apply_hadamard(q[0]),
            GateKind::S | GateKind::S_DAG => frame.apply_phase(q[0]),
            GateKind::X | GateKind::Z => {}
            GateKind::CX => frame.apply_cnot(q[0], q[1]),
            GateKind::CZ => frame.apply_cz(q[0], q[1]),
            GateKind::CY => frame.apply_cy(q[0], q[1]),
            GateKind::SWAP => frame.apply_swap(q[0], q[1]),
            GateKind::M => record.push(frame.has_x_error(q[0])),
            GateKind::R => frame.reset_qubit(q[0]),
            GateKind::X_ERROR | GateKind::Z_ERROR | GateKind::DEPOLARIZE1 | GateKind::DEPOLARIZE2 => {
                faults.apply(index, op, &mut frame)
            }
            GateKind::DETECTOR => detectors.push(parity(&record, &op.records)),
            GateKind::OBSERVABLE_INCLUDE => {
                if let Some(i) = op.observable_index() {
                    observables[i] ^= parity(&record, &op.records);
                }
            }
            GateKind::QUBIT_COORDS | GateKind::SHIFT_COORDS => {}
        }
    }

    ShotFlips {
        detectors,
        observables,
    }
}

/// Pauli-frame sampler driven by a seeded xoshiro stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameSimulator;

impl Simulator for FrameSimulator {
    fn simulate(&self, circuit: &CircuitModel, shots: usize, seed: u64) -> Result<SampleBatch> {
        if shots == 0 {
            return Err(StabOptError::DegenerateSampling);
        }
        circuit.validate()?;

        let num_detectors = circuit.num_detectors();
        let num_observables = circuit.num_observables();
        let mut faults = RandomFaults {
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
        };
        let mut detectors = Vec::with_capacity(shots);
        let mut observables = Vec::with_capacity(shots);
        for _ in 0..shots {
            let flips = run_shot(circuit, 0, num_observables, &mut faults);
            detectors.push(flips.detectors.into_iter().collect::<ShotBits>());
            observables.push(flips.observables.into_iter().collect::<ShotBits>());
        }
        Ok(SampleBatch {
            num_detectors,
            num_observables,
            detectors,
            observables,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parity::ParityMatrixPair;
    use crate::syndrome::{NoiseModel, SyndromeCircuitBuilder};

    fn memory(p: f64) -> CircuitModel {
        let s = ParityMatrixPair::from_strings(&["ZZI", "IZZ"]).unwrap().stabilizers();
        SyndromeCircuitBuilder::new(3, NoiseModel::bit_flip(p)).build(&s).unwrap()
    }

    #[test]
    fn noiseless_shots_are_silent() {
        let batch = FrameSimulator.simulate(&memory(0.0), 20, 1).unwrap();
        assert_eq!(batch.shots(), 20);
        assert_eq!(batch.num_detectors, 6);
        assert!(batch.detectors.iter().all(|d| d.len() == 6 && d.not_any()));
        assert!(batch.observables.iter().all(|o| o.len() == 1 && o.not_any()));
    }

    #[test]
    fn certain_flips_hit_every_shot() {
        // Every qubit flips in every round. The Z-parity checks never see
        // the data flips, the ancilla flips fire the first-round detectors
        // only, and data qubit 0 ends up flipped an odd number of times.
        let batch = FrameSimulator.simulate(&memory(1.0), 5, 3).unwrap();
        for (d, o) in batch.detectors.iter().zip(&batch.observables) {
            let fired: Vec<usize> = d.iter_ones().collect();
            assert_eq!(fired, vec![0, 1]);
            assert!(o[0]);
        }
    }

    #[test]
    fn same_seed_same_batch() {
        let c = memory(0.2);
        assert_eq!(
            FrameSimulator.simulate(&c, 50, 9).unwrap(),
            FrameSimulator.simulate(&c, 50, 9).unwrap()
        );
    }

    #[test]
    fn zero_shots_is_degenerate() {
        assert_eq!(
            FrameSimulator.simulate(&memory(0.1), 0, 0),
            Err(StabOptError::DegenerateSampling)
        );
    }
}
