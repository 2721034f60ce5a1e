//! Noisy repeated syndrome-extraction circuits.
//!
//! Data qubits take indices `0..n`; the ancilla measuring stabilizer `i` is
//! qubit `n + i`. Each round flips every qubit, measures every stabilizer
//! through its ancilla and compares each outcome against the previous round.
//! The memory experiment ends by measuring every data qubit and declaring a
//! Z-type logical operator as observable 0.

use crate::circuit::CircuitModel;
use crate::error::{Result, StabOptError};
use crate::parity::{ParityMatrixPair, Pauli, Stabilizer, uniform_length};
use serde::{Deserialize, Serialize};
use stabopt_common::gate::{GateKind, Operation};

/// Error probabilities placed in the extraction circuit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseModel {
    /// `X_ERROR` on every data and ancilla qubit at the start of each round.
    pub bit_flip: f64,
    /// `Z_ERROR` on every data qubit at the end of each round. Zero disables.
    pub data_phase: f64,
    /// `DEPOLARIZE1` after every single-qubit gate on an ancilla. Zero disables.
    pub single_qubit_depolarization: f64,
    /// `DEPOLARIZE2` after every ancilla-data gate. Zero disables.
    pub two_qubit_depolarization: f64,
}

impl NoiseModel {
    /// Bit flips at `p` on every qubit, nothing else.
    pub fn bit_flip(p: f64) -> Self {
        Self {
            bit_flip: p,
            data_phase: 0.0,
            single_qubit_depolarization: 0.0,
            two_qubit_depolarization: 0.0,
        }
    }

    fn validate(&self) -> Result<()> {
        for (name, p) in [
            ("bit_flip", self.bit_flip),
            ("data_phase", self.data_phase),
            ("single_qubit_depolarization", self.single_qubit_depolarization),
            ("two_qubit_depolarization", self.two_qubit_depolarization),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(StabOptError::invalid(name, p, "0 <= p <= 1"));
            }
        }
        Ok(())
    }
}

impl Default for NoiseModel {
    fn default() -> Self {
        Self::bit_flip(stabopt_common::params::DEFAULT_PHYSICAL_ERROR_RATE)
    }
}

/// Builds memory-experiment circuits for a list of stabilizers.
#[derive(Debug, Clone, PartialEq)]
pub struct SyndromeCircuitBuilder {
    pub rounds: usize,
    pub noise: NoiseModel,
    /// Data qubits whose final Z-basis parity forms observable 0. `None`
    /// derives one from the stabilizers.
    pub logical_support: Option<Vec<usize>>,
}

impl SyndromeCircuitBuilder {
    pub fn new(rounds: usize, noise: NoiseModel) -> Self {
        Self {
            rounds,
            noise,
            logical_support: None,
        }
    }

    pub fn with_logical_support(mut self, support: Vec<usize>) -> Self {
        self.logical_support = Some(support);
        self
    }

    pub fn build(&self, stabilizers: &[Stabilizer]) -> Result<CircuitModel> {
        let n = uniform_length(stabilizers)?;
        if self.rounds == 0 {
            return Err(StabOptError::invalid("rounds", 0, "at least one round"));
        }
        self.noise.validate()?;
        let code = ParityMatrixPair::from_stabilizers(stabilizers)?;
        let support: Vec<usize> = match &self.logical_support {
            Some(s) => {
                if let Some(&qubit) = s.iter().find(|&&q| q >= n) {
                    return Err(StabOptError::QubitOutOfRange { qubit, num_qubits: n });
                }
                if !code.is_z_logical(s) {
                    return Err(StabOptError::invalid(
                        "logical_support",
                        format!("{s:?}"),
                        "a Z-type logical operator of the code",
                    ));
                }
                s.clone()
            }
            None => code.z_logical_support().ok_or(StabOptError::invalid(
                "logical_support",
                "none",
                "a code with a Z-type logical operator",
            ))?,
        };

        let m = stabilizers.len();
        let data: Vec<usize> = (0..n).collect();
        let all: Vec<usize> = (0..n + m).collect();
        let mut c = CircuitModel::new(n + m, m * self.rounds + n);
        let mut measured = 0usize;

        for q in 0..n {
            c.push(Operation::qubit_coords(q, vec![q as f64, 0.0]));
        }
        for i in 0..m {
            c.push(Operation::qubit_coords(n + i, vec![i as f64, 1.0]));
        }
        for q in 0..n + m {
            c.push(Operation::single(GateKind::R, q));
        }

        for round in 0..self.rounds {
            c.push(Operation::noise(GateKind::X_ERROR, self.noise.bit_flip, all.clone()));
            for (i, stabilizer) in stabilizers.iter().enumerate() {
                let a = n + i;
                self.single(&mut c, GateKind::H, a);
                for (q, pauli) in stabilizer.support() {
                    let kind = match pauli {
                        Pauli::X => GateKind::CX,
                        Pauli::Z => GateKind::CZ,
                        Pauli::Y => GateKind::CY,
                        Pauli::I => continue,
                    };
                    c.push(Operation::pair(kind, a, q));
                    if self.noise.two_qubit_depolarization > 0.0 {
                        c.push(Operation::noise(
                            GateKind::DEPOLARIZE2,
                            self.noise.two_qubit_depolarization,
                            vec![a, q],
                        ));
                    }
                }
                self.single(&mut c, GateKind::H, a);
                c.push(Operation::measure(a, measured));
                measured += 1;
                let records = if round == 0 { vec![1] } else { vec![1, 1 + m] };
                c.push(Operation::detector(records, vec![i as f64, 0.0]));
                c.push(Operation::single(GateKind::R, a));
            }
            if self.noise.data_phase > 0.0 {
                c.push(Operation::noise(GateKind::Z_ERROR, self.noise.data_phase, data.clone()));
            }
            c.push(Operation::shift_coords(vec![0.0, 1.0]));
        }

        for q in 0..n {
            c.push(Operation::measure(q, measured));
            measured += 1;
        }
        c.push(Operation::observable(0, support.iter().map(|&q| n - q).collect()));
        Ok(c)
    }

    fn single(&self, c: &mut CircuitModel, kind: GateKind, q: usize) {
        c.push(Operation::single(kind, q));
        if self.noise.single_qubit_depolarization > 0.0 {
            c.push(Operation::noise(
                GateKind::DEPOLARIZE1,
                self.noise.single_qubit_depolarization,
                vec![q],
            ));
        }
    }
}
