//! Structural detector error model.
//!
//! Lists every independent fault of a noisy circuit together with the
//! detectors and observables it flips. Faults are found by injecting each
//! Pauli component of each noise channel alone and propagating it through
//! the rest of the circuit on a Pauli frame. Faults with identical
//! signatures merge into one mechanism.

use crate::circuit::CircuitModel;
use crate::error::Result;
use crate::pauli_frame::PauliFrame;
use crate::sampler::{FaultSource, pauli_bits, run_shot};
use core::fmt;
use stabopt_common::gate::{GateKind, Operation};
use std::collections::HashMap;

/// One error mechanism: flips `detectors` and `observables` with
/// `probability`.
#[derive(Debug, Clone, PartialEq)]
pub struct DemError {
    pub probability: f64,
    pub detectors: Vec<usize>,
    pub observables: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DetectorErrorModel {
    pub num_detectors: usize,
    pub num_observables: usize,
    pub errors: Vec<DemError>,
}

/// A single Pauli placed on one target (or target pair) of one noise
/// operation.
struct InjectedFault {
    index: usize,
    slot: usize,
    first: (bool, bool),
    second: (bool, bool),
}

impl FaultSource for InjectedFault {
    fn apply(&mut self, index: usize, op: &Operation, frame: &mut PauliFrame) {
        if index != self.index {
            return;
        }
        if op.kind == GateKind::DEPOLARIZE2 {
            let (a, b) = (op.qubits[2 * self.slot], op.qubits[2 * self.slot + 1]);
            frame.apply_pauli(a, self.first.0, self.first.1);
            frame.apply_pauli(b, self.second.0, self.second.1);
        } else {
            frame.apply_pauli(op.qubits[self.slot], self.first.0, self.first.1);
        }
    }
}

/// Independent Pauli components of one noise channel with their
/// probabilities.
fn components(op: &Operation) -> Vec<((bool, bool), (bool, bool), f64)> {
    let p = op.probability().unwrap_or(0.0);
    let none = (false, false);
    match op.kind {
        GateKind::X_ERROR => vec![((true, false), none, p)],
        GateKind::Z_ERROR => vec![((false, true), none, p)],
        GateKind::DEPOLARIZE1 => (1..4).map(|c| (pauli_bits(c), none, p / 3.0)).collect(),
        GateKind::DEPOLARIZE2 => (1..16)
            .map(|c| (pauli_bits(c / 4), pauli_bits(c % 4), p / 15.0))
            .collect(),
        _ => Vec::new(),
    }
}

impl DetectorErrorModel {
    pub fn new(num_detectors: usize, num_observables: usize, errors: Vec<DemError>) -> Self {
        Self {
            num_detectors,
            num_observables,
            errors,
        }
    }

    /// Derives the model of `circuit`.
    ///
    /// Zero-probability channels contribute nothing, faults that flip no
    /// detector and no observable are dropped, and mechanisms with identical
    /// signatures are merged with `p = p1 (1 - p2) + p2 (1 - p1)`. Mechanisms
    /// keep the order of their first occurrence.
    pub fn from_circuit(circuit: &CircuitModel) -> Result<Self> {
        circuit.validate()?;
        let num_detectors = circuit.num_detectors();
        let num_observables = circuit.num_observables();
        let mut errors: Vec<DemError> = Vec::new();
        let mut seen: HashMap<(Vec<usize>, Vec<usize>), usize> = HashMap::new();

        for (index, op) in circuit.operations().iter().enumerate() {
            if !op.kind.is_noise() {
                continue;
            }
            let slots = if op.kind == GateKind::DEPOLARIZE2 {
                op.qubits.len() / 2
            } else {
                op.qubits.len()
            };
            for slot in 0..slots {
                for (first, second, p) in components(op) {
                    if p <= 0.0 {
                        continue;
                    }
                    let mut fault = InjectedFault {
                        index,
                        slot,
                        first,
                        second,
                    };
                    let flips = run_shot(circuit, index, num_observables, &mut fault);
                    let dets = ones(&flips.detectors);
                    let obs = ones(&flips.observables);
                    if dets.is_empty() && obs.is_empty() {
                        continue;
                    }
                    match seen.get(&(dets.clone(), obs.clone())) {
                        Some(&i) => {
                            let q = errors[i].probability;
                            errors[i].probability = q * (1.0 - p) + p * (1.0 - q);
                        }
                        None => {
                            seen.insert((dets.clone(), obs.clone()), errors.len());
                            errors.push(DemError {
                                probability: p,
                                detectors: dets,
                                observables: obs,
                            });
                        }
                    }
                }
            }
        }

        Ok(Self {
            num_detectors,
            num_observables,
            errors,
        })
    }
}

fn ones(bits: &[bool]) -> Vec<usize> {
    bits.iter()
        .enumerate()
        .filter_map(|(i, &b)| b.then_some(i))
        .collect()
}

impl fmt::Display for DetectorErrorModel {
    /// Text form: one `error(p) D.. L..` line per mechanism, followed by
    /// `detector` and `logical_observable` lines naming the highest indices
    /// so the counts survive a round trip.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for e in &self.errors {
            write!(f, "error({})", e.probability)?;
            for d in &e.detectors {
                write!(f, " D{}", d)?;
            }
            for o in &e.observables {
                write!(f, " L{}", o)?;
            }
            writeln!(f)?;
        }
        if self.num_detectors > 0 {
            writeln!(f, "detector D{}", self.num_detectors - 1)?;
        }
        if self.num_observables > 0 {
            writeln!(f, "logical_observable L{}", self.num_observables - 1)?;
        }
        Ok(())
    }
}
