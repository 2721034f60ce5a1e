//! Gate-level circuit model and its conversion to and from parity matrices.
//!
//! The conversion uses a fixed layout: check qubits occupy indices
//! `0..num_checks` and data qubits follow them. Each non-identity parity
//! cell becomes one controlled-Pauli gate from its check to its data qubit,
//! and the inverse scan reads those gates back into matrix cells.

use crate::error::{Result, StabOptError};
use crate::parity::{ParityMatrixPair, Pauli};
use core::fmt;
use stabopt_common::gate::{GateKind, Operation};

/// Ordered sequence of operations over a fixed register of qubits and
/// classical bits.
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitModel {
    pub num_qubits: usize,
    pub num_clbits: usize,
    operations: Vec<Operation>,
}

impl CircuitModel {
    pub fn new(num_qubits: usize, num_clbits: usize) -> Self {
        Self {
            num_qubits,
            num_clbits,
            operations: Vec::new(),
        }
    }

    pub fn with_operations(num_qubits: usize, num_clbits: usize, operations: Vec<Operation>) -> Self {
        Self {
            num_qubits,
            num_clbits,
            operations,
        }
    }

    pub fn push(&mut self, op: Operation) {
        self.operations.push(op);
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn into_operations(self) -> Vec<Operation> {
        self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn count(&self, kind: GateKind) -> usize {
        self.operations.iter().filter(|op| op.kind == kind).count()
    }

    /// Operand pairs of every two-qubit gate, in order.
    pub fn two_qubit_pairs(&self) -> Vec<(usize, usize)> {
        self.operations
            .iter()
            .filter(|op| op.kind.is_two_qubit())
            .filter_map(|op| match op.qubits[..] {
                [a, b] => Some((a, b)),
                _ => None,
            })
            .collect()
    }

    pub fn num_measurements(&self) -> usize {
        self.count(GateKind::M)
    }

    pub fn num_detectors(&self) -> usize {
        self.count(GateKind::DETECTOR)
    }

    /// One past the highest observable index referenced.
    pub fn num_observables(&self) -> usize {
        self.operations
            .iter()
            .filter_map(|op| op.observable_index())
            .map(|i| i + 1)
            .max()
            .unwrap_or(0)
    }

    /// Number of layers in an as-soon-as-possible schedule.
    ///
    /// Gates, measurements and resets each occupy one layer on every qubit
    /// and classical bit they touch. Noise channels and annotations take no
    /// time.
    pub fn depth(&self) -> usize {
        let mut qubit_level = vec![0usize; self.num_qubits];
        let mut clbit_level = vec![0usize; self.num_clbits];
        let mut depth = 0;
        for op in &self.operations {
            if op.kind.is_noise() || op.kind.is_annotation() {
                continue;
            }
            let mut level = op
                .qubits
                .iter()
                .filter_map(|&q| qubit_level.get(q))
                .copied()
                .max()
                .unwrap_or(0);
            if let Some(c) = op.classical.and_then(|c| clbit_level.get(c)) {
                level = level.max(*c);
            }
            level += 1;
            for &q in &op.qubits {
                if let Some(l) = qubit_level.get_mut(q) {
                    *l = level;
                }
            }
            if let Some(l) = op.classical.and_then(|c| clbit_level.get_mut(c)) {
                *l = level;
            }
            depth = depth.max(level);
        }
        depth
    }

    /// Checks operand ranges, arities, noise probabilities and record
    /// lookbacks.
    pub fn validate(&self) -> Result<()> {
        let mut measurements = 0usize;
        for op in &self.operations {
            for &qubit in &op.qubits {
                if qubit >= self.num_qubits {
                    return Err(StabOptError::QubitOutOfRange {
                        qubit,
                        num_qubits: self.num_qubits,
                    });
                }
            }
            if let Some(expected) = op.kind.arity() {
                if op.qubits.len() != expected {
                    return Err(StabOptError::ArityMismatch {
                        gate: op.kind.name(),
                        expected,
                        actual: op.qubits.len(),
                    });
                }
            }
            if op.kind.is_two_qubit() && op.qubits[0] == op.qubits[1] {
                return Err(StabOptError::invalid(op.kind.name(), op.qubits[0], "distinct operands"));
            }
            if op.kind == GateKind::DEPOLARIZE2 && op.qubits.len() % 2 != 0 {
                return Err(StabOptError::ArityMismatch {
                    gate: op.kind.name(),
                    expected: 2,
                    actual: op.qubits.len() % 2,
                });
            }
            if op.kind.is_noise() {
                match op.probability() {
                    Some(p) if (0.0..=1.0).contains(&p) => {}
                    Some(p) => return Err(StabOptError::invalid("probability", p, "0 <= p <= 1")),
                    None => return Err(StabOptError::invalid("probability", "missing", "0 <= p <= 1")),
                }
            }
            if let Some(bit) = op.classical {
                if bit >= self.num_clbits {
                    return Err(StabOptError::invalid("classical bit", bit, "index below num_clbits"));
                }
            }
            for &lookback in &op.records {
                if lookback == 0 || lookback > measurements {
                    return Err(StabOptError::RecordOutOfRange {
                        lookback,
                        available: measurements,
                    });
                }
            }
            if op.kind == GateKind::M {
                measurements += 1;
            }
        }
        Ok(())
    }
}

impl fmt::Display for CircuitModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for op in &self.operations {
            writeln!(f, "{}", op)?;
        }
        Ok(())
    }
}

/// Builds the check-to-data gate circuit realizing `parity`.
///
/// Check `i` is qubit `i`, data column `j` is qubit `num_checks + j`. Every
/// check is wrapped in Hadamards and measured into classical bit `i`.
pub fn to_circuit(parity: &ParityMatrixPair) -> CircuitModel {
    let m = parity.num_checks();
    let n = parity.num_data_qubits();
    let mut circuit = CircuitModel::new(m + n, m);

    for check in 0..m {
        circuit.push(Operation::single(GateKind::H, check));
    }
    for check in 0..m {
        for col in 0..n {
            let kind = match parity.pauli(check, col) {
                Pauli::I => continue,
                Pauli::X => GateKind::CX,
                Pauli::Z => GateKind::CZ,
                Pauli::Y => GateKind::CY,
            };
            circuit.push(Operation::pair(kind, check, m + col));
        }
    }
    for check in 0..m {
        circuit.push(Operation::single(GateKind::H, check));
    }
    for check in 0..m {
        circuit.push(Operation::measure(check, check));
    }
    circuit
}

/// Reads the parity matrices back from the controlled-Pauli gates of a
/// circuit laid out as [`to_circuit`] lays it out.
///
/// Gates between two checks or between two data qubits carry no parity
/// information and are skipped, as is every other gate kind.
pub fn to_parity(circuit: &CircuitModel, num_checks: usize) -> Result<ParityMatrixPair> {
    let num_data = circuit.num_qubits.saturating_sub(num_checks);
    let mut parity = ParityMatrixPair::zeros(num_checks, num_data)?;

    for op in circuit.operations() {
        if !op.kind.is_controlled_pauli() {
            continue;
        }
        let (a, b) = match op.qubits.as_slice() {
            [a, b] => (*a, *b),
            other => {
                return Err(StabOptError::ArityMismatch {
                    gate: op.kind.name(),
                    expected: 2,
                    actual: other.len(),
                });
            }
        };
        for &q in &[a, b] {
            if q >= circuit.num_qubits {
                return Err(StabOptError::QubitOutOfRange {
                    qubit: q,
                    num_qubits: circuit.num_qubits,
                });
            }
        }
        let (row, data) = match (a < num_checks, b < num_checks) {
            (true, false) => (a, b),
            (false, true) => (b, a),
            _ => continue,
        };
        let x = matches!(op.kind, GateKind::CX | GateKind::CY);
        let z = matches!(op.kind, GateKind::CZ | GateKind::CY);
        parity.set(row, data - num_checks, x, z);
    }
    Ok(parity)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example() -> ParityMatrixPair {
        ParityMatrixPair::from_strings(&["XIYZX", "ZIXYZ", "IXXXX", "IZZZZ"]).unwrap()
    }

    #[test]
    fn circuit_layout() {
        let c = to_circuit(&example());
        assert_eq!(c.num_qubits, 9);
        assert_eq!(c.num_clbits, 4);
        assert_eq!(c.count(GateKind::H), 8);
        assert_eq!(c.count(GateKind::M), 4);
        assert_eq!(c.count(GateKind::CX), 7);
        assert_eq!(c.count(GateKind::CZ), 7);
        assert_eq!(c.count(GateKind::CY), 2);
        assert_eq!(c.operations()[4], Operation::pair(GateKind::CX, 0, 4));
        c.validate().unwrap();
    }

    #[test]
    fn round_trip() {
        let p = example();
        assert_eq!(to_parity(&to_circuit(&p), p.num_checks()).unwrap(), p);
    }

    #[test]
    fn reversed_operands_and_irrelevant_gates() {
        let mut c = CircuitModel::new(4, 0);
        c.push(Operation::pair(GateKind::CZ, 3, 1));
        c.push(Operation::pair(GateKind::CX, 0, 1));
        c.push(Operation::pair(GateKind::CX, 2, 3));
        c.push(Operation::pair(GateKind::SWAP, 0, 2));
        let p = to_parity(&c, 2).unwrap();
        assert_eq!(p.stabilizers()[0].to_string(), "II");
        assert_eq!(p.stabilizers()[1].to_string(), "IZ");
    }

    #[test]
    fn depth_counts_layers() {
        let mut c = CircuitModel::new(3, 1);
        c.push(Operation::single(GateKind::H, 0));
        c.push(Operation::single(GateKind::H, 1));
        c.push(Operation::pair(GateKind::CX, 0, 2));
        c.push(Operation::noise(GateKind::X_ERROR, 0.1, vec![0, 1, 2]));
        c.push(Operation::measure(1, 0));
        assert_eq!(c.depth(), 2);
        c.push(Operation::measure(2, 0));
        assert_eq!(c.depth(), 3);
    }

    #[test]
    fn pairs_skip_malformed_operations() {
        let mut c = CircuitModel::new(3, 0);
        c.push(Operation::pair(GateKind::CZ, 2, 0));
        c.push(Operation {
            qubits: vec![1],
            ..Operation::pair(GateKind::CX, 0, 1)
        });
        assert_eq!(c.two_qubit_pairs(), vec![(2, 0)]);
        assert!(matches!(c.validate(), Err(StabOptError::ArityMismatch { actual: 1, .. })));
    }

    #[test]
    fn validation_failures() {
        let mut c = CircuitModel::new(2, 1);
        c.push(Operation::pair(GateKind::CX, 0, 2));
        assert!(matches!(c.validate(), Err(StabOptError::QubitOutOfRange { qubit: 2, .. })));

        let mut c = CircuitModel::new(2, 1);
        c.push(Operation::measure(0, 0));
        c.push(Operation::detector(vec![2], vec![]));
        assert_eq!(
            c.validate(),
            Err(StabOptError::RecordOutOfRange { lookback: 2, available: 1 })
        );

        let mut c = CircuitModel::new(2, 0);
        c.push(Operation::noise(GateKind::X_ERROR, 1.5, vec![0]));
        assert!(matches!(c.validate(), Err(StabOptError::InvalidParameter { .. })));
    }

    #[test]
    fn text_form() {
        let p = ParityMatrixPair::from_strings(&["XZ"]).unwrap();
        let text = to_circuit(&p).to_string();
        assert_eq!(text, "H 0\nCNOT 0 1\nCZ 0 2\nH 0\nM 0\n");
    }
}
