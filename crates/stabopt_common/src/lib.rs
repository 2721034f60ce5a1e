//! Common definitions shared across the stabilizer circuit optimizer.
//!
//! This crate provides the gate vocabulary used by circuit models and noisy
//! syndrome-extraction circuits, the operation record that circuits are built
//! from, and the code parameters threaded through the optimization pipeline.

// Gate vocabulary and operation records for circuit models.
//
// Defines the closed set of operations a circuit may contain: Clifford gates,
// measurement and reset, noise channels and the annotation instructions used
// to declare detectors and observables. The textual names match the circuit
// text form understood by the parser in `stabopt_io`.
pub mod gate {
    use core::fmt;
    use serde::{Deserialize, Serialize};

    /// Kind tag of a circuit operation.
    ///
    /// Each variant is one instruction of the circuit text form. The set is
    /// closed: parsing an unknown name fails rather than producing an opaque
    /// operation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub enum GateKind {
        /// Hadamard gate.
        ///
        /// Exchanges the X and Z eigenbases. Used on check and ancilla qubits
        /// to turn a controlled-Pauli fan-out into a stabilizer measurement.
        H,

        /// Phase gate (S).
        ///
        /// Maps X to Y under conjugation and leaves Z unchanged.
        S,

        /// Inverse phase gate (S dagger).
        S_DAG,

        /// Pauli-X gate.
        X,

        /// Pauli-Z gate.
        Z,

        /// Controlled-X. First operand is the control, second the target.
        CX,

        /// Controlled-Z. Symmetric in its operands.
        CZ,

        /// Controlled-Y. First operand is the control, second the target.
        CY,

        /// Exchange of two qubits, inserted by routing.
        SWAP,

        /// Z-basis measurement into a classical bit.
        M,

        /// Reset to |0>.
        R,

        /// Independent bit flip with the probability given as argument.
        X_ERROR,

        /// Independent phase flip with the probability given as argument.
        Z_ERROR,

        /// Single-qubit depolarizing channel.
        DEPOLARIZE1,

        /// Two-qubit depolarizing channel applied to target pairs.
        DEPOLARIZE2,

        /// Parity of a set of measurement records expected to be deterministic.
        DETECTOR,

        /// Adds measurement records to a logical observable.
        OBSERVABLE_INCLUDE,

        /// Coordinate annotation for qubits. Ignored by simulation.
        QUBIT_COORDS,

        /// Coordinate offset annotation. Ignored by simulation.
        SHIFT_COORDS,
    }

    impl GateKind {
        /// Every kind, in declaration order.
        pub const ALL: [GateKind; 19] = [
            GateKind::H,
            GateKind::S,
            GateKind::S_DAG,
            GateKind::X,
            GateKind::Z,
            GateKind::CX,
            GateKind::CZ,
            GateKind::CY,
            GateKind::SWAP,
            GateKind::M,
            GateKind::R,
            GateKind::X_ERROR,
            GateKind::Z_ERROR,
            GateKind::DEPOLARIZE1,
            GateKind::DEPOLARIZE2,
            GateKind::DETECTOR,
            GateKind::OBSERVABLE_INCLUDE,
            GateKind::QUBIT_COORDS,
            GateKind::SHIFT_COORDS,
        ];

        /// Name used in the circuit text form.
        pub fn name(self) -> &'static str {
            match self {
                GateKind::H => "H",
                GateKind::S => "S",
                GateKind::S_DAG => "S_DAG",
                GateKind::X => "X",
                GateKind::Z => "Z",
                GateKind::CX => "CNOT",
                GateKind::CZ => "CZ",
                GateKind::CY => "CY",
                GateKind::SWAP => "SWAP",
                GateKind::M => "M",
                GateKind::R => "R",
                GateKind::X_ERROR => "X_ERROR",
                GateKind::Z_ERROR => "Z_ERROR",
                GateKind::DEPOLARIZE1 => "DEPOLARIZE1",
                GateKind::DEPOLARIZE2 => "DEPOLARIZE2",
                GateKind::DETECTOR => "DETECTOR",
                GateKind::OBSERVABLE_INCLUDE => "OBSERVABLE_INCLUDE",
                GateKind::QUBIT_COORDS => "QUBIT_COORDS",
                GateKind::SHIFT_COORDS => "SHIFT_COORDS",
            }
        }

        /// Looks up a kind by its text-form name. `CX` is accepted as an
        /// alias of `CNOT`.
        pub fn from_name(name: &str) -> Option<Self> {
            if name == "CX" {
                return Some(GateKind::CX);
            }
            GateKind::ALL.iter().copied().find(|k| k.name() == name)
        }

        /// Number of qubit operands per application for unitary, measurement
        /// and reset kinds; `None` for noise and annotation kinds, which
        /// accept any number of targets.
        pub fn arity(self) -> Option<usize> {
            match self {
                GateKind::H
                | GateKind::S
                | GateKind::S_DAG
                | GateKind::X
                | GateKind::Z
                | GateKind::M
                | GateKind::R => Some(1),
                GateKind::CX | GateKind::CZ | GateKind::CY | GateKind::SWAP => Some(2),
                _ => None,
            }
        }

        /// True for the entangling gates, including routing swaps.
        pub fn is_two_qubit(self) -> bool {
            self.arity() == Some(2)
        }

        /// True for the controlled-Pauli gates that realize a stabilizer's
        /// support between a check qubit and a data qubit.
        pub fn is_controlled_pauli(self) -> bool {
            matches!(self, GateKind::CX | GateKind::CZ | GateKind::CY)
        }

        /// True for stochastic noise channels.
        pub fn is_noise(self) -> bool {
            matches!(
                self,
                GateKind::X_ERROR | GateKind::Z_ERROR | GateKind::DEPOLARIZE1 | GateKind::DEPOLARIZE2
            )
        }

        /// True for instructions that carry no quantum action.
        pub fn is_annotation(self) -> bool {
            matches!(
                self,
                GateKind::DETECTOR
                    | GateKind::OBSERVABLE_INCLUDE
                    | GateKind::QUBIT_COORDS
                    | GateKind::SHIFT_COORDS
            )
        }

        /// Unitaries equal to their own inverse: two identical adjacent
        /// applications compose to the identity.
        pub fn is_self_inverse(self) -> bool {
            matches!(
                self,
                GateKind::H
                    | GateKind::X
                    | GateKind::Z
                    | GateKind::CX
                    | GateKind::CZ
                    | GateKind::CY
                    | GateKind::SWAP
            )
        }

        /// Operations whose repetition has the same effect as one application.
        pub fn is_idempotent(self) -> bool {
            matches!(self, GateKind::R)
        }
    }

    impl fmt::Display for GateKind {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.name())
        }
    }

    /// One circuit instruction.
    ///
    /// Operands are explicit: `qubits` holds the qubit targets in order
    /// (control before target for controlled gates), `classical` the
    /// classical bit a measurement writes, `args` the parenthesized numeric
    /// arguments and `records` the measurement-record lookbacks referenced by
    /// detectors and observables (`rec[-k]` is stored as `k`).
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Operation {
        pub kind: GateKind,
        pub qubits: Vec<usize>,
        pub classical: Option<usize>,
        pub args: Vec<f64>,
        pub records: Vec<usize>,
    }

    impl Operation {
        fn bare(kind: GateKind, qubits: Vec<usize>) -> Self {
            Self {
                kind,
                qubits,
                classical: None,
                args: Vec::new(),
                records: Vec::new(),
            }
        }

        /// Single-qubit gate or reset.
        pub fn single(kind: GateKind, qubit: usize) -> Self {
            Self::bare(kind, vec![qubit])
        }

        /// Two-qubit gate. For controlled gates `a` is the control.
        pub fn pair(kind: GateKind, a: usize, b: usize) -> Self {
            Self::bare(kind, vec![a, b])
        }

        /// Z-basis measurement of `qubit` into classical bit `bit`.
        pub fn measure(qubit: usize, bit: usize) -> Self {
            Self {
                classical: Some(bit),
                ..Self::bare(GateKind::M, vec![qubit])
            }
        }

        /// Noise channel with probability `p` over `qubits`.
        pub fn noise(kind: GateKind, p: f64, qubits: Vec<usize>) -> Self {
            Self {
                args: vec![p],
                ..Self::bare(kind, qubits)
            }
        }

        /// Detector over measurement-record lookbacks, with coordinates.
        pub fn detector(records: Vec<usize>, coords: Vec<f64>) -> Self {
            Self {
                args: coords,
                records,
                ..Self::bare(GateKind::DETECTOR, Vec::new())
            }
        }

        /// Adds measurement-record lookbacks to observable `index`.
        pub fn observable(index: usize, records: Vec<usize>) -> Self {
            Self {
                args: vec![index as f64],
                records,
                ..Self::bare(GateKind::OBSERVABLE_INCLUDE, Vec::new())
            }
        }

        /// Coordinate annotation for `qubit`.
        pub fn qubit_coords(qubit: usize, coords: Vec<f64>) -> Self {
            Self {
                args: coords,
                ..Self::bare(GateKind::QUBIT_COORDS, vec![qubit])
            }
        }

        /// Coordinate offset annotation.
        pub fn shift_coords(offset: Vec<f64>) -> Self {
            Self {
                args: offset,
                ..Self::bare(GateKind::SHIFT_COORDS, Vec::new())
            }
        }

        /// Probability argument of a noise channel.
        pub fn probability(&self) -> Option<f64> {
            if self.kind.is_noise() {
                self.args.first().copied()
            } else {
                None
            }
        }

        /// Observable index of an `OBSERVABLE_INCLUDE`.
        pub fn observable_index(&self) -> Option<usize> {
            if self.kind == GateKind::OBSERVABLE_INCLUDE {
                self.args.first().map(|&a| a as usize)
            } else {
                None
            }
        }

        /// Same operation with every qubit operand passed through `map`.
        pub fn relabeled(&self, map: impl Fn(usize) -> usize) -> Self {
            Self {
                qubits: self.qubits.iter().map(|&q| map(q)).collect(),
                ..self.clone()
            }
        }
    }

    impl fmt::Display for Operation {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.kind.name())?;
            if !self.args.is_empty() {
                f.write_str("(")?;
                for (i, a) in self.args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", a)?;
                }
                f.write_str(")")?;
            }
            for q in &self.qubits {
                write!(f, " {}", q)?;
            }
            for r in &self.records {
                write!(f, " rec[-{}]", r)?;
            }
            Ok(())
        }
    }
}

/// Code parameters of the stabilizer code being optimized.
///
/// Passed explicitly through every stage that needs them; nothing in the
/// pipeline reads them from ambient state.
pub mod params {
    use serde::{Deserialize, Serialize};

    /// `[[n, k, d]]` parameters: code length, logical qubit count, distance.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct CodeParameters {
        pub n: usize,
        pub k: usize,
        pub d: usize,
    }

    impl CodeParameters {
        pub fn new(n: usize, k: usize, d: usize) -> Self {
            Self { n, k, d }
        }
    }

    /// Physical error probability used when the caller supplies none.
    pub const DEFAULT_PHYSICAL_ERROR_RATE: f64 = 0.07;

    /// Syndrome-extraction rounds used when the caller supplies none.
    pub const DEFAULT_ROUNDS: usize = 10;

    /// Monte-Carlo shots used when the caller supplies none.
    pub const DEFAULT_SHOTS: usize = 100;

    /// Optimization iterations used when the caller supplies none.
    pub const DEFAULT_ITERATIONS: usize = 25;
}

#[cfg(test)]
mod tests {
    use super::gate::{GateKind, Operation};

    #[test]
    fn names_round_trip() {
        for kind in GateKind::ALL {
            assert_eq!(GateKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(GateKind::from_name("CX"), Some(GateKind::CX));
        assert_eq!(GateKind::from_name("TOFFOLI"), None);
    }

    #[test]
    fn operation_text_form() {
        assert_eq!(Operation::pair(GateKind::CX, 0, 5).to_string(), "CNOT 0 5");
        assert_eq!(
            Operation::noise(GateKind::X_ERROR, 0.07, vec![0, 1]).to_string(),
            "X_ERROR(0.07) 0 1"
        );
        assert_eq!(
            Operation::detector(vec![1, 5], vec![2.0, 0.0]).to_string(),
            "DETECTOR(2, 0) rec[-1] rec[-5]"
        );
        assert_eq!(Operation::observable(0, vec![2, 1]).to_string(), "OBSERVABLE_INCLUDE(0) rec[-2] rec[-1]");
    }

    #[test]
    fn elision_classes_are_disjoint() {
        for kind in GateKind::ALL {
            assert!(!(kind.is_self_inverse() && kind.is_idempotent()));
        }
        assert!(!GateKind::M.is_self_inverse());
        assert!(!GateKind::S.is_self_inverse());
    }
}
