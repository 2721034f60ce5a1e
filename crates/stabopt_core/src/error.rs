//! Error types for the stabilizer circuit optimizer.
//!
//! Every fallible core operation returns [`Result`]. The variants are split
//! into caller mistakes (bad matrices, parameters, coupling graphs) and
//! failures of an external collaborator such as a code-table lookup.

use thiserror::Error;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, StabOptError>;

/// Broad classification of a [`StabOptError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller supplied invalid input.
    Configuration,
    /// A collaborator outside the core failed or answered nonsense.
    Environment,
}

/// Main error type for core operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StabOptError {
    /// X and Z parts of a parity pair differ in shape
    #[error("Parity shape mismatch: X is {x_rows}x{x_cols}, Z is {z_rows}x{z_cols}")]
    ShapeMismatch {
        x_rows: usize,
        x_cols: usize,
        z_rows: usize,
        z_cols: usize,
    },

    /// A code with no checks or no data qubits
    #[error("Empty code: at least one check and one data qubit are required")]
    EmptyCode,

    /// A matrix entry other than 0 or 1
    #[error("Invalid bit {value} at row {row}, column {col}")]
    InvalidBit { row: usize, col: usize, value: i64 },

    /// Stabilizers of unequal length
    #[error("Ragged stabilizers: stabilizer {index} has length {actual}, expected {expected}")]
    RaggedStabilizers {
        index: usize,
        expected: usize,
        actual: usize,
    },

    /// The code table has no entry for the requested parameters
    #[error("No code found for n={n}, k={k}")]
    LookupFailure { n: usize, k: usize },

    /// The code table answered with text that is not a parity row
    #[error("Malformed code-table response: {0}")]
    MalformedResponse(String),

    /// Sampling with zero shots
    #[error("Degenerate sampling: shot count must be positive")]
    DegenerateSampling,

    /// A numeric parameter outside its domain
    #[error("Invalid parameter: {name} = {value} (expected {constraint})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        constraint: &'static str,
    },

    /// An operation references a qubit beyond the circuit width
    #[error("Qubit {qubit} out of range for {num_qubits} qubits")]
    QubitOutOfRange { qubit: usize, num_qubits: usize },

    /// An operation carries the wrong number of targets
    #[error("{gate} expects {expected} targets per application, got {actual}")]
    ArityMismatch {
        gate: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A record lookback reaches before the first measurement
    #[error("Record rec[-{lookback}] out of range: only {available} measurements so far")]
    RecordOutOfRange { lookback: usize, available: usize },

    /// The coupling graph has fewer qubits than the circuit
    #[error("Coupling graph has {physical} qubits, circuit needs {required}")]
    CouplingTooSmall { physical: usize, required: usize },

    /// Two interacting qubits lie in different components of the coupling graph
    #[error("Physical qubits {a} and {b} are not connected in the coupling graph")]
    DisconnectedQubits { a: usize, b: usize },

    /// Sample widths disagree with the detector model
    #[error("Sample width mismatch: expected {expected} bits, got {actual}")]
    SampleWidthMismatch { expected: usize, actual: usize },
}

impl StabOptError {
    /// Classifies this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StabOptError::LookupFailure { .. } | StabOptError::MalformedResponse(_) => {
                ErrorKind::Environment
            }
            _ => ErrorKind::Configuration,
        }
    }

    pub(crate) fn invalid(
        name: &'static str,
        value: impl ToString,
        constraint: &'static str,
    ) -> Self {
        StabOptError::InvalidParameter {
            name,
            value: value.to_string(),
            constraint,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert_eq!(StabOptError::DegenerateSampling.kind(), ErrorKind::Configuration);
        assert_eq!(
            StabOptError::LookupFailure { n: 3, k: 1 }.kind(),
            ErrorKind::Environment
        );
        assert_eq!(
            StabOptError::MalformedResponse("x".into()).kind(),
            ErrorKind::Environment
        );
    }

    #[test]
    fn messages_name_the_values() {
        let e = StabOptError::invalid("p", 1.5, "0 <= p <= 1");
        assert_eq!(e.to_string(), "Invalid parameter: p = 1.5 (expected 0 <= p <= 1)");
    }
}
