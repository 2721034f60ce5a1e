//! Core algorithms of the stabilizer circuit optimizer.
//!
//! This crate turns parity-check matrices into syndrome-measurement
//! circuits, transforms those circuits (gate balancing, connectivity
//! routing), estimates logical error rates by Pauli-frame sampling and
//! BP+OSD decoding, and drives the iterative search that keeps the best
//! realization found.

/// Balancing of circuits into shallow layers.
///
/// Elides adjacent redundant gates, then greedily places every operation
/// into the earliest depth bucket whose qubits and classical bits are free.
pub mod balancer;

/// Bit manipulation over packed `u64` words.
///
/// Shared by the Pauli frame registers and the GF(2) elimination of the
/// decoder.
pub mod bit_utils;

/// Circuit model and the parity-matrix conversions.
///
/// Holds the ordered operation list of a circuit together with its qubit
/// and classical-bit counts, and converts between parity matrices and the
/// measurement circuit that realizes them.
pub mod circuit;

/// Connectivity optimization: routes a circuit at every effort level and
/// keeps the shallowest result.
pub mod connectivity;

/// Coupling graphs of physical qubits.
pub mod coupling;

/// Decoders turning detector samples into predicted observable flips.
///
/// The shipped decoder runs min-sum belief propagation over the detector
/// error model and falls back to ordered-statistics decoding when the
/// propagation does not reproduce the syndrome.
pub mod decoder;

/// Detector error model derived from a noisy circuit.
pub mod dem;

/// Disjoint set union with path halving and union by rank.
///
/// Used to find the connected components of a coupling graph.
pub mod dsu;

/// Error types and the crate-wide result alias.
pub mod error;

/// The iterative optimization loop.
pub mod optimizer;

/// Parity-check matrices, Pauli symbols and stabilizers.
pub mod parity;

/// Pauli frame tracking for stabilizer circuit simulation.
///
/// Tracks X and Z errors relative to a noiseless reference run without
/// storing the quantum state, which is what the sampler and the error model
/// builder propagate faults with.
pub mod pauli_frame;

/// Noise simulation: circuit building, sampling, decoding and scoring.
pub mod pipeline;

/// Swap-based routing of circuits onto coupling graphs.
pub mod routing;

/// Monte-Carlo sampling of detector and observable flips.
pub mod sampler;

/// Builder of noisy repeated syndrome-extraction circuits.
pub mod syndrome;

pub use error::{ErrorKind, Result, StabOptError};
