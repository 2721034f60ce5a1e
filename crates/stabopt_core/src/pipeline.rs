//! Logical error rate of a parity matrix pair.
//!
//! Builds the noisy memory circuit for the code, samples it, decodes the
//! detector samples against the circuit's error model and counts the shots
//! whose predicted observables disagree with the sampled ones.

use crate::circuit::CircuitModel;
use crate::decoder::{BpOsdDecoder, Decoder};
use crate::dem::DetectorErrorModel;
use crate::error::{Result, StabOptError};
use crate::parity::ParityMatrixPair;
use crate::sampler::{FrameSimulator, ShotBits, Simulator};
use crate::syndrome::{NoiseModel, SyndromeCircuitBuilder};
use serde::{Deserialize, Serialize};
use stabopt_common::params::{DEFAULT_PHYSICAL_ERROR_RATE, DEFAULT_ROUNDS, DEFAULT_SHOTS};
use tracing::debug;

/// Parameters of one noise simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Bit-flip probability on every qubit in every round.
    pub p: f64,
    pub rounds: usize,
    pub shots: usize,
    /// Phase-flip probability on the data qubits per round. Off by default.
    pub data_phase: f64,
    pub single_qubit_depolarization: f64,
    pub two_qubit_depolarization: f64,
    /// Data qubits of the measured logical operator; derived from the code
    /// when unset.
    pub logical_support: Option<Vec<usize>>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            p: DEFAULT_PHYSICAL_ERROR_RATE,
            rounds: DEFAULT_ROUNDS,
            shots: DEFAULT_SHOTS,
            data_phase: 0.0,
            single_qubit_depolarization: 0.0,
            two_qubit_depolarization: 0.0,
            logical_support: None,
        }
    }
}

impl SimulationConfig {
    pub fn noise(&self) -> NoiseModel {
        NoiseModel {
            data_phase: self.data_phase,
            single_qubit_depolarization: self.single_qubit_depolarization,
            two_qubit_depolarization: self.two_qubit_depolarization,
            ..NoiseModel::bit_flip(self.p)
        }
    }
}

/// Estimated logical error rate over a batch of shots.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogicalErrorEstimate {
    pub error_rate: f64,
    pub mistakes: usize,
    pub shots: usize,
}

/// Compares predicted observables against the sampled ones.
pub struct ErrorRateEstimator;

impl ErrorRateEstimator {
    /// A shot is a mistake when any predicted observable differs from the
    /// actual one.
    pub fn estimate(predicted: &[ShotBits], actual: &[ShotBits]) -> Result<LogicalErrorEstimate> {
        let shots = actual.len();
        if shots == 0 {
            return Err(StabOptError::DegenerateSampling);
        }
        if predicted.len() != shots {
            return Err(StabOptError::SampleWidthMismatch {
                expected: shots,
                actual: predicted.len(),
            });
        }
        let mistakes = predicted.iter().zip(actual).filter(|(p, a)| p != a).count();
        Ok(LogicalErrorEstimate {
            error_rate: mistakes as f64 / shots as f64,
            mistakes,
            shots,
        })
    }
}

/// Circuit construction, sampling and decoding for one code.
#[derive(Debug, Clone)]
pub struct NoiseSimulationPipeline<S = FrameSimulator, D = BpOsdDecoder> {
    config: SimulationConfig,
    simulator: S,
    decoder: D,
}

impl NoiseSimulationPipeline {
    pub fn new(config: SimulationConfig) -> Self {
        Self::with_components(config, FrameSimulator, BpOsdDecoder::default())
    }
}

impl<S: Simulator, D: Decoder> NoiseSimulationPipeline<S, D> {
    pub fn with_components(config: SimulationConfig, simulator: S, decoder: D) -> Self {
        Self {
            config,
            simulator,
            decoder,
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// The noisy memory circuit this pipeline samples for `parity`.
    pub fn build_circuit(&self, parity: &ParityMatrixPair) -> Result<CircuitModel> {
        let mut builder = SyndromeCircuitBuilder::new(self.config.rounds, self.config.noise());
        if let Some(support) = &self.config.logical_support {
            builder = builder.with_logical_support(support.clone());
        }
        builder.build(&parity.stabilizers())
    }

    /// Estimates the logical error rate of `parity`.
    ///
    /// `seed` selects the sampling stream; the same seed and code always
    /// give the same estimate.
    pub fn evaluate(&self, parity: &ParityMatrixPair, seed: u64) -> Result<LogicalErrorEstimate> {
        if self.config.shots == 0 {
            return Err(StabOptError::DegenerateSampling);
        }
        let circuit = self.build_circuit(parity)?;
        self.evaluate_circuit(&circuit, None, seed)
    }

    /// Estimates the logical error rate of an already built noisy circuit.
    ///
    /// Samples are decoded against `model`, or against the circuit's own
    /// error model when none is given.
    pub fn evaluate_circuit(
        &self,
        circuit: &CircuitModel,
        model: Option<&DetectorErrorModel>,
        seed: u64,
    ) -> Result<LogicalErrorEstimate> {
        if self.config.shots == 0 {
            return Err(StabOptError::DegenerateSampling);
        }
        let derived;
        let model = match model {
            Some(m) => m,
            None => {
                derived = DetectorErrorModel::from_circuit(circuit)?;
                &derived
            }
        };
        if model.num_observables != circuit.num_observables() {
            return Err(StabOptError::SampleWidthMismatch {
                expected: circuit.num_observables(),
                actual: model.num_observables,
            });
        }
        let batch = self.simulator.simulate(circuit, self.config.shots, seed)?;
        let predicted = self.decoder.decode(model, &batch.detectors)?;
        let estimate = ErrorRateEstimator::estimate(&predicted, &batch.observables)?;
        debug!(
            detectors = model.num_detectors,
            mechanisms = model.errors.len(),
            mistakes = estimate.mistakes,
            error_rate = estimate.error_rate,
            "evaluated code"
        );
        Ok(estimate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repetition() -> ParityMatrixPair {
        ParityMatrixPair::from_strings(&["ZZI", "IZZ"]).unwrap()
    }

    fn bits(values: &[bool]) -> ShotBits {
        values.iter().copied().collect()
    }

    #[test]
    fn estimator_counts_disagreements() {
        let predicted = vec![bits(&[false]), bits(&[true]), bits(&[true]), bits(&[false])];
        let actual = vec![bits(&[false]), bits(&[false]), bits(&[true]), bits(&[true])];
        let e = ErrorRateEstimator::estimate(&predicted, &actual).unwrap();
        assert_eq!(e.mistakes, 2);
        assert_eq!(e.shots, 4);
        assert_eq!(e.error_rate, 0.5);
    }

    #[test]
    fn noiseless_code_never_fails() {
        let config = SimulationConfig {
            p: 0.0,
            rounds: 2,
            shots: 30,
            ..SimulationConfig::default()
        };
        let e = NoiseSimulationPipeline::new(config).evaluate(&repetition(), 4).unwrap();
        assert_eq!(e.mistakes, 0);
        assert_eq!(e.error_rate, 0.0);
    }

    #[test]
    fn rate_matches_mistakes() {
        let config = SimulationConfig {
            p: 0.1,
            rounds: 3,
            shots: 64,
            ..SimulationConfig::default()
        };
        let pipeline = NoiseSimulationPipeline::new(config);
        let e = pipeline.evaluate(&repetition(), 11).unwrap();
        assert!((0.0..=1.0).contains(&e.error_rate));
        assert_eq!(e.error_rate * 64.0, e.mistakes as f64);
        assert_eq!(pipeline.evaluate(&repetition(), 11).unwrap(), e);
    }

    #[test]
    fn zero_shots_is_degenerate() {
        let config = SimulationConfig {
            shots: 0,
            ..SimulationConfig::default()
        };
        assert_eq!(
            NoiseSimulationPipeline::new(config).evaluate(&repetition(), 0),
            Err(StabOptError::DegenerateSampling)
        );
        assert_eq!(
            ErrorRateEstimator::estimate(&[], &[]),
            Err(StabOptError::DegenerateSampling)
        );
    }

    #[test]
    fn circuits_decode_against_a_given_model() {
        let config = SimulationConfig {
            p: 0.05,
            rounds: 2,
            shots: 32,
            ..SimulationConfig::default()
        };
        let pipeline = NoiseSimulationPipeline::new(config);
        let circuit = pipeline.build_circuit(&repetition()).unwrap();
        let model = DetectorErrorModel::from_circuit(&circuit).unwrap();
        assert_eq!(
            pipeline.evaluate_circuit(&circuit, Some(&model), 5).unwrap(),
            pipeline.evaluate(&repetition(), 5).unwrap()
        );

        let narrow = DetectorErrorModel::new(model.num_detectors, 0, Vec::new());
        assert!(matches!(
            pipeline.evaluate_circuit(&circuit, Some(&narrow), 5),
            Err(StabOptError::SampleWidthMismatch { .. })
        ));
        let short = DetectorErrorModel::new(1, 1, Vec::new());
        assert!(matches!(
            pipeline.evaluate_circuit(&circuit, Some(&short), 5),
            Err(StabOptError::SampleWidthMismatch { .. })
        ));
    }

    #[test]
    fn bad_probability_is_rejected() {
        let config = SimulationConfig {
            p: -0.5,
            ..SimulationConfig::default()
        };
        assert!(matches!(
            NoiseSimulationPipeline::new(config).evaluate(&repetition(), 0),
            Err(StabOptError::InvalidParameter { name: "bit_flip", .. })
        ));
    }
}
