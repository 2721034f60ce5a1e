//! The iterative search over circuit realizations of a code.
//!
//! Every iteration turns the current parity matrices into a circuit, derives
//! a balanced candidate and a routed candidate from it, reads both back as
//! parity matrices and scores them with the noise pipeline. The lower rate
//! becomes the current code (ties favour the balanced one) and the best code
//! seen so far is kept aside.

use crate::balancer::GateBalancer;
use crate::circuit::{to_circuit, to_parity};
use crate::connectivity::ConnectivityOptimizer;
use crate::coupling::{CouplingGraph, CouplingSpec};
use crate::decoder::{BpOsdDecoder, Decoder};
use crate::error::{Result, StabOptError};
use crate::parity::ParityMatrixPair;
use crate::pipeline::{LogicalErrorEstimate, NoiseSimulationPipeline, SimulationConfig};
use crate::sampler::{FrameSimulator, Simulator};
use rand::{RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use stabopt_common::params::{CodeParameters, DEFAULT_ITERATIONS};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub iterations: usize,
    pub simulation: SimulationConfig,
    pub seed: u64,
    /// Score the two candidates of an iteration on separate threads.
    pub parallel: bool,
    /// Coupling graph handed to the connectivity optimizer; fully connected
    /// when unset.
    pub coupling: Option<CouplingSpec>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            simulation: SimulationConfig::default(),
            seed: 0,
            parallel: true,
            coupling: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Candidate {
    Balanced,
    Routed,
}

/// A scored candidate of one iteration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateResult {
    pub candidate: Candidate,
    pub parity: ParityMatrixPair,
    pub error_rate: f64,
    pub mistakes: usize,
    /// Depth of the candidate circuit (physical circuit for the routed one).
    pub depth: usize,
    pub swap_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IterationRecord {
    pub iteration: usize,
    pub balanced_rate: f64,
    pub routed_rate: f64,
    pub winner: Candidate,
    pub routed_depth: usize,
    pub swap_count: usize,
    pub best_error_rate: f64,
}

/// Mutable state of a run, owned by the loop.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationState {
    pub current: ParityMatrixPair,
    pub best: Option<ParityMatrixPair>,
    pub best_error_rate: f64,
    pub history: Vec<f64>,
}

impl OptimizationState {
    pub fn new(initial: ParityMatrixPair) -> Self {
        Self {
            current: initial,
            best: None,
            best_error_rate: f64::INFINITY,
            history: Vec::new(),
        }
    }

    /// Records `winner` as this iteration's result.
    ///
    /// The current code always follows the winner; the best code changes
    /// only on a strictly lower rate.
    pub fn advance(&mut self, winner: &CandidateResult) {
        self.history.push(winner.error_rate);
        if winner.error_rate < self.best_error_rate {
            self.best = Some(winner.parity.clone());
            self.best_error_rate = winner.error_rate;
        }
        self.current = winner.parity.clone();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationOutcome {
    pub params: CodeParameters,
    pub best: ParityMatrixPair,
    pub best_error_rate: f64,
    /// Rate of the code the loop ended on, scored once more.
    pub final_error_rate: f64,
    /// Relative gain of the best code over the final one, in percent.
    pub improvement: f64,
    pub initial_error_rate: f64,
    /// Relative gain of the best code over the starting one, in percent.
    pub improvement_over_initial: f64,
    pub history: Vec<f64>,
    pub iterations: usize,
    pub trace: Vec<IterationRecord>,
}

/// `(reference - best) / reference * 100`, zero for a zero reference.
pub fn relative_improvement(reference: f64, best: f64) -> f64 {
    if reference == 0.0 {
        0.0
    } else {
        (reference - best) / reference * 100.0
    }
}

/// Seed of evaluation `stream` of a run seeded with `seed`.
///
/// Streams are separated by xoshiro jumps, so two evaluations never share
/// random numbers whatever order they run in.
fn stream_seed(seed: u64, stream: u64) -> u64 {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    for _ in 0..stream {
        rng.jump();
    }
    rng.next_u64()
}

pub struct OptimizationLoop<S = FrameSimulator, D = BpOsdDecoder> {
    config: OptimizerConfig,
    pipeline: NoiseSimulationPipeline<S, D>,
    balancer: GateBalancer,
    connectivity: ConnectivityOptimizer,
}

impl OptimizationLoop {
    pub fn new(config: OptimizerConfig) -> Result<Self> {
        let pipeline = NoiseSimulationPipeline::new(config.simulation.clone());
        Self::with_pipeline(config, pipeline)
    }
}

impl<S: Simulator, D: Decoder> OptimizationLoop<S, D> {
    pub fn with_pipeline(config: OptimizerConfig, pipeline: NoiseSimulationPipeline<S, D>) -> Result<Self> {
        if config.iterations == 0 {
            return Err(StabOptError::invalid("iterations", 0, "at least one iteration"));
        }
        Ok(Self {
            config,
            pipeline,
            balancer: GateBalancer::default(),
            connectivity: ConnectivityOptimizer::default(),
        })
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Runs the search from `initial` for the configured number of
    /// iterations.
    pub fn run(&self, params: CodeParameters, initial: ParityMatrixPair) -> Result<OptimizationOutcome> {
        let iterations = self.config.iterations;
        let seed = self.config.seed;
        let m = initial.num_checks();
        let graph = match &self.config.coupling {
            Some(spec) => Some(spec.build(m + initial.num_data_qubits())?),
            None => None,
        };

        let initial_error_rate = self.pipeline.evaluate(&initial, stream_seed(seed, 0))?.error_rate;
        info!(n = params.n, k = params.k, d = params.d, iterations, initial_error_rate, "starting optimization");

        let mut state = OptimizationState::new(initial);
        let mut trace = Vec::with_capacity(iterations);
        for i in 0..iterations {
            let base = 1 + 2 * i as u64;
            let (balanced, routed) = self.iterate(&state.current, m, graph.as_ref(), base)?;
            let winner = if routed.error_rate < balanced.error_rate {
                &routed
            } else {
                &balanced
            };
            state.advance(winner);

            let record = IterationRecord {
                iteration: i + 1,
                balanced_rate: balanced.error_rate,
                routed_rate: routed.error_rate,
                winner: winner.candidate,
                routed_depth: routed.depth,
                swap_count: routed.swap_count,
                best_error_rate: state.best_error_rate,
            };
            info!(
                iteration = record.iteration,
                balanced = record.balanced_rate,
                routed = record.routed_rate,
                winner = ?record.winner,
                best = record.best_error_rate,
                "iteration complete"
            );
            trace.push(record);
        }

        let final_error_rate = self
            .pipeline
            .evaluate(&state.current, stream_seed(seed, 1 + 2 * iterations as u64))?
            .error_rate;
        let best = state
            .best
            .ok_or(StabOptError::invalid("iterations", 0, "at least one iteration"))?;
        let best_error_rate = state.best_error_rate;
        let improvement = relative_improvement(final_error_rate, best_error_rate);
        info!(best_error_rate, final_error_rate, improvement, "optimization finished");

        Ok(OptimizationOutcome {
            params,
            best,
            best_error_rate,
            final_error_rate,
            improvement,
            initial_error_rate,
            improvement_over_initial: relative_improvement(initial_error_rate, best_error_rate),
            history: state.history,
            iterations,
            trace,
        })
    }

    /// Builds and scores both candidates derived from `current`.
    fn iterate(
        &self,
        current: &ParityMatrixPair,
        m: usize,
        graph: Option<&CouplingGraph>,
        stream: u64,
    ) -> Result<(CandidateResult, CandidateResult)> {
        let circuit = to_circuit(current);

        let balanced_circuit = self.balancer.balance(&circuit);
        let balanced_parity = to_parity(&balanced_circuit, m)?;

        let routing = self.connectivity.optimize(&circuit, graph)?;
        let routed_parity = to_parity(&routing.routed.logical_circuit(), m)?;

        let seed = self.config.seed;
        let score_balanced = || self.pipeline.evaluate(&balanced_parity, stream_seed(seed, stream));
        let score_routed = || self.pipeline.evaluate(&routed_parity, stream_seed(seed, stream + 1));
        let (a, b): (Result<LogicalErrorEstimate>, Result<LogicalErrorEstimate>) = if self.config.parallel {
            rayon::join(score_balanced, score_routed)
        } else {
            (score_balanced(), score_routed())
        };
        let (a, b) = (a?, b?);
        debug!(balanced = a.error_rate, routed = b.error_rate, level = routing.routed.level, "scored candidates");

        Ok((
            CandidateResult {
                candidate: Candidate::Balanced,
                parity: balanced_parity,
                error_rate: a.error_rate,
                mistakes: a.mistakes,
                depth: balanced_circuit.depth(),
                swap_count: 0,
            },
            CandidateResult {
                candidate: Candidate::Routed,
                parity: routed_parity,
                error_rate: b.error_rate,
                mistakes: b.mistakes,
                depth: routing.routed.depth,
                swap_count: routing.routed.swap_count,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick(iterations: usize) -> OptimizerConfig {
        OptimizerConfig {
            iterations,
            simulation: SimulationConfig {
                rounds: 2,
                shots: 20,
                ..SimulationConfig::default()
            },
            seed: 5,
            ..OptimizerConfig::default()
        }
    }

    fn code() -> ParityMatrixPair {
        ParityMatrixPair::from_strings(&["ZZI", "IZZ"]).unwrap()
    }

    #[test]
    fn zero_iterations_rejected() {
        assert!(matches!(
            OptimizationLoop::new(quick(0)),
            Err(StabOptError::InvalidParameter { name: "iterations", .. })
        ));
    }

    #[test]
    fn improvement_formula() {
        assert_eq!(relative_improvement(0.0, 0.0), 0.0);
        assert_eq!(relative_improvement(0.5, 0.25), 50.0);
    }

    #[test]
    fn stream_seeds_differ() {
        assert_eq!(stream_seed(7, 3), stream_seed(7, 3));
        assert_ne!(stream_seed(7, 0), stream_seed(7, 1));
        assert_ne!(stream_seed(7, 1), stream_seed(8, 1));
    }

    #[test]
    fn state_keeps_strict_best_and_drifts() {
        let a = code();
        let b = ParityMatrixPair::from_strings(&["ZZZ", "IZZ"]).unwrap();
        let result = |parity: &ParityMatrixPair, rate| CandidateResult {
            candidate: Candidate::Balanced,
            parity: parity.clone(),
            error_rate: rate,
            mistakes: 0,
            depth: 0,
            swap_count: 0,
        };
        let mut s = OptimizationState::new(a.clone());
        s.advance(&result(&a, 0.2));
        s.advance(&result(&b, 0.2));
        assert_eq!(s.best, Some(a.clone()));
        assert_eq!(s.current, b);
        s.advance(&result(&b, 0.3));
        assert_eq!(s.best_error_rate, 0.2);
        assert_eq!(s.history, vec![0.2, 0.2, 0.3]);
    }

    #[test]
    fn run_is_reproducible_across_threading() {
        let sequential = OptimizerConfig {
            parallel: false,
            ..quick(3)
        };
        let a = OptimizationLoop::new(quick(3)).unwrap().run(CodeParameters::new(3, 1, 1), code()).unwrap();
        let b = OptimizationLoop::new(sequential).unwrap().run(CodeParameters::new(3, 1, 1), code()).unwrap();
        assert_eq!(a.history, b.history);
        assert_eq!(a.best, b.best);
        assert_eq!(a.history.len(), 3);
        assert_eq!(a.trace.len(), 3);
    }

    #[test]
    fn coupling_graph_is_honoured() {
        let config = OptimizerConfig {
            coupling: Some(CouplingSpec::Line),
            ..quick(1)
        };
        let out = OptimizationLoop::new(config).unwrap().run(CodeParameters::new(3, 1, 1), code()).unwrap();
        // Both heuristics preserve the code; only its circuit changes.
        assert_eq!(out.best, code());
        assert_eq!(out.history.len(), 1);
    }
}
