//! End-to-end checks of the optimization loop on the five-qubit example.

use stabopt_common::params::CodeParameters;
use stabopt_core::balancer::GateBalancer;
use stabopt_core::circuit::{to_circuit, to_parity};
use stabopt_core::connectivity::ConnectivityOptimizer;
use stabopt_core::optimizer::{OptimizationLoop, OptimizerConfig};
use stabopt_core::parity::ParityMatrixPair;
use stabopt_core::pipeline::{NoiseSimulationPipeline, SimulationConfig};
use stabopt_core::routing::SwapRouter;
use stabopt_core::StabOptError;

fn example() -> ParityMatrixPair {
    ParityMatrixPair::from_rows(
        &[
            vec![1, 0, 1, 0, 1],
            vec![0, 0, 1, 1, 0],
            vec![0, 1, 1, 1, 1],
            vec![0, 0, 0, 0, 0],
        ],
        &[
            vec![0, 0, 1, 1, 0],
            vec![1, 0, 0, 1, 1],
            vec![0, 0, 0, 0, 0],
            vec![0, 1, 1, 1, 1],
        ],
    )
    .unwrap()
}

fn small_simulation() -> SimulationConfig {
    SimulationConfig {
        rounds: 2,
        shots: 40,
        ..SimulationConfig::default()
    }
}

fn config(iterations: usize) -> OptimizerConfig {
    OptimizerConfig {
        iterations,
        simulation: small_simulation(),
        seed: 2024,
        ..OptimizerConfig::default()
    }
}

#[test]
fn example_stabilizers() {
    let names: Vec<String> = example().stabilizers().iter().map(|s| s.to_string()).collect();
    assert_eq!(names, vec!["XIYZX", "ZIXYZ", "IXXXX", "IZZZZ"]);
}

#[test]
fn estimate_is_a_rate_over_shots() {
    let config = SimulationConfig {
        shots: 100,
        ..small_simulation()
    };
    let e = NoiseSimulationPipeline::new(config).evaluate(&example(), 1).unwrap();
    assert_eq!(e.shots, 100);
    assert!((0.0..=1.0).contains(&e.error_rate));
    assert!((e.error_rate * 100.0 - e.mistakes as f64).abs() < 1e-9);
}

#[test]
fn zero_shots_is_degenerate() {
    let config = SimulationConfig {
        shots: 0,
        ..small_simulation()
    };
    let err = NoiseSimulationPipeline::new(config).evaluate(&example(), 1).unwrap_err();
    assert_eq!(err, StabOptError::DegenerateSampling);

    let looped = OptimizerConfig {
        simulation: SimulationConfig {
            shots: 0,
            ..small_simulation()
        },
        ..crate::config(2)
    };
    let err = OptimizationLoop::new(looped)
        .unwrap()
        .run(CodeParameters::new(5, 1, 3), example())
        .unwrap_err();
    assert_eq!(err, StabOptError::DegenerateSampling);
}

#[test]
fn history_has_one_entry_per_iteration() {
    let out = OptimizationLoop::new(config(4))
        .unwrap()
        .run(CodeParameters::new(5, 1, 3), example())
        .unwrap();
    assert_eq!(out.iterations, 4);
    assert_eq!(out.history.len(), 4);
    assert_eq!(out.trace.len(), 4);
    for pair in out.trace.windows(2) {
        assert!(pair[1].best_error_rate <= pair[0].best_error_rate);
    }
    let min = out.history.iter().copied().fold(f64::INFINITY, f64::min);
    assert_eq!(out.best_error_rate, min);
    for (record, rate) in out.trace.iter().zip(&out.history) {
        assert_eq!(*rate, record.balanced_rate.min(record.routed_rate));
    }
}

#[test]
fn single_iteration_picks_a_known_code() {
    let initial = example();
    let m = initial.num_checks();
    let circuit = to_circuit(&initial);
    let balanced = to_parity(&GateBalancer::default().balance(&circuit), m).unwrap();
    let routed = ConnectivityOptimizer::<SwapRouter>::default().optimize(&circuit, None).unwrap();
    let routed = to_parity(&routed.routed.logical_circuit(), m).unwrap();

    let out = OptimizationLoop::new(config(1))
        .unwrap()
        .run(CodeParameters::new(5, 1, 3), initial.clone())
        .unwrap();
    assert_eq!(out.history.len(), 1);
    assert!(out.best == initial || out.best == balanced || out.best == routed);
    assert!(out.improvement.is_finite());
    assert!(out.improvement_over_initial.is_finite());
}

#[test]
fn fixed_seed_is_reproducible() {
    let run = || {
        OptimizationLoop::new(config(2))
            .unwrap()
            .run(CodeParameters::new(5, 1, 3), example())
            .unwrap()
    };
    let (a, b) = (run(), run());
    assert_eq!(a.history, b.history);
    assert_eq!(a.final_error_rate, b.final_error_rate);
    assert_eq!(a.initial_error_rate, b.initial_error_rate);
}
