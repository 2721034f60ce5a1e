mod export;
mod service;
mod stats;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use stabopt_common::params::CodeParameters;
use stabopt_core::circuit::to_circuit;
use stabopt_core::coupling::CouplingSpec;
use stabopt_core::optimizer::{OptimizationLoop, OptimizerConfig};
use stabopt_core::parity::ParityMatrixPair;
use stabopt_core::pipeline::NoiseSimulationPipeline;
use stabopt_io::code_table::{BuiltinCodeTable, CodeTable, load_code, parse_code_rows};
use stabopt_io::parser;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "stabopt", version, about = "Stabilizer circuit optimizer")]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// JSON file with optimizer and simulation settings.
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Which code to start from.
#[derive(Args, Debug)]
struct CodeArgs {
    #[arg(short, long, default_value_t = 5)]
    n: usize,
    #[arg(short, long, default_value_t = 1)]
    k: usize,
    #[arg(short, long, default_value_t = 3)]
    d: usize,
    /// Row text file (`[x-bits|z-bits]` per line) instead of the code table.
    /// `n` and `k` are then taken from the matrices.
    #[arg(long, value_name = "FILE")]
    code: Option<PathBuf>,
}

/// Overrides of the simulation settings.
#[derive(Args, Debug)]
struct SimArgs {
    #[arg(short, long)]
    p: Option<f64>,
    #[arg(long)]
    rounds: Option<usize>,
    #[arg(long)]
    shots: Option<usize>,
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CouplingShape {
    Full,
    Line,
    Ring,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for a lower logical error rate realization of a code.
    Optimize {
        #[command(flatten)]
        code: CodeArgs,
        #[command(flatten)]
        sim: SimArgs,
        #[arg(short, long)]
        iterations: Option<usize>,
        #[arg(long, value_enum)]
        coupling: Option<CouplingShape>,
        /// Score candidates one after the other.
        #[arg(long)]
        sequential: bool,
        /// Write the full outcome as JSON.
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Estimate the logical error rate of a code once.
    Simulate {
        #[command(flatten)]
        code: CodeArgs,
        #[command(flatten)]
        sim: SimArgs,
        /// Sample this noisy circuit file instead of building one for the code.
        #[arg(long, value_name = "FILE")]
        circuit: Option<PathBuf>,
        /// Decode against this .dem file instead of the circuit's own model.
        #[arg(long, value_name = "FILE", requires = "circuit")]
        dem: Option<PathBuf>,
    },
    /// Print a code's measurement circuit, or its noisy memory experiment.
    Circuit {
        #[command(flatten)]
        code: CodeArgs,
        #[command(flatten)]
        sim: SimArgs,
        #[arg(long)]
        memory: bool,
    },
    /// Write a code's memory experiment as circuit, .dem and .b8 files.
    Export {
        #[command(flatten)]
        code: CodeArgs,
        #[command(flatten)]
        sim: SimArgs,
        #[arg(long, default_value = "memory.stim")]
        circuit: PathBuf,
        #[arg(long, default_value = "memory.dem")]
        dem: PathBuf,
        #[arg(long, default_value = "memory.b8")]
        b8: PathBuf,
        #[arg(long)]
        obs: Option<PathBuf>,
    },
    /// Answer a JSON optimization request read from a file or stdin.
    Request {
        #[arg(value_name = "FILE")]
        input: Option<PathBuf>,
    },
}

fn load_config(path: Option<&Path>) -> Result<OptimizerConfig> {
    match path {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            let text = fs::read_to_string(path).context("Failed to open config file")?;
            serde_json::from_str(&text).context("Failed to parse config file")
        }
        None => Ok(OptimizerConfig::default()),
    }
}

fn apply_sim(config: &mut OptimizerConfig, sim: &SimArgs) {
    if let Some(p) = sim.p {
        config.simulation.p = p;
    }
    if let Some(r) = sim.rounds {
        config.simulation.rounds = r;
    }
    if let Some(s) = sim.shots {
        config.simulation.shots = s;
    }
    if let Some(seed) = sim.seed {
        config.seed = seed;
    }
}

/// Starting code and its `[[n, k, d]]` parameters.
///
/// Table codes also fix the measured logical operator unless the
/// configuration already names one.
fn load_initial(code: &CodeArgs, config: &mut OptimizerConfig) -> Result<(ParityMatrixPair, CodeParameters)> {
    match &code.code {
        Some(path) => {
            let text = fs::read_to_string(path).context("Failed to open code file")?;
            let parity = parse_code_rows(&text)?;
            let params = file_params(&parity, code.d);
            info!(n = params.n, k = params.k, "Loaded code from {}", path.display());
            Ok((parity, params))
        }
        None => {
            let parity = load_code(&BuiltinCodeTable, code.n, code.k)?;
            if config.simulation.logical_support.is_none() {
                config.simulation.logical_support = BuiltinCodeTable.logical_support(code.n, code.k)?;
            }
            Ok((parity, CodeParameters::new(code.n, code.k, code.d)))
        }
    }
}

fn file_params(parity: &ParityMatrixPair, d: usize) -> CodeParameters {
    let n = parity.num_data_qubits();
    CodeParameters::new(n, n.saturating_sub(parity.num_independent_checks()), d)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level_filter = cli
        .log_level
        .parse::<tracing_subscriber::filter::LevelFilter>()
        .unwrap_or(tracing_subscriber::filter::LevelFilter::INFO);
    tracing_subscriber::fmt()
        .with_max_level(log_level_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Optimize {
            code,
            sim,
            iterations,
            coupling,
            sequential,
            output,
        } => {
            apply_sim(&mut config, &sim);
            if let Some(i) = iterations {
                config.iterations = i;
            }
            if let Some(shape) = coupling {
                config.coupling = Some(match shape {
                    CouplingShape::Full => CouplingSpec::FullyConnected,
                    CouplingShape::Line => CouplingSpec::Line,
                    CouplingShape::Ring => CouplingSpec::Ring,
                });
            }
            if sequential {
                config.parallel = false;
            }

            let (initial, params) = load_initial(&code, &mut config)?;
            println!("Initial stabilizers of [[{}, {}, {}]]:", params.n, params.k, params.d);
            for s in initial.stabilizers() {
                println!("  {}", s);
            }
            let outcome = OptimizationLoop::new(config)?.run(params, initial)?;

            println!("\nBest stabilizers:");
            for s in outcome.best.stabilizers() {
                println!("  {}", s);
            }
            println!("{}", outcome.best);
            println!("Initial error rate: {:.4}", outcome.initial_error_rate);
            println!("Best error rate:    {:.4}", outcome.best_error_rate);
            println!("Final error rate:   {:.4}", outcome.final_error_rate);
            println!("Improvement:        {:.2} %", outcome.improvement);
            println!("Over initial:       {:.2} %", outcome.improvement_over_initial);
            stats::ErrorRateStats::from_rates(&outcome.history).print_report();

            if let Some(path) = output {
                let json = serde_json::to_string_pretty(&outcome)?;
                fs::write(&path, json).context("Failed to write outcome")?;
                info!("Outcome written to {}", path.display());
            }
        }
        Commands::Simulate { code, sim, circuit, dem } => {
            apply_sim(&mut config, &sim);
            let estimate = match circuit {
                Some(path) => {
                    let pipeline = NoiseSimulationPipeline::new(config.simulation.clone());
                    let circuit = parser::load_circuit_file(&path)?;
                    let model = dem.map(parser::load_dem_file).transpose()?;
                    pipeline.evaluate_circuit(&circuit, model.as_ref(), config.seed)?
                }
                None => {
                    let (initial, _) = load_initial(&code, &mut config)?;
                    NoiseSimulationPipeline::new(config.simulation.clone()).evaluate(&initial, config.seed)?
                }
            };
            println!("{}", serde_json::to_string_pretty(&estimate)?);
        }
        Commands::Circuit { code, sim, memory } => {
            apply_sim(&mut config, &sim);
            let (initial, _) = load_initial(&code, &mut config)?;
            if memory {
                let circuit = NoiseSimulationPipeline::new(config.simulation.clone()).build_circuit(&initial)?;
                print!("{}", circuit);
            } else {
                let circuit = to_circuit(&initial);
                print!("{}", circuit);
                println!("# depth {}", circuit.depth());
                for (s, w) in initial.stabilizers().iter().zip(initial.row_weights()) {
                    println!("# {} weight {}", s, w);
                }
                let usage: Vec<String> = initial.column_usage().iter().map(|u| u.to_string()).collect();
                println!("# qubit usage {}", usage.join(" "));
            }
        }
        Commands::Export {
            code,
            sim,
            circuit,
            dem,
            b8,
            obs,
        } => {
            apply_sim(&mut config, &sim);
            let (initial, _) = load_initial(&code, &mut config)?;
            let summary = export::export_experiment(
                &initial,
                &config.simulation,
                config.seed,
                export::ExportPaths {
                    circuit: Some(&circuit),
                    dem: Some(&dem),
                    detectors: Some(&b8),
                    observables: obs.as_deref(),
                },
            )?;
            println!(
                "Wrote {} detectors, {} error mechanisms, {} shots.",
                summary.num_detectors, summary.mechanisms, summary.shots
            );
        }
        Commands::Request { input } => {
            let body = match input {
                Some(path) => fs::read_to_string(&path).context("Failed to open request")?,
                None => {
                    let mut s = String::new();
                    std::io::stdin().read_to_string(&mut s)?;
                    s
                }
            };
            if body.trim().is_empty() {
                bail!("empty request");
            }
            let response = service::respond(&body, &config, &BuiltinCodeTable);
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }
    Ok(())
}
