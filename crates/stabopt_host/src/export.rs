//! Export of a code's memory experiment for external tools.
//!
//! Writes the noisy syndrome-extraction circuit (text form), its detector
//! error model (.dem) and sampled detector and observable flips (.b8).

use anyhow::{Context, Result};
use stabopt_core::dem::DetectorErrorModel;
use stabopt_core::parity::ParityMatrixPair;
use stabopt_core::pipeline::{NoiseSimulationPipeline, SimulationConfig};
use stabopt_core::sampler::{FrameSimulator, Simulator};
use stabopt_io::loader;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Output files of an export; any of them may be skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportPaths<'a> {
    pub circuit: Option<&'a Path>,
    pub dem: Option<&'a Path>,
    pub detectors: Option<&'a Path>,
    pub observables: Option<&'a Path>,
}

/// Counts of what was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSummary {
    pub num_detectors: usize,
    pub num_observables: usize,
    pub mechanisms: usize,
    pub shots: usize,
}

/// Builds the memory experiment of `parity` and writes the requested files.
///
/// Samples are drawn with `config.shots` shots from the stream `seed`,
/// only when a sample path is given.
pub fn export_experiment(
    parity: &ParityMatrixPair,
    config: &SimulationConfig,
    seed: u64,
    paths: ExportPaths<'_>,
) -> Result<ExportSummary> {
    let pipeline = NoiseSimulationPipeline::new(config.clone());
    let circuit = pipeline.build_circuit(parity)?;
    let dem = DetectorErrorModel::from_circuit(&circuit)?;

    if let Some(path) = paths.circuit {
        write_text(path, &circuit.to_string()).context("Failed to write circuit")?;
    }
    if let Some(path) = paths.dem {
        write_text(path, &dem.to_string()).context("Failed to write .dem file")?;
    }

    let mut shots = 0;
    if paths.detectors.is_some() || paths.observables.is_some() {
        info!(shots = config.shots, seed, "sampling");
        let batch = FrameSimulator.simulate(&circuit, config.shots, seed)?;
        if let Some(path) = paths.detectors {
            loader::write_b8_file(path, &batch.detectors, batch.num_detectors)?;
        }
        if let Some(path) = paths.observables {
            loader::write_b8_file(path, &batch.observables, batch.num_observables)?;
        }
        shots = batch.shots();
    }

    Ok(ExportSummary {
        num_detectors: dem.num_detectors,
        num_observables: dem.num_observables,
        mechanisms: dem.errors.len(),
        shots,
    })
}

fn write_text(path: &Path, text: &str) -> Result<()> {
    let mut file = BufWriter::new(File::create(path)?);
    file.write_all(text.as_bytes())?;
    file.flush()?;
    Ok(())
}
