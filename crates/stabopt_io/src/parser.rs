//! Parsers for the circuit and detector-error-model text forms.
//!
//! Circuits are written one instruction per line as
//! `NAME(arg, ...) target ... rec[-k] ...`; error models as
//! `error(p) D0 D3 L0` lines plus optional `detector` and
//! `logical_observable` declarations. `#` starts a comment in both.

use anyhow::{Context, Result, anyhow, bail};
use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{char, digit1, space0, space1},
    combinator::{all_consuming, map, map_res, opt},
    multi::{many0, separated_list0},
    number::complete::double,
    sequence::{delimited, preceded, terminated, tuple},
};
use stabopt_common::gate::{GateKind, Operation};
use stabopt_core::circuit::CircuitModel;
use stabopt_core::dem::{DemError, DetectorErrorModel};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// A qubit index or a measurement-record lookback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Qubit(usize),
    Record(usize),
}

/// One parsed line: name, parenthesized arguments, targets.
#[derive(Debug, Clone, PartialEq)]
struct Instruction<'a> {
    name: &'a str,
    args: Vec<f64>,
    targets: Vec<Target>,
}

fn number(input: &str) -> IResult<&str, usize> {
    map_res(digit1, |s: &str| s.parse::<usize>())(input)
}

fn name(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_')(input)
}

fn arguments(input: &str) -> IResult<&str, Vec<f64>> {
    delimited(
        char('('),
        separated_list0(delimited(space0, char(','), space0), preceded(space0, double)),
        preceded(space0, char(')')),
    )(input)
}

fn target(input: &str) -> IResult<&str, Target> {
    alt((
        map(delimited(tag("rec[-"), number, char(']')), Target::Record),
        map(number, Target::Qubit),
    ))(input)
}

fn instruction(input: &str) -> IResult<&str, Instruction<'_>> {
    map(
        all_consuming(terminated(
            tuple((name, opt(arguments), many0(preceded(space1, target)))),
            space0,
        )),
        |(name, args, targets)| Instruction {
            name,
            args: args.unwrap_or_default(),
            targets,
        },
    )(input)
}

/// Content of a line without its comment, or `None` when nothing is left.
fn content(line: &str) -> Option<&str> {
    let line = line.split('#').next().unwrap_or("").trim();
    (!line.is_empty()).then_some(line)
}

fn parse_line(line: &str, number: usize) -> Result<Instruction<'_>> {
    instruction(line)
        .map(|(_, inst)| inst)
        .map_err(|e| anyhow!("line {}: cannot parse {:?}: {}", number, line, e))
}

/// Parses the circuit text form.
///
/// Single-qubit gates and measurements with several targets expand into one
/// operation per target, two-qubit gates into one operation per pair.
/// Measurements write consecutive classical bits. The qubit count is one
/// past the largest qubit named.
pub fn parse_circuit(text: &str) -> Result<CircuitModel> {
    let mut ops = Vec::new();
    let mut measurements = 0usize;
    let mut max_qubit: Option<usize> = None;

    for (i, raw) in text.lines().enumerate() {
        let Some(line) = content(raw) else { continue };
        let inst = parse_line(line, i + 1)?;
        let kind = GateKind::from_name(inst.name)
            .ok_or_else(|| anyhow!("line {}: unknown instruction {}", i + 1, inst.name))?;

        let mut qubits = Vec::new();
        let mut records = Vec::new();
        for t in &inst.targets {
            match *t {
                Target::Qubit(q) => qubits.push(q),
                Target::Record(k) => records.push(k),
            }
        }
        if let Some(&q) = qubits.iter().max() {
            max_qubit = Some(max_qubit.map_or(q, |m| m.max(q)));
        }

        match kind.arity() {
            Some(1) if kind == GateKind::M => {
                for q in qubits {
                    ops.push(Operation::measure(q, measurements));
                    measurements += 1;
                }
            }
            Some(1) => ops.extend(qubits.into_iter().map(|q| Operation::single(kind, q))),
            Some(2) => {
                if qubits.len() % 2 != 0 {
                    bail!("line {}: {} needs an even number of targets", i + 1, kind);
                }
                ops.extend(qubits.chunks_exact(2).map(|p| Operation::pair(kind, p[0], p[1])));
            }
            _ => ops.push(Operation {
                kind,
                qubits,
                classical: None,
                args: inst.args,
                records,
            }),
        }
    }

    let num_qubits = max_qubit.map_or(0, |q| q + 1);
    let circuit = CircuitModel::with_operations(num_qubits, measurements, ops);
    circuit.validate().context("circuit is inconsistent")?;
    debug!(num_qubits, operations = circuit.len(), "parsed circuit");
    Ok(circuit)
}

/// Parses the detector-error-model text form.
///
/// Counts cover every detector and observable mentioned on any line.
/// Instructions other than `error`, `detector` and `logical_observable` are
/// skipped with a warning.
pub fn parse_dem(text: &str) -> Result<DetectorErrorModel> {
    let mut errors = Vec::new();
    let mut num_detectors = 0usize;
    let mut num_observables = 0usize;

    for (i, raw) in text.lines().enumerate() {
        let Some(line) = content(raw) else { continue };
        let (rest, (keyword, args)) = tuple((name, opt(arguments)))(line)
            .map_err(|e| anyhow!("line {}: cannot parse {:?}: {}", i + 1, line, e))?;
        if !matches!(keyword, "error" | "detector" | "logical_observable") {
            warn!(line = i + 1, instruction = keyword, "skipping unsupported instruction");
            continue;
        }

        let mut detectors = Vec::new();
        let mut observables = Vec::new();
        for token in rest.split_whitespace() {
            if token == "^" {
                continue;
            }
            let index = |prefix: char| -> Result<usize> {
                token
                    .strip_prefix(prefix)
                    .and_then(|s| s.parse().ok())
                    .ok_or_else(|| anyhow!("line {}: bad target {}", i + 1, token))
            };
            if token.starts_with('D') {
                detectors.push(index('D')?);
            } else if token.starts_with('L') {
                observables.push(index('L')?);
            } else {
                bail!("line {}: bad target {}", i + 1, token);
            }
        }
        if let Some(&d) = detectors.iter().max() {
            num_detectors = num_detectors.max(d + 1);
        }
        if let Some(&o) = observables.iter().max() {
            num_observables = num_observables.max(o + 1);
        }

        if keyword == "error" {
            let probability = args
                .and_then(|a| a.first().copied())
                .ok_or_else(|| anyhow!("line {}: error without probability", i + 1))?;
            if !(0.0..=1.0).contains(&probability) {
                bail!("line {}: probability {} outside [0, 1]", i + 1, probability);
            }
            detectors.sort_unstable();
            observables.sort_unstable();
            errors.push(DemError {
                probability,
                detectors,
                observables,
            });
        }
    }

    Ok(DetectorErrorModel::new(num_detectors, num_observables, errors))
}

pub fn load_circuit_file<P: AsRef<Path>>(path: P) -> Result<CircuitModel> {
    let text = fs::read_to_string(path).context("Failed to open circuit file")?;
    parse_circuit(&text)
}

/// Loads a `.dem` file.
pub fn load_dem_file<P: AsRef<Path>>(path: P) -> Result<DetectorErrorModel> {
    let text = fs::read_to_string(path).context("Failed to open .dem file")?;
    parse_dem(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stabopt_core::circuit::to_circuit;
    use stabopt_core::parity::ParityMatrixPair;
    use stabopt_core::syndrome::{NoiseModel, SyndromeCircuitBuilder};

    #[test]
    fn instruction_grammar() {
        let (_, inst) = instruction("DETECTOR(1, 0.5) rec[-1] rec[-5]").unwrap();
        assert_eq!(inst.name, "DETECTOR");
        assert_eq!(inst.args, vec![1.0, 0.5]);
        assert_eq!(inst.targets, vec![Target::Record(1), Target::Record(5)]);

        let (_, inst) = instruction("CNOT 0 5").unwrap();
        assert!(inst.args.is_empty());
        assert_eq!(inst.targets, vec![Target::Qubit(0), Target::Qubit(5)]);

        assert!(instruction("H 0 x").is_err());
    }

    #[test]
    fn printed_circuits_parse_back() {
        let s = ParityMatrixPair::from_strings(&["XIYZX", "ZIXYZ"]).unwrap();
        let circuit = SyndromeCircuitBuilder::new(2, NoiseModel::bit_flip(0.07))
            .build(&s.stabilizers())
            .unwrap();
        let parsed = parse_circuit(&circuit.to_string()).unwrap();
        assert_eq!(parsed, circuit);

        let plain = to_circuit(&s);
        assert_eq!(parse_circuit(&plain.to_string()).unwrap(), plain);
    }

    #[test]
    fn multi_target_lines_expand() {
        let c = parse_circuit("# prep\nH 0 1\nCX 0 2 1 3\nM 2 3  # readout\n").unwrap();
        assert_eq!(c.num_qubits, 4);
        assert_eq!(c.num_clbits, 2);
        assert_eq!(c.len(), 6);
        assert_eq!(c.count(GateKind::CX), 2);
        assert_eq!(c.operations()[5].classical, Some(1));
    }

    #[test]
    fn circuit_errors() {
        assert!(parse_circuit("TOFFOLI 0 1 2").is_err());
        assert!(parse_circuit("CZ 0 1 2").is_err());
        assert!(parse_circuit("M 0\nDETECTOR rec[-2]").is_err());
    }

    #[test]
    fn error_models_parse_back() {
        let s = ParityMatrixPair::from_strings(&["ZZI", "IZZ"]).unwrap();
        let circuit = SyndromeCircuitBuilder::new(2, NoiseModel::bit_flip(0.1))
            .build(&s.stabilizers())
            .unwrap();
        let dem = DetectorErrorModel::from_circuit(&circuit).unwrap();
        assert_eq!(parse_dem(&dem.to_string()).unwrap(), dem);
    }

    #[test]
    fn dem_details() {
        let dem = parse_dem("error(0.25) D3 ^ D1 L0\nshift_detectors 2\ndetector(1, 2) D5\n").unwrap();
        assert_eq!(dem.num_detectors, 6);
        assert_eq!(dem.num_observables, 1);
        assert_eq!(dem.errors[0].detectors, vec![1, 3]);
        assert!(parse_dem("error D0").is_err());
        assert!(parse_dem("error(1.5) D0").is_err());
        assert!(parse_dem("error(0.1) X0").is_err());
    }
}
