//! JSON request/response boundary of the optimizer.
//!
//! A request names the code parameters and optionally the starting parity
//! matrices and run settings. Any failure is answered with
//! `{"error": message}`.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use stabopt_common::params::CodeParameters;
use stabopt_core::coupling::CouplingSpec;
use stabopt_core::optimizer::{OptimizationLoop, OptimizationOutcome, OptimizerConfig};
use stabopt_core::parity::ParityMatrixPair;
use stabopt_io::code_table::{CodeTable, load_code};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizeRequest {
    pub n: usize,
    pub k: usize,
    pub d: usize,
    #[serde(default)]
    pub x_part: Option<Vec<Vec<i64>>>,
    #[serde(default)]
    pub z_part: Option<Vec<Vec<i64>>>,
    #[serde(default)]
    pub iterations: Option<usize>,
    #[serde(default)]
    pub p: Option<f64>,
    #[serde(default)]
    pub rounds: Option<usize>,
    #[serde(default)]
    pub shots: Option<usize>,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub coupling: Option<CouplingSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizeResponse {
    pub n: usize,
    pub k: usize,
    pub d: usize,
    pub final_error_rate: f64,
    pub best_x_part: Vec<Vec<u8>>,
    pub best_z_part: Vec<Vec<u8>>,
    pub improvement: f64,
    pub error_rates: Vec<f64>,
    pub iterations: usize,
    pub best_error_rate: f64,
    pub initial_error_rate: f64,
    pub improvement_over_initial: f64,
}

impl From<OptimizationOutcome> for OptimizeResponse {
    fn from(out: OptimizationOutcome) -> Self {
        Self {
            n: out.params.n,
            k: out.params.k,
            d: out.params.d,
            final_error_rate: out.best_error_rate,
            best_x_part: out.best.x_part(),
            best_z_part: out.best.z_part(),
            improvement: out.improvement,
            error_rates: out.history,
            iterations: out.iterations,
            best_error_rate: out.best_error_rate,
            initial_error_rate: out.initial_error_rate,
            improvement_over_initial: out.improvement_over_initial,
        }
    }
}

impl OptimizeRequest {
    /// `base` with every setting the request carries applied on top.
    pub fn config(&self, base: &OptimizerConfig) -> OptimizerConfig {
        let mut config = base.clone();
        if let Some(v) = self.iterations {
            config.iterations = v;
        }
        if let Some(v) = self.p {
            config.simulation.p = v;
        }
        if let Some(v) = self.rounds {
            config.simulation.rounds = v;
        }
        if let Some(v) = self.shots {
            config.simulation.shots = v;
        }
        if let Some(v) = self.seed {
            config.seed = v;
        }
        if let Some(c) = &self.coupling {
            config.coupling = Some(c.clone());
        }
        config
    }

    /// Starting matrices: the ones in the request, or the table's code.
    pub fn initial_code(&self, table: &dyn CodeTable) -> Result<ParityMatrixPair> {
        match (&self.x_part, &self.z_part) {
            (Some(x), Some(z)) => Ok(ParityMatrixPair::from_rows(x, z)?),
            (None, None) => Ok(load_code(table, self.n, self.k)?),
            _ => bail!("x_part and z_part must be given together"),
        }
    }
}

pub fn handle(request: &OptimizeRequest, base: &OptimizerConfig, table: &dyn CodeTable) -> Result<OptimizeResponse> {
    let initial = request.initial_code(table)?;
    let mut config = request.config(base);
    if request.x_part.is_none() && config.simulation.logical_support.is_none() {
        config.simulation.logical_support = table.logical_support(request.n, request.k)?;
    }
    let params = CodeParameters::new(request.n, request.k, request.d);
    let outcome = OptimizationLoop::new(config)?.run(params, initial)?;
    Ok(outcome.into())
}

/// Answers a JSON request body. Never fails: errors become
/// `{"error": message}`.
pub fn respond(body: &str, base: &OptimizerConfig, table: &dyn CodeTable) -> Value {
    let result = serde_json::from_str::<OptimizeRequest>(body)
        .map_err(anyhow::Error::from)
        .and_then(|req| handle(&req, base, table))
        .and_then(|resp| Ok(serde_json::to_value(resp)?));
    match result {
        Ok(v) => v,
        Err(e) => json!({ "error": format!("{:#}", e) }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stabopt_io::code_table::BuiltinCodeTable;

    fn quick() -> OptimizerConfig {
        let mut c = OptimizerConfig::default();
        c.iterations = 2;
        c.simulation.rounds = 2;
        c.simulation.shots = 20;
        c
    }

    #[test]
    fn answers_with_the_result_fields() {
        let v = respond(r#"{"n": 5, "k": 1, "d": 3, "seed": 9}"#, &quick(), &BuiltinCodeTable);
        assert!(v.get("error").is_none(), "{v}");
        assert_eq!(v["n"], 5);
        assert_eq!(v["iterations"], 2);
        assert_eq!(v["error_rates"].as_array().unwrap().len(), 2);
        assert_eq!(v["best_x_part"].as_array().unwrap().len(), 4);
        assert!(v["improvement"].is_number());
    }

    #[test]
    fn final_rate_is_the_best_rate_found() {
        let v = respond(r#"{"n": 7, "k": 1, "d": 3, "seed": 4, "iterations": 3}"#, &quick(), &BuiltinCodeTable);
        assert!(v.get("error").is_none(), "{v}");
        let rates: Vec<f64> = v["error_rates"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r.as_f64().unwrap())
            .collect();
        let min = rates.iter().copied().fold(f64::INFINITY, f64::min);
        assert_eq!(v["final_error_rate"].as_f64().unwrap(), min);
        assert_eq!(v["final_error_rate"], v["best_error_rate"]);
    }

    #[test]
    fn explicit_matrices_override_the_table() {
        let body = r#"{"n": 3, "k": 1, "d": 1, "x_part": [[0,0,0],[0,0,0]], "z_part": [[1,1,0],[0,1,1]], "iterations": 1}"#;
        let v = respond(body, &quick(), &BuiltinCodeTable);
        assert_eq!(v["best_z_part"], json!([[1, 1, 0], [0, 1, 1]]));
        assert_eq!(v["iterations"], 1);
    }

    #[test]
    fn failures_become_error_objects() {
        let cases = [
            "not json",
            r#"{"n": 6, "k": 4, "d": 2}"#,
            r#"{"n": 3, "k": 1, "d": 1, "x_part": [[1]]}"#,
            r#"{"n": 5, "k": 1, "d": 3, "shots": 0}"#,
            r#"{"n": 5, "k": 1, "d": 3, "iterations": 0}"#,
            r#"{"n": 2, "k": 0, "d": 1, "x_part": [[1, 2]], "z_part": [[0, 0]]}"#,
        ];
        for body in cases {
            let v = respond(body, &quick(), &BuiltinCodeTable);
            assert!(v["error"].is_string(), "{body} gave {v}");
        }
    }
}
