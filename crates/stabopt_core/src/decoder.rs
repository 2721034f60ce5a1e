use crate::bit_utils::BitPack;
use crate::dem::DetectorErrorModel;
use crate::error::{Result, StabOptError};
use crate::sampler::ShotBits;
use rayon::prelude::*;

/// Predicts observable flips from detector samples.
pub trait Decoder: Sync {
    fn decode(&self, model: &DetectorErrorModel, detectors: &[ShotBits]) -> Result<Vec<ShotBits>>;
}

/// Min-sum belief propagation with an order-0 ordered-statistics fallback.
#[derive(Debug, Clone, Copy)]
pub struct BpOsdDecoder {
    pub max_iterations: usize,
    /// Scaling applied to every check-to-variable message.
    pub scaling: f64,
}

impl Default for BpOsdDecoder {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            scaling: 0.625,
        }
    }
}

impl Decoder for BpOsdDecoder {
    fn decode(&self, model: &DetectorErrorModel, detectors: &[ShotBits]) -> Result<Vec<ShotBits>> {
        if let Some(bad) = detectors.iter().find(|d| d.len() != model.num_detectors) {
            return Err(StabOptError::SampleWidthMismatch {
                expected: model.num_detectors,
                actual: bad.len(),
            });
        }
        let graph = TannerGraph::new(model);
        Ok(detectors
            .par_iter()
            .map(|syndrome| {
                let syndrome: Vec<bool> = syndrome.iter().by_vals().collect();
                let correction = self.decode_syndrome(&graph, &syndrome);
                graph.observables_of(&correction)
            })
            .collect())
    }
}

impl BpOsdDecoder {
    /// Most likely error for one syndrome, as one flag per mechanism.
    fn decode_syndrome(&self, graph: &TannerGraph, syndrome: &[bool]) -> Vec<bool> {
        if graph.priors.is_empty() || syndrome.iter().all(|&s| !s) {
            return vec![false; graph.priors.len()];
        }
        let (hard, posterior) = self.belief_propagation(graph, syndrome);
        if graph.satisfies(&hard, syndrome) {
            return hard;
        }
        osd0(graph, syndrome, &posterior).unwrap_or(hard)
    }

    fn belief_propagation(&self, graph: &TannerGraph, syndrome: &[bool]) -> (Vec<bool>, Vec<f64>) {
        let num_edges = graph.edge_var.len();
        let mut v2c: Vec<f64> = graph.edge_var.iter().map(|&v| graph.priors[v]).collect();
        let mut c2v = vec![0.0f64; num_edges];
        let mut posterior = graph.priors.clone();
        let mut hard = vec![false; graph.priors.len()];

        for _ in 0..self.max_iterations {
            for (check, edges) in graph.check_edges.iter().enumerate() {
                let mut sign = syndrome[check];
                let (mut min1, mut min2, mut argmin) = (f64::INFINITY, f64::INFINITY, usize::MAX);
                for &e in edges {
                    let m = v2c[e];
                    sign ^= m < 0.0;
                    let a = m.abs();
                    if a < min1 {
                        min2 = min1;
                        min1 = a;
                        argmin = e;
                    } else if a < min2 {
                        min2 = a;
                    }
                }
                for &e in edges {
                    let magnitude = if e == argmin { min2 } else { min1 };
                    let negative = sign ^ (v2c[e] < 0.0);
                    let value = self.scaling * if magnitude.is_finite() { magnitude } else { 0.0 };
                    c2v[e] = if negative { -value } else { value };
                }
            }

            for (var, edges) in graph.var_edges.iter().enumerate() {
                let total = graph.priors[var] + edges.iter().map(|&e| c2v[e]).sum::<f64>();
                posterior[var] = total;
                hard[var] = total < 0.0;
                for &e in edges {
                    v2c[e] = total - c2v[e];
                }
            }

            if graph.satisfies(&hard, syndrome) {
                break;
            }
        }
        (hard, posterior)
    }
}

/// Sparse parity-check structure of a detector error model.
///
/// Variables are error mechanisms, checks are detectors. Edge `e` joins
/// variable `edge_var[e]` to one of its detectors.
struct TannerGraph {
    priors: Vec<f64>,
    edge_var: Vec<usize>,
    var_edges: Vec<Vec<usize>>,
    check_edges: Vec<Vec<usize>>,
    var_checks: Vec<Vec<usize>>,
    var_observables: Vec<Vec<usize>>,
    num_observables: usize,
}

impl TannerGraph {
    fn new(model: &DetectorErrorModel) -> Self {
        let mut edge_var = Vec::new();
        let mut var_edges = Vec::with_capacity(model.errors.len());
        let mut check_edges = vec![Vec::new(); model.num_detectors];
        for (var, error) in model.errors.iter().enumerate() {
            let mut edges = Vec::with_capacity(error.detectors.len());
            for &d in &error.detectors {
                check_edges[d].push(edge_var.len());
                edges.push(edge_var.len());
                edge_var.push(var);
            }
            var_edges.push(edges);
        }
        Self {
            priors: model.errors.iter().map(|e| channel_llr(e.probability)).collect(),
            edge_var,
            var_edges,
            check_edges,
            var_checks: model.errors.iter().map(|e| e.detectors.clone()).collect(),
            var_observables: model.errors.iter().map(|e| e.observables.clone()).collect(),
            num_observables: model.num_observables,
        }
    }

    fn satisfies(&self, error: &[bool], syndrome: &[bool]) -> bool {
        let mut parity = vec![false; syndrome.len()];
        for (var, &flipped) in error.iter().enumerate() {
            if flipped {
                for &c in &self.var_checks[var] {
                    parity[c] ^= true;
                }
            }
        }
        parity == syndrome
    }

    fn observables_of(&self, error: &[bool]) -> ShotBits {
        let mut out = ShotBits::repeat(false, self.num_observables);
        for (var, &flipped) in error.iter().enumerate() {
            if flipped {
                for &o in &self.var_observables[var] {
                    let bit = out[o];
                    out.set(o, !bit);
                }
            }
        }
        out
    }
}

/// `ln((1 - p) / p)`, with `p` kept away from 0 and 1.
fn channel_llr(p: f64) -> f64 {
    let p = p.clamp(1e-12, 1.0 - 1e-12);
    ((1.0 - p) / p).ln()
}

/// Order-0 OSD: solves `H e = s` on the most reliable information set.
///
/// Columns are ranked by posterior log-likelihood, most likely flipped
/// first, and Gaussian elimination over GF(2) picks pivots in that order.
/// Non-pivot columns are set to zero. Returns `None` when the syndrome is
/// outside the column space.
fn osd0(graph: &TannerGraph, syndrome: &[bool], posterior: &[f64]) -> Option<Vec<bool>> {
    let n = posterior.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| posterior[a].total_cmp(&posterior[b]));

    // Row i: detector i over permuted columns, syndrome bit at position n.
    let words = BitPack::words(n + 1);
    let mut rows: Vec<Vec<u64>> = vec![vec![0u64; words]; syndrome.len()];
    for (pos, &var) in order.iter().enumerate() {
        for &c in &graph.var_checks[var] {
            BitPack::toggle(&mut rows[c], pos);
        }
    }
    for (c, &s) in syndrome.iter().enumerate() {
        BitPack::set(&mut rows[c], n, s);
    }

    let mut pivots: Vec<(usize, usize)> = Vec::new();
    let mut next_row = 0;
    for col in 0..n {
        if next_row == rows.len() {
            break;
        }
        let Some(found) = (next_row..rows.len()).find(|&r| BitPack::get(&rows[r], col)) else {
            continue;
        };
        rows.swap(next_row, found);
        let pivot = rows[next_row].clone();
        for (r, row) in rows.iter_mut().enumerate() {
            if r != next_row && BitPack::get(row, col) {
                BitPack::xor_into(row, &pivot);
            }
        }
        pivots.push((next_row, col));
        next_row += 1;
    }

    if rows[next_row..].iter().any(|r| BitPack::get(r, n)) {
        return None;
    }
    let mut error = vec![false; n];
    for (row, col) in pivots {
        error[order[col]] = BitPack::get(&rows[row], n);
    }
    Some(error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dem::DemError;

    fn mechanism(p: f64, detectors: &[usize], observables: &[usize]) -> DemError {
        DemError {
            probability: p,
            detectors: detectors.to_vec(),
            observables: observables.to_vec(),
        }
    }

    /// Distance-3 repetition code, one round: boundary, bulk, boundary.
    fn repetition() -> DetectorErrorModel {
        DetectorErrorModel::new(
            2,
            1,
            vec![
                mechanism(0.1, &[0], &[0]),
                mechanism(0.1, &[0, 1], &[]),
                mechanism(0.1, &[1], &[]),
            ],
        )
    }

    fn bits(values: &[bool]) -> ShotBits {
        values.iter().copied().collect()
    }

    #[test]
    fn single_faults_are_corrected() {
        let predicted = BpOsdDecoder::default()
            .decode(
                &repetition(),
                &[
                    bits(&[false, false]),
                    bits(&[true, false]),
                    bits(&[true, true]),
                    bits(&[false, true]),
                ],
            )
            .unwrap();
        let flips: Vec<bool> = predicted.iter().map(|p| p[0]).collect();
        assert_eq!(flips, vec![false, true, false, false]);
    }

    #[test]
    fn osd_solves_when_bp_stalls() {
        let graph = TannerGraph::new(&repetition());
        let syndrome = [true, true];
        // The bulk mechanism is least likely, so both boundaries are chosen.
        let posterior = [1.0, 3.0, 2.0];
        let e = osd0(&graph, &syndrome, &posterior).unwrap();
        assert!(graph.satisfies(&e, &syndrome));
        assert_eq!(e, vec![true, false, true]);
    }

    #[test]
    fn osd_reports_inconsistent_syndrome() {
        let model = DetectorErrorModel::new(2, 0, vec![mechanism(0.1, &[0, 1], &[])]);
        let graph = TannerGraph::new(&model);
        assert_eq!(osd0(&graph, &[true, false], &[0.0]), None);
    }

    #[test]
    fn width_is_checked() {
        let err = BpOsdDecoder::default()
            .decode(&repetition(), &[bits(&[true])])
            .unwrap_err();
        assert_eq!(err, StabOptError::SampleWidthMismatch { expected: 2, actual: 1 });
    }

    #[test]
    fn llr_sign() {
        assert!(channel_llr(0.1) > 0.0);
        assert!(channel_llr(0.9) < 0.0);
        assert!(channel_llr(0.0).is_finite());
    }
}
