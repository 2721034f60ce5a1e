//! Gate balancing: redundancy elision followed by greedy parallel placement.
//!
//! Elision only removes operations whose removal cannot change the circuit's
//! action: an adjacent identical pair of a self-inverse unitary composes to
//! the identity, and a repeated reset is absorbed by the first one. Placement
//! then packs the surviving operations into depth buckets whose operand sets
//! are pairwise disjoint.

use crate::circuit::CircuitModel;
use serde::{Deserialize, Serialize};
use stabopt_common::gate::{GateKind, Operation};
use tracing::debug;

/// How an operation chooses its depth bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementPolicy {
    /// First bucket whose used set is disjoint from the operation's operands,
    /// searching from bucket zero. Operations sharing a qubit may change
    /// order.
    FirstFit,
    /// First disjoint bucket after the last bucket touching any operand.
    /// Operations sharing a qubit or classical bit keep their order, as do
    /// measurements among themselves.
    #[default]
    DependencyOrdered,
}

/// Summary of one balancing pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BalanceReport {
    pub elided: usize,
    pub depth_before: usize,
    pub depth_after: usize,
    pub buckets: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GateBalancer {
    policy: PlacementPolicy,
}

impl GateBalancer {
    pub fn new(policy: PlacementPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> PlacementPolicy {
        self.policy
    }

    pub fn balance(&self, circuit: &CircuitModel) -> CircuitModel {
        self.balance_with_report(circuit).0
    }

    pub fn balance_with_report(&self, circuit: &CircuitModel) -> (CircuitModel, BalanceReport) {
        let (kept, elided) = elide_redundant(circuit.operations());
        let buckets = place(&kept, circuit.num_qubits, self.policy);
        let num_buckets = buckets.len();
        let operations = buckets.into_iter().flat_map(|b| b.ops).collect();
        let balanced = CircuitModel::with_operations(circuit.num_qubits, circuit.num_clbits, operations);

        let report = BalanceReport {
            elided,
            depth_before: circuit.depth(),
            depth_after: balanced.depth(),
            buckets: num_buckets,
        };
        debug!(
            elided = report.elided,
            depth_before = report.depth_before,
            depth_after = report.depth_after,
            "balanced circuit"
        );
        (balanced, report)
    }
}

/// Removes sound adjacent redundancies. Returns the survivors and the number
/// of operations removed.
///
/// Cancellation cascades: after a pair cancels, the next operation is
/// compared against whatever now precedes it.
pub fn elide_redundant(ops: &[Operation]) -> (Vec<Operation>, usize) {
    let mut kept: Vec<Operation> = Vec::with_capacity(ops.len());
    let mut elided = 0;
    for op in ops {
        match kept.last() {
            Some(prev) if prev == op && op.kind.is_self_inverse() => {
                kept.pop();
                elided += 2;
            }
            Some(prev) if prev == op && op.kind.is_idempotent() => {
                elided += 1;
            }
            _ => kept.push(op.clone()),
        }
    }
    (kept, elided)
}

struct Bucket {
    used: Vec<usize>,
    ops: Vec<Operation>,
}

impl Bucket {
    fn is_free(&self, resources: &[usize]) -> bool {
        resources.iter().all(|r| !self.used.contains(r))
    }
}

/// Qubit operands followed by the classical target, offset past the qubits
/// so both share one index space.
fn resources(op: &Operation, num_qubits: usize) -> Vec<usize> {
    let mut r = op.qubits.clone();
    if let Some(c) = op.classical {
        r.push(num_qubits + c);
    }
    r
}

fn place(ops: &[Operation], num_qubits: usize, policy: PlacementPolicy) -> Vec<Bucket> {
    let mut buckets: Vec<Bucket> = Vec::new();
    // Lowest bucket later operations may use; raised by barriers.
    let mut floor = 0usize;
    let mut last_measure = 0usize;

    for op in ops {
        let res = resources(op, num_qubits);
        let start = match policy {
            PlacementPolicy::FirstFit => 0,
            PlacementPolicy::DependencyOrdered => {
                if res.is_empty() {
                    // Operand-free instructions (detectors, coordinate
                    // shifts) stay behind everything placed so far.
                    buckets.len().saturating_sub(1).max(floor)
                } else {
                    let after_dependency = buckets
                        .iter()
                        .rposition(|b| !b.is_free(&res))
                        .map_or(0, |i| i + 1);
                    let mut s = after_dependency.max(floor);
                    if op.kind == GateKind::M {
                        s = s.max(last_measure);
                    }
                    s
                }
            }
        };

        let idx = match (start..buckets.len()).find(|&i| buckets[i].is_free(&res)) {
            Some(i) => i,
            None => {
                buckets.push(Bucket {
                    used: Vec::new(),
                    ops: Vec::new(),
                });
                buckets.len() - 1
            }
        };
        buckets[idx].used.extend_from_slice(&res);
        buckets[idx].ops.push(op.clone());

        if policy == PlacementPolicy::DependencyOrdered {
            if res.is_empty() {
                floor = idx + 1;
            }
            if op.kind == GateKind::M {
                last_measure = idx;
            }
        }
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circuit(n: usize, ops: Vec<Operation>) -> CircuitModel {
        CircuitModel::with_operations(n, n, ops)
    }

    #[test]
    fn self_inverse_pairs_cancel_and_cascade() {
        let ops = vec![
            Operation::single(GateKind::H, 0),
            Operation::pair(GateKind::CX, 0, 1),
            Operation::pair(GateKind::CX, 0, 1),
            Operation::single(GateKind::H, 0),
            Operation::single(GateKind::X, 1),
        ];
        let (kept, elided) = elide_redundant(&ops);
        assert_eq!(elided, 4);
        assert_eq!(kept, vec![Operation::single(GateKind::X, 1)]);
    }

    #[test]
    fn non_involutions_survive() {
        let ops = vec![
            Operation::single(GateKind::S, 0),
            Operation::single(GateKind::S, 0),
            Operation::measure(0, 0),
            Operation::measure(0, 0),
            Operation::pair(GateKind::CX, 0, 1),
            Operation::pair(GateKind::CX, 1, 0),
        ];
        let (kept, elided) = elide_redundant(&ops);
        assert_eq!(elided, 0);
        assert_eq!(kept.len(), ops.len());
    }

    #[test]
    fn repeated_reset_collapses() {
        let ops = vec![
            Operation::single(GateKind::R, 2),
            Operation::single(GateKind::R, 2),
            Operation::single(GateKind::R, 2),
        ];
        let (kept, elided) = elide_redundant(&ops);
        assert_eq!((kept.len(), elided), (1, 2));
    }

    #[test]
    fn first_fit_packs_literally() {
        let c = circuit(
            3,
            vec![
                Operation::pair(GateKind::CX, 0, 1),
                Operation::single(GateKind::H, 1),
                Operation::single(GateKind::H, 2),
            ],
        );
        let (out, report) = GateBalancer::new(PlacementPolicy::FirstFit).balance_with_report(&c);
        assert_eq!(report.buckets, 2);
        assert_eq!(
            out.operations(),
            &[
                Operation::pair(GateKind::CX, 0, 1),
                Operation::single(GateKind::H, 2),
                Operation::single(GateKind::H, 1),
            ]
        );
    }

    #[test]
    fn dependency_order_is_kept_on_shared_qubits() {
        // FirstFit would hoist the last H into bucket 0 ahead of the CX on qubit 0.
        let c = circuit(
            3,
            vec![
                Operation::single(GateKind::H, 0),
                Operation::pair(GateKind::CX, 1, 2),
                Operation::pair(GateKind::CX, 0, 1),
                Operation::single(GateKind::Z, 2),
            ],
        );
        let out = GateBalancer::default().balance(&c);
        let pos = |op: &Operation| out.operations().iter().position(|o| o == op).unwrap();
        assert!(pos(&Operation::pair(GateKind::CX, 1, 2)) < pos(&Operation::pair(GateKind::CX, 0, 1)));
        assert!(pos(&Operation::pair(GateKind::CX, 1, 2)) < pos(&Operation::single(GateKind::Z, 2)));
        assert_eq!(out.depth(), 2);
    }

    #[test]
    fn measurements_keep_record_order() {
        let c = circuit(
            2,
            vec![
                Operation::single(GateKind::H, 0),
                Operation::single(GateKind::H, 0),
                Operation::single(GateKind::X, 0),
                Operation::measure(0, 0),
                Operation::measure(1, 1),
            ],
        );
        let out = GateBalancer::default().balance(&c);
        let ms: Vec<_> = out
            .operations()
            .iter()
            .filter(|o| o.kind == GateKind::M)
            .map(|o| o.qubits[0])
            .collect();
        assert_eq!(ms, vec![0, 1]);
    }

    #[test]
    fn detectors_stay_after_their_measurements() {
        let c = circuit(
            2,
            vec![
                Operation::measure(0, 0),
                Operation::detector(vec![1], vec![]),
                Operation::single(GateKind::H, 1),
            ],
        );
        let out = GateBalancer::default().balance(&c);
        assert_eq!(out.operations()[0], Operation::measure(0, 0));
        assert_eq!(out.operations()[1].kind, GateKind::DETECTOR);
        out.validate().unwrap();
    }
}
