//! Swap-based routing of circuits onto a coupling graph.
//!
//! Virtual qubits (circuit indices) are placed on physical qubits by a
//! [`Layout`]. Whenever a two-qubit gate acts on a non-adjacent physical
//! pair, SWAP gates are inserted to move the operands together and the
//! layout is updated. Four effort levels trade routing quality for work.

use crate::balancer::GateBalancer;
use crate::circuit::CircuitModel;
use crate::coupling::CouplingGraph;
use crate::error::{Result, StabOptError};
use stabopt_common::gate::{GateKind, Operation};
use tracing::trace;

/// Highest effort level understood by [`SwapRouter`].
pub const MAX_ROUTING_LEVEL: u8 = 3;

/// Placement of virtual qubits on physical qubits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    virt_to_phys: Vec<usize>,
    phys_to_virt: Vec<Option<usize>>,
}

impl Layout {
    /// Virtual qubit `i` on physical qubit `i`.
    pub fn trivial(num_virtual: usize, num_physical: usize) -> Self {
        let mut phys_to_virt = vec![None; num_physical];
        for (v, slot) in phys_to_virt.iter_mut().enumerate().take(num_virtual) {
            *slot = Some(v);
        }
        Self {
            virt_to_phys: (0..num_virtual).collect(),
            phys_to_virt,
        }
    }

    /// Layout from an explicit virtual-to-physical map.
    ///
    /// # Errors
    ///
    /// `QubitOutOfRange` when a target exceeds `num_physical`, and
    /// `InvalidParameter` when two virtual qubits share a physical qubit.
    pub fn from_mapping(virt_to_phys: Vec<usize>, num_physical: usize) -> Result<Self> {
        let mut phys_to_virt = vec![None; num_physical];
        for (v, &p) in virt_to_phys.iter().enumerate() {
            match phys_to_virt.get_mut(p) {
                None => {
                    return Err(StabOptError::QubitOutOfRange {
                        qubit: p,
                        num_qubits: num_physical,
                    });
                }
                Some(Some(_)) => {
                    return Err(StabOptError::invalid("layout", p, "injective mapping"));
                }
                Some(slot) => *slot = Some(v),
            }
        }
        Ok(Self {
            virt_to_phys,
            phys_to_virt,
        })
    }

    pub fn num_virtual(&self) -> usize {
        self.virt_to_phys.len()
    }

    pub fn num_physical(&self) -> usize {
        self.phys_to_virt.len()
    }

    pub fn physical(&self, v: usize) -> usize {
        self.virt_to_phys[v]
    }

    pub fn virtual_at(&self, p: usize) -> Option<usize> {
        self.phys_to_virt[p]
    }

    pub fn virtual_to_physical(&self) -> &[usize] {
        &self.virt_to_phys
    }

    /// Exchanges whatever sits on physical qubits `a` and `b`.
    pub fn swap_physical(&mut self, a: usize, b: usize) {
        self.phys_to_virt.swap(a, b);
        if let Some(v) = self.phys_to_virt[a] {
            self.virt_to_phys[v] = a;
        }
        if let Some(v) = self.phys_to_virt[b] {
            self.virt_to_phys[v] = b;
        }
    }
}

/// Output of one routing trial.
#[derive(Debug, Clone)]
pub struct RoutedCircuit {
    /// Circuit over physical qubits, SWAPs included.
    pub physical: CircuitModel,
    pub initial_layout: Layout,
    pub final_layout: Layout,
    pub swap_count: usize,
    pub depth: usize,
    pub level: u8,
}

impl RoutedCircuit {
    /// The routed circuit expressed on virtual qubits again.
    ///
    /// SWAPs are replayed into the layout and dropped; every other operation
    /// is relabeled to the virtual qubits it acted on. The result is the form
    /// the parity conversion reads.
    pub fn logical_circuit(&self) -> CircuitModel {
        let mut layout = self.initial_layout.clone();
        let mut ops = Vec::with_capacity(self.physical.len());
        for op in self.physical.operations() {
            if op.kind == GateKind::SWAP {
                if let [a, b] = op.qubits[..] {
                    layout.swap_physical(a, b);
                }
                continue;
            }
            ops.push(op.relabeled(|p| layout.virtual_at(p).unwrap_or(p)));
        }
        CircuitModel::with_operations(self.initial_layout.num_virtual(), self.physical.num_clbits, ops)
    }
}

/// A routing primitive: maps a circuit onto a coupling graph at an effort
/// level.
pub trait Route {
    fn route(&self, circuit: &CircuitModel, graph: &CouplingGraph, level: u8) -> Result<RoutedCircuit>;
}

/// Shortest-path swap router.
///
/// * level 0: trivial layout; the first operand walks the whole path.
/// * level 1: trivial layout; both operands walk toward the middle of the
///   path, then adjacent identical SWAP pairs are cancelled.
/// * level 2: interaction-weighted initial layout; each SWAP is chosen by
///   scoring the current gate together with a window of upcoming gates.
/// * level 3: level 2 followed by a balancing pass over the routed circuit.
#[derive(Debug, Clone, Copy)]
pub struct SwapRouter {
    /// Number of upcoming two-qubit gates scored at levels 2 and 3.
    pub lookahead: usize,
}

impl Default for SwapRouter {
    fn default() -> Self {
        Self { lookahead: 8 }
    }
}

impl Route for SwapRouter {
    fn route(&self, circuit: &CircuitModel, graph: &CouplingGraph, level: u8) -> Result<RoutedCircuit> {
        if level > MAX_ROUTING_LEVEL {
            return Err(StabOptError::invalid("routing level", level, "0..=3"));
        }
        if graph.num_qubits() < circuit.num_qubits {
            return Err(StabOptError::CouplingTooSmall {
                physical: graph.num_qubits(),
                required: circuit.num_qubits,
            });
        }
        circuit.validate()?;

        let dist = graph.distance_matrix();
        let initial_layout = if level >= 2 {
            interaction_layout(circuit, graph, &dist)
        } else {
            Layout::trivial(circuit.num_qubits, graph.num_qubits())
        };

        let pairs = circuit.two_qubit_pairs();
        let mut state = RouteState {
            graph,
            dist: &dist,
            component: graph.component_labels(),
            layout: initial_layout.clone(),
            ops: Vec::with_capacity(circuit.len()),
        };
        let mut next_pair = 0;
        for op in circuit.operations() {
            if op.kind.is_two_qubit() {
                let (a, b) = (op.qubits[0], op.qubits[1]);
                next_pair += 1;
                let end = (next_pair + self.lookahead).min(pairs.len());
                match level {
                    0 => state.walk_first(a, b)?,
                    1 => state.walk_both(a, b)?,
                    _ => state.walk_lookahead(a, b, &pairs[next_pair..end])?,
                }
            }
            let layout = &state.layout;
            let placed = op.relabeled(|v| layout.physical(v));
            state.ops.push(placed);
        }

        let RouteState { layout: final_layout, ops, .. } = state;
        let ops = if level >= 1 { cancel_swap_pairs(ops) } else { ops };
        let mut physical = CircuitModel::with_operations(graph.num_qubits(), circuit.num_clbits, ops);
        if level == 3 {
            physical = GateBalancer::default().balance(&physical);
        }

        let swap_count = physical.count(GateKind::SWAP);
        let depth = physical.depth();
        trace!(level, swap_count, depth, "routed circuit");
        Ok(RoutedCircuit {
            physical,
            initial_layout,
            final_layout,
            swap_count,
            depth,
            level,
        })
    }
}

struct RouteState<'a> {
    graph: &'a CouplingGraph,
    dist: &'a [Vec<Option<usize>>],
    component: Vec<usize>,
    layout: Layout,
    ops: Vec<Operation>,
}

impl RouteState<'_> {
    fn swap(&mut self, a: usize, b: usize) {
        self.layout.swap_physical(a, b);
        self.ops.push(Operation::pair(GateKind::SWAP, a.min(b), a.max(b)));
    }

    /// Physical positions of `a` and `b`, which must share a component.
    fn reachable(&self, a: usize, b: usize) -> Result<(usize, usize)> {
        let (pa, pb) = (self.layout.physical(a), self.layout.physical(b));
        if self.component[pa] != self.component[pb] {
            return Err(StabOptError::DisconnectedQubits { a: pa, b: pb });
        }
        Ok((pa, pb))
    }

    fn path(&self, a: usize, b: usize) -> Result<Vec<usize>> {
        let (pa, pb) = self.reachable(a, b)?;
        self.graph
            .shortest_path(pa, pb)
            .ok_or(StabOptError::DisconnectedQubits { a: pa, b: pb })
    }

    fn walk_first(&mut self, a: usize, b: usize) -> Result<()> {
        let path = self.path(a, b)?;
        for i in 0..path.len().saturating_sub(2) {
            self.swap(path[i], path[i + 1]);
        }
        Ok(())
    }

    fn walk_both(&mut self, a: usize, b: usize) -> Result<()> {
        let path = self.path(a, b)?;
        let moves = path.len().saturating_sub(2);
        let left = moves.div_ceil(2);
        let right = moves / 2;
        for i in 0..left {
            self.swap(path[i], path[i + 1]);
        }
        for j in 0..right {
            let end = path.len() - 1 - j;
            self.swap(path[end], path[end - 1]);
        }
        Ok(())
    }

    fn walk_lookahead(&mut self, a: usize, b: usize, window: &[(usize, usize)]) -> Result<()> {
        let unreachable = self.graph.num_qubits();
        loop {
            let (pa, pb) = self.reachable(a, b)?;
            let d = self.dist[pa][pb].ok_or(StabOptError::DisconnectedQubits { a: pa, b: pb })?;
            if d <= 1 {
                return Ok(());
            }

            let mut candidates: Vec<(usize, usize)> = [pa, pb]
                .iter()
                .flat_map(|&p| self.graph.neighbors(p).iter().map(move |&n| (p.min(n), p.max(n))))
                .collect();
            candidates.sort_unstable();
            candidates.dedup();

            let mut best: Option<((usize, usize), f64)> = None;
            for (s0, s1) in candidates {
                let moved = |p: usize| {
                    if p == s0 {
                        s1
                    } else if p == s1 {
                        s0
                    } else {
                        p
                    }
                };
                let nd = match self.dist[moved(pa)][moved(pb)] {
                    Some(nd) if nd < d => nd,
                    _ => continue,
                };
                let ahead: usize = window
                    .iter()
                    .map(|&(x, y)| {
                        let (px, py) = (moved(self.layout.physical(x)), moved(self.layout.physical(y)));
                        self.dist[px][py].unwrap_or(unreachable)
                    })
                    .sum();
                let score = nd as f64
                    + if window.is_empty() {
                        0.0
                    } else {
                        0.5 * ahead as f64 / window.len() as f64
                    };
                if best.is_none_or(|(_, s)| score < s) {
                    best = Some(((s0, s1), score));
                }
            }

            match best {
                Some(((s0, s1), _)) => self.swap(s0, s1),
                // A neighbour on a shortest path always shortens the distance,
                // so this only triggers on an inconsistent distance table.
                None => return Err(StabOptError::DisconnectedQubits { a: pa, b: pb }),
            }
        }
    }
}

/// Removes adjacent identical SWAP pairs, cascading.
fn cancel_swap_pairs(ops: Vec<Operation>) -> Vec<Operation> {
    let mut kept: Vec<Operation> = Vec::with_capacity(ops.len());
    for op in ops {
        if op.kind == GateKind::SWAP && kept.last() == Some(&op) {
            kept.pop();
        } else {
            kept.push(op);
        }
    }
    kept
}

/// Greedy placement that keeps strongly interacting virtual qubits close.
///
/// Virtual qubits are placed in order of interaction weight with the
/// already-placed set; each goes to the free physical qubit minimizing the
/// weighted distance to its placed partners. The first qubit of each
/// interacting group goes to the free physical qubit of highest degree.
/// Qubits without two-qubit gates fill the remaining slots in order.
fn interaction_layout(circuit: &CircuitModel, graph: &CouplingGraph, dist: &[Vec<Option<usize>>]) -> Layout {
    let nv = circuit.num_qubits;
    let np = graph.num_qubits();
    let mut weight = vec![vec![0usize; nv]; nv];
    for (a, b) in circuit.two_qubit_pairs() {
        weight[a][b] += 1;
        weight[b][a] += 1;
    }
    let total: Vec<usize> = weight.iter().map(|row| row.iter().sum()).collect();

    let mut placed: Vec<Option<usize>> = vec![None; nv];
    let mut used = vec![false; np];

    while let Some(v) = (0..nv)
        .filter(|&v| placed[v].is_none() && total[v] > 0)
        .max_by_key(|&v| {
            let attached: usize = (0..nv).filter(|&u| placed[u].is_some()).map(|u| weight[v][u]).sum();
            (attached, total[v], std::cmp::Reverse(v))
        })
    {
        let partners: Vec<(usize, usize)> = (0..nv)
            .filter_map(|u| placed[u].map(|p| (p, weight[v][u])))
            .filter(|&(_, w)| w > 0)
            .collect();
        let p = (0..np)
            .filter(|&p| !used[p])
            .min_by_key(|&p| {
                if partners.is_empty() {
                    (0, usize::MAX - graph.degree(p), p)
                } else {
                    let cost = partners
                        .iter()
                        .map(|&(q, w)| w * dist[p][q].unwrap_or(np))
                        .sum::<usize>();
                    (cost, 0, p)
                }
            });
        let Some(p) = p else { break };
        placed[v] = Some(p);
        used[p] = true;
    }

    let mut free = (0..np).filter(|&p| !used[p]);
    let mapping: Vec<usize> = placed
        .into_iter()
        .map(|slot| slot.or_else(|| free.next()).unwrap_or(0))
        .collect();
    Layout::from_mapping(mapping, np).unwrap_or_else(|_| Layout::trivial(nv, np))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_circuit() -> CircuitModel {
        let mut c = CircuitModel::new(5, 1);
        c.push(Operation::single(GateKind::H, 0));
        c.push(Operation::pair(GateKind::CX, 0, 4));
        c.push(Operation::pair(GateKind::CZ, 1, 3));
        c.push(Operation::measure(4, 0));
        c
    }

    fn all_adjacent(routed: &RoutedCircuit, g: &CouplingGraph) -> bool {
        routed
            .physical
            .operations()
            .iter()
            .filter(|op| op.kind.is_two_qubit())
            .all(|op| g.is_adjacent(op.qubits[0], op.qubits[1]))
    }

    #[test]
    fn layout_swap_tracks_both_directions() {
        let mut l = Layout::trivial(2, 3);
        l.swap_physical(1, 2);
        assert_eq!(l.physical(1), 2);
        assert_eq!(l.virtual_at(1), None);
        assert_eq!(l.virtual_at(2), Some(1));
        assert!(Layout::from_mapping(vec![0, 0], 2).is_err());
    }

    #[test]
    fn every_level_routes_on_a_line() {
        let g = CouplingGraph::line(5);
        let c = line_circuit();
        for level in 0..=MAX_ROUTING_LEVEL {
            let routed = SwapRouter::default().route(&c, &g, level).unwrap();
            assert!(all_adjacent(&routed, &g), "level {level}");
            let logical = routed.logical_circuit();
            let mut pairs = logical.two_qubit_pairs();
            pairs.sort_unstable();
            assert_eq!(pairs, vec![(0, 4), (1, 3)], "level {level}");
            assert_eq!(logical.count(GateKind::M), 1);
        }
    }

    #[test]
    fn level_zero_walks_the_first_operand() {
        let g = CouplingGraph::line(5);
        let routed = SwapRouter::default().route(&line_circuit(), &g, 0).unwrap();
        let swaps: Vec<_> = routed
            .physical
            .operations()
            .iter()
            .filter(|op| op.kind == GateKind::SWAP)
            .map(|op| (op.qubits[0], op.qubits[1]))
            .collect();
        assert_eq!(&swaps[..3], &[(0, 1), (1, 2), (2, 3)]);
        assert_eq!(routed.final_layout.physical(0), 3);
    }

    #[test]
    fn level_one_splits_the_path() {
        let g = CouplingGraph::line(5);
        let mut c = CircuitModel::new(5, 0);
        c.push(Operation::pair(GateKind::CX, 0, 4));
        let routed = SwapRouter::default().route(&c, &g, 1).unwrap();
        assert_eq!(routed.swap_count, 3);
        assert_eq!(routed.final_layout.physical(0), 2);
        assert_eq!(routed.final_layout.physical(4), 3);
        assert!(routed.depth < SwapRouter::default().route(&c, &g, 0).unwrap().depth);
    }

    #[test]
    fn fully_connected_needs_no_swaps() {
        let c = line_circuit();
        let g = CouplingGraph::fully_connected(5);
        for level in 0..=MAX_ROUTING_LEVEL {
            assert_eq!(SwapRouter::default().route(&c, &g, level).unwrap().swap_count, 0);
        }
    }

    #[test]
    fn errors() {
        let c = line_circuit();
        assert!(matches!(
            SwapRouter::default().route(&c, &CouplingGraph::line(3), 0),
            Err(StabOptError::CouplingTooSmall { physical: 3, required: 5 })
        ));
        let split = CouplingGraph::from_edges(5, &[(0, 1), (3, 4)]).unwrap();
        for level in [0, 1] {
            assert!(matches!(
                SwapRouter::default().route(&c, &split, level),
                Err(StabOptError::DisconnectedQubits { .. })
            ));
        }
        assert!(SwapRouter::default().route(&c, &CouplingGraph::line(5), 4).is_err());
    }
}
