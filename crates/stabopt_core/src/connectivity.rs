//! Connectivity optimization: route at every effort level, keep the
//! shallowest result.

use crate::circuit::CircuitModel;
use crate::coupling::CouplingGraph;
use crate::error::{Result, StabOptError};
use crate::routing::{MAX_ROUTING_LEVEL, Route, RoutedCircuit, SwapRouter};
use serde::Serialize;
use tracing::debug;

/// Outcome of routing at one effort level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoutingTrial {
    pub level: u8,
    pub depth: usize,
    pub swap_count: usize,
}

/// Chosen routing plus the record of every level tried.
#[derive(Debug, Clone)]
pub struct ConnectivityResult {
    pub routed: RoutedCircuit,
    pub trials: Vec<RoutingTrial>,
}

#[derive(Debug, Clone, Default)]
pub struct ConnectivityOptimizer<R = SwapRouter> {
    router: R,
}

impl<R: Route> ConnectivityOptimizer<R> {
    pub fn new(router: R) -> Self {
        Self { router }
    }

    /// Routes `circuit` at levels 0 through 3 and returns the lowest-depth
    /// result, ties going to the earliest level.
    ///
    /// Without a graph the circuit is routed onto a fully connected graph of
    /// its own width. The chosen circuit is checked so that every two-qubit
    /// gate acts on a coupled pair.
    pub fn optimize(&self, circuit: &CircuitModel, graph: Option<&CouplingGraph>) -> Result<ConnectivityResult> {
        let default_graph;
        let graph = match graph {
            Some(g) => g,
            None => {
                default_graph = CouplingGraph::fully_connected(circuit.num_qubits);
                &default_graph
            }
        };

        let mut best: Option<RoutedCircuit> = None;
        let mut trials = Vec::with_capacity(MAX_ROUTING_LEVEL as usize + 1);
        for level in 0..=MAX_ROUTING_LEVEL {
            let routed = self.router.route(circuit, graph, level)?;
            debug!(level, depth = routed.depth, swaps = routed.swap_count, "routing trial");
            trials.push(RoutingTrial {
                level,
                depth: routed.depth,
                swap_count: routed.swap_count,
            });
            if best.as_ref().is_none_or(|b| routed.depth < b.depth) {
                best = Some(routed);
            }
        }

        let routed = best.ok_or(StabOptError::invalid("routing levels", 0, "at least one"))?;
        verify_adjacent(&routed.physical, graph)?;
        Ok(ConnectivityResult { routed, trials })
    }
}

/// Fails on the first two-qubit gate whose operands are not coupled.
pub fn verify_adjacent(circuit: &CircuitModel, graph: &CouplingGraph) -> Result<()> {
    for (a, b) in circuit.two_qubit_pairs() {
        if !graph.is_adjacent(a, b) {
            return Err(StabOptError::DisconnectedQubits { a, b });
        }
    }
    Ok(())
}
