//! Coupling graphs describing which physical qubit pairs may interact.
//!
//! Couplers are undirected. Shortest paths come from breadth-first search
//! and connectivity from a union-find pass over the edge list.

use crate::dsu::UnionFind;
use crate::error::{Result, StabOptError};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Undirected coupling graph over `num_qubits` physical qubits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouplingGraph {
    adjacency: Vec<Vec<usize>>,
    edges: Vec<(usize, usize)>,
}

impl CouplingGraph {
    /// Graph with no couplers.
    pub fn empty(num_qubits: usize) -> Self {
        Self {
            adjacency: vec![Vec::new(); num_qubits],
            edges: Vec::new(),
        }
    }

    /// Every pair coupled.
    pub fn fully_connected(num_qubits: usize) -> Self {
        let mut g = Self::empty(num_qubits);
        for a in 0..num_qubits {
            for b in a + 1..num_qubits {
                g.insert(a, b);
            }
        }
        g
    }

    /// Chain `0 - 1 - ... - n-1`.
    pub fn line(num_qubits: usize) -> Self {
        let mut g = Self::empty(num_qubits);
        for a in 1..num_qubits {
            g.insert(a - 1, a);
        }
        g
    }

    /// Chain closed into a cycle.
    pub fn ring(num_qubits: usize) -> Self {
        let mut g = Self::line(num_qubits);
        if num_qubits > 2 {
            g.insert(num_qubits - 1, 0);
        }
        g
    }

    /// Rectangular lattice, row-major numbering.
    pub fn grid(rows: usize, cols: usize) -> Self {
        let mut g = Self::empty(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                let q = r * cols + c;
                if c + 1 < cols {
                    g.insert(q, q + 1);
                }
                if r + 1 < rows {
                    g.insert(q, q + cols);
                }
            }
        }
        g
    }

    pub fn from_edges(num_qubits: usize, edges: &[(usize, usize)]) -> Result<Self> {
        let mut g = Self::empty(num_qubits);
        for &(a, b) in edges {
            for q in [a, b] {
                if q >= num_qubits {
                    return Err(StabOptError::QubitOutOfRange { qubit: q, num_qubits });
                }
            }
            g.insert(a, b);
        }
        Ok(g)
    }

    /// Builds a graph from a square `0/1` adjacency matrix.
    ///
    /// A coupler exists when either `m[a][b]` or `m[b][a]` is set. The
    /// diagonal is ignored.
    pub fn from_adjacency_matrix(matrix: &[Vec<u8>]) -> Result<Self> {
        let n = matrix.len();
        let mut g = Self::empty(n);
        for (a, row) in matrix.iter().enumerate() {
            if row.len() != n {
                return Err(StabOptError::invalid(
                    "adjacency matrix row length",
                    row.len(),
                    "square matrix",
                ));
            }
            for (b, &v) in row.iter().enumerate() {
                match v {
                    0 => {}
                    1 if a != b => g.insert(a, b),
                    1 => {}
                    _ => {
                        return Err(StabOptError::InvalidBit {
                            row: a,
                            col: b,
                            value: v as i64,
                        });
                    }
                }
            }
        }
        Ok(g)
    }

    fn insert(&mut self, a: usize, b: usize) {
        if a == b || self.adjacency[a].contains(&b) {
            return;
        }
        self.adjacency[a].push(b);
        self.adjacency[b].push(a);
        self.adjacency[a].sort_unstable();
        self.adjacency[b].sort_unstable();
        self.edges.push((a.min(b), a.max(b)));
    }

    pub fn num_qubits(&self) -> usize {
        self.adjacency.len()
    }

    /// Couplers as `(low, high)` pairs in insertion order.
    pub fn edges(&self) -> &[(usize, usize)] {
        &self.edges
    }

    pub fn neighbors(&self, q: usize) -> &[usize] {
        &self.adjacency[q]
    }

    pub fn degree(&self, q: usize) -> usize {
        self.adjacency[q].len()
    }

    pub fn is_adjacent(&self, a: usize, b: usize) -> bool {
        self.adjacency
            .get(a)
            .is_some_and(|n| n.binary_search(&b).is_ok())
    }

    /// Hop counts from `src` to every qubit, `None` where unreachable.
    pub fn distances_from(&self, src: usize) -> Vec<Option<usize>> {
        let mut dist = vec![None; self.num_qubits()];
        let mut queue = VecDeque::new();
        dist[src] = Some(0);
        queue.push_back(src);
        while let Some(u) = queue.pop_front() {
            let du = dist[u].unwrap_or(0);
            for &v in &self.adjacency[u] {
                if dist[v].is_none() {
                    dist[v] = Some(du + 1);
                    queue.push_back(v);
                }
            }
        }
        dist
    }

    /// All-pairs hop counts.
    pub fn distance_matrix(&self) -> Vec<Vec<Option<usize>>> {
        (0..self.num_qubits()).map(|q| self.distances_from(q)).collect()
    }

    /// Shortest path from `a` to `b` inclusive of both ends. Among equal
    /// length paths the one through lower-numbered qubits is preferred.
    pub fn shortest_path(&self, a: usize, b: usize) -> Option<Vec<usize>> {
        let mut prev: Vec<Option<usize>> = vec![None; self.num_qubits()];
        let mut seen = vec![false; self.num_qubits()];
        let mut queue = VecDeque::new();
        seen[a] = true;
        queue.push_back(a);
        while let Some(u) = queue.pop_front() {
            if u == b {
                break;
            }
            for &v in &self.adjacency[u] {
                if !seen[v] {
                    seen[v] = true;
                    prev[v] = Some(u);
                    queue.push_back(v);
                }
            }
        }
        if !seen[b] {
            return None;
        }
        let mut path = vec![b];
        let mut cur = b;
        while let Some(p) = prev[cur] {
            path.push(p);
            cur = p;
        }
        path.reverse();
        Some(path)
    }

    /// Connected components, each ascending, ordered by smallest member.
    pub fn components(&self) -> Vec<Vec<usize>> {
        self.union_find().components()
    }

    /// Index into [`components`](Self::components) for every qubit.
    pub fn component_labels(&self) -> Vec<usize> {
        let mut labels = vec![0; self.num_qubits()];
        for (i, group) in self.components().iter().enumerate() {
            for &q in group {
                labels[q] = i;
            }
        }
        labels
    }

    fn union_find(&self) -> UnionFind {
        let mut uf = UnionFind::new(self.num_qubits());
        for &(a, b) in &self.edges {
            uf.union(a, b);
        }
        uf
    }
}

/// Serializable description of a coupling graph.
///
/// Shapes without an explicit size are sized to the circuit being routed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CouplingSpec {
    FullyConnected,
    Line,
    Ring,
    Grid { rows: usize, cols: usize },
    Edges { num_qubits: usize, edges: Vec<(usize, usize)> },
    Adjacency { matrix: Vec<Vec<u8>> },
}

impl CouplingSpec {
    pub fn build(&self, num_qubits: usize) -> Result<CouplingGraph> {
        match self {
            CouplingSpec::FullyConnected => Ok(CouplingGraph::fully_connected(num_qubits)),
            CouplingSpec::Line => Ok(CouplingGraph::line(num_qubits)),
            CouplingSpec::Ring => Ok(CouplingGraph::ring(num_qubits)),
            CouplingSpec::Grid { rows, cols } => Ok(CouplingGraph::grid(*rows, *cols)),
            CouplingSpec::Edges { num_qubits, edges } => CouplingGraph::from_edges(*num_qubits, edges),
            CouplingSpec::Adjacency { matrix } => CouplingGraph::from_adjacency_matrix(matrix),
        }
    }
}
