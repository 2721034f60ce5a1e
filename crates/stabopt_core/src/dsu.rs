//! Disjoint Set Union (DSU) data structure over physical qubits.
//!
//! Groups qubits that are joined by a path of couplers. The coupling graph
//! uses it to decide whether two qubits can ever be brought together by
//! swaps, and to list its connected components.

/// Union-Find forest with path halving and union by rank.
#[derive(Debug, Clone)]
pub struct UnionFind {
    /// Parent pointer array. Roots point to themselves.
    parent: Vec<usize>,

    /// Upper bound on each root's tree height, used to keep trees shallow.
    rank: Vec<u8>,
}

impl UnionFind {
    /// Creates `n` singleton sets.
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Finds the root of the set containing node i.
    ///
    /// Every visited node is re-pointed at its grandparent on the way up, so
    /// repeated lookups along the same chain get cheaper.
    ///
    /// # Arguments
    ///
    /// * `i` - Node index to find the root for
    ///
    /// # Returns
    ///
    /// The root node index of the set containing i.
    #[inline(always)]
    pub fn find(&mut self, mut i: usize) -> usize {
        while i != self.parent[i] {
            let p = self.parent[i];
            let gp = self.parent[p];
            self.parent[i] = gp;
            i = p;
        }
        i
    }

    /// Merges the sets containing nodes i and j.
    ///
    /// # Returns
    ///
    /// True if the sets were merged, false if they were already united.
    pub fn union(&mut self, i: usize, j: usize) -> bool {
        let root_i = self.find(i);
        let root_j = self.find(j);
        if root_i == root_j {
            return false;
        }
        if self.rank[root_i] < self.rank[root_j] {
            self.parent[root_i] = root_j;
        } else {
            self.parent[root_j] = root_i;
            if self.rank[root_i] == self.rank[root_j] {
                self.rank[root_i] += 1;
            }
        }
        true
    }

    /// All sets, each sorted ascending, ordered by smallest member.
    pub fn components(&mut self) -> Vec<Vec<usize>> {
        let mut by_root: Vec<Option<usize>> = vec![None; self.len()];
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for i in 0..self.len() {
            let root = self.find(i);
            match by_root[root] {
                Some(g) => groups[g].push(i),
                None => {
                    by_root[root] = Some(groups.len());
                    groups.push(vec![i]);
                }
            }
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::UnionFind;

    #[test]
    fn unions_and_components() {
        let mut uf = UnionFind::new(6);
        assert!(uf.union(0, 1));
        assert!(uf.union(4, 5));
        assert!(uf.union(1, 4));
        assert!(!uf.union(0, 5));
        assert_eq!(uf.find(0), uf.find(5));
        assert_ne!(uf.find(2), uf.find(3));
        assert_eq!(uf.components(), vec![vec![0, 1, 4, 5], vec![2], vec![3]]);
    }
}
