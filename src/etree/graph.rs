use super::TreeError;
use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Weighted, undirected adjacency graph of mesh elements in compressed
/// sparse row form.
///
/// Every edge `{u,v}` is stored twice, once in the row of `u` and once in
/// the row of `v`, with the same weight.  Self loops are not allowed.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MeshGraph {
    offsets: Vec<usize>,
    adjacency: Vec<usize>,
    weights: Vec<f64>,
}

impl MeshGraph {
    /// Build a graph from raw CSR arrays.  The arrays are checked with
    /// [`check_format`](MeshGraph::check_format).
    pub fn new(
        offsets: Vec<usize>,
        adjacency: Vec<usize>,
        weights: Vec<f64>,
    ) -> Result<Self, TreeError> {
        let g = Self {
            offsets,
            adjacency,
            weights,
        };
        g.check_format()?;
        Ok(g)
    }

    /// Graph with `n` vertices and no edges.
    pub fn isolated(n: usize) -> Self {
        Self {
            offsets: vec![0; n + 1],
            adjacency: Vec::new(),
            weights: Vec::new(),
        }
    }

    /// Build a graph from a list of weighted edges `(u, v, w)`.
    ///
    /// Repeated edges have their weights summed and self loops are dropped.
    pub fn from_edges(n: usize, edges: &[(usize, usize, f64)]) -> Result<Self, TreeError> {
        let mut rows: Vec<HashMap<usize, f64>> = vec![HashMap::new(); n];
        for &(u, v, w) in edges {
            for x in [u, v] {
                if x >= n {
                    return Err(TreeError::IndexOutOfBounds { index: x, bound: n });
                }
            }
            if !(w.is_finite() && w > 0.0) {
                return Err(TreeError::InvalidGraph("edge weights must be positive"));
            }
            if u == v {
                continue;
            }
            *rows[u].entry(v).or_insert(0.0) += w;
            *rows[v].entry(u).or_insert(0.0) += w;
        }
        Ok(Self::from_rows(rows))
    }

    /// Build the element adjacency graph of a mesh given, for every element,
    /// the list of vertices it touches.
    ///
    /// Two elements are adjacent when they share at least one vertex, and the
    /// edge weight is the number of shared vertices.
    pub fn from_elements(connectivity: &[Vec<usize>]) -> Self {
        let n = connectivity.len();

        // mesh vertex -> elements touching it
        let mut touching: HashMap<usize, Vec<usize>> = HashMap::new();
        for (e, verts) in connectivity.iter().enumerate() {
            let mut verts = verts.clone();
            verts.sort_unstable();
            verts.dedup();
            for v in verts {
                touching.entry(v).or_default().push(e);
            }
        }

        let mut rows: Vec<HashMap<usize, f64>> = vec![HashMap::new(); n];
        for elems in touching.values() {
            for (i, &a) in elems.iter().enumerate() {
                for &b in &elems[i + 1..] {
                    *rows[a].entry(b).or_insert(0.0) += 1.0;
                    *rows[b].entry(a).or_insert(0.0) += 1.0;
                }
            }
        }
        Self::from_rows(rows)
    }

    fn from_rows(rows: Vec<HashMap<usize, f64>>) -> Self {
        let mut offsets = Vec::with_capacity(rows.len() + 1);
        let mut adjacency = Vec::new();
        let mut weights = Vec::new();
        offsets.push(0);
        for row in rows {
            let mut row: Vec<(usize, f64)> = row.into_iter().collect();
            row.sort_unstable_by_key(|&(v, _)| v);
            for (v, w) in row {
                adjacency.push(v);
                weights.push(w);
            }
            offsets.push(adjacency.len());
        }
        Self {
            offsets,
            adjacency,
            weights,
        }
    }

    /// Checks the CSR arrays: monotone offsets, in range neighbours, positive
    /// finite weights, no self loops and a symmetric edge set.
    pub fn check_format(&self) -> Result<(), TreeError> {
        if self.offsets.is_empty() || self.offsets[0] != 0 {
            return Err(TreeError::InvalidGraph("offsets must start at zero"));
        }
        if self.offsets.windows(2).any(|w| w[0] > w[1]) {
            return Err(TreeError::InvalidGraph("offsets must be nondecreasing"));
        }
        let nnz = self.offsets[self.offsets.len() - 1];
        if nnz != self.adjacency.len() || nnz != self.weights.len() {
            return Err(TreeError::InvalidGraph("offsets do not match adjacency length"));
        }

        let n = self.len();
        let mut edges = HashMap::with_capacity(nnz);
        for u in 0..n {
            for (v, w) in self.neighbors(u) {
                if v >= n {
                    return Err(TreeError::IndexOutOfBounds { index: v, bound: n });
                }
                if v == u {
                    return Err(TreeError::InvalidGraph("self loops are not allowed"));
                }
                if !(w.is_finite() && w > 0.0) {
                    return Err(TreeError::InvalidGraph("edge weights must be positive"));
                }
                if edges.insert((u, v), w).is_some() {
                    return Err(TreeError::InvalidGraph("repeated edge"));
                }
            }
        }
        for (&(u, v), &w) in edges.iter() {
            if edges.get(&(v, u)) != Some(&w) {
                return Err(TreeError::InvalidGraph("adjacency is not symmetric"));
            }
        }
        Ok(())
    }

    /// Number of vertices
    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of undirected edges
    pub fn num_edges(&self) -> usize {
        self.adjacency.len() / 2
    }

    pub fn degree(&self, v: usize) -> usize {
        self.offsets[v + 1] - self.offsets[v]
    }

    /// Sum of the weights of the edges incident to `v`
    pub fn weighted_degree(&self, v: usize) -> f64 {
        self.weights[self.offsets[v]..self.offsets[v + 1]].iter().sum()
    }

    /// Neighbours of `v` with edge weights, in increasing vertex order.
    pub fn neighbors(&self, v: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let range = self.offsets[v]..self.offsets[v + 1];
        self.adjacency[range.clone()]
            .iter()
            .copied()
            .zip(self.weights[range].iter().copied())
    }

    /// Weight of the edge `{u,v}`, if present.
    pub fn edge_weight(&self, u: usize, v: usize) -> Option<f64> {
        let range = self.offsets[u]..self.offsets[u + 1];
        self.adjacency[range.clone()]
            .binary_search(&v)
            .ok()
            .map(|k| self.weights[range.start + k])
    }

    /// Raw CSR arrays `(offsets, adjacency, weights)`.
    pub fn csr(&self) -> (&[usize], &[usize], &[f64]) {
        (&self.offsets, &self.adjacency, &self.weights)
    }

    /// Subgraph induced by `vertices`.  Vertex `k` of the result is
    /// `vertices[k]` of `self`.
    pub fn subgraph(&self, vertices: &[usize]) -> MeshGraph {
        let mut local = HashMap::with_capacity(vertices.len());
        for (k, &v) in vertices.iter().enumerate() {
            local.insert(v, k);
        }

        let mut offsets = Vec::with_capacity(vertices.len() + 1);
        let mut adjacency = Vec::new();
        let mut weights = Vec::new();
        offsets.push(0);
        for &v in vertices {
            let mut row: Vec<(usize, f64)> = self
                .neighbors(v)
                .filter_map(|(u, w)| local.get(&u).map(|&k| (k, w)))
                .collect();
            row.sort_unstable_by_key(|&(k, _)| k);
            for (k, w) in row {
                adjacency.push(k);
                weights.push(w);
            }
            offsets.push(adjacency.len());
        }
        MeshGraph {
            offsets,
            adjacency,
            weights,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_edges() {
        let g = MeshGraph::from_edges(4, &[(0, 1, 1.0), (1, 0, 2.0), (2, 2, 1.0), (1, 2, 1.0)])
            .unwrap();
        assert_eq!(g.len(), 4);
        assert_eq!(g.num_edges(), 2);
        assert_eq!(g.edge_weight(0, 1), Some(3.0));
        assert_eq!(g.edge_weight(2, 2), None);
        assert_eq!(g.degree(3), 0);
        assert_eq!(g.weighted_degree(1), 4.0);
        g.check_format().unwrap();

        assert!(matches!(
            MeshGraph::from_edges(2, &[(0, 2, 1.0)]),
            Err(TreeError::IndexOutOfBounds { index: 2, bound: 2 })
        ));
    }

    #[test]
    fn test_from_elements() {
        // two triangles sharing an edge, and a third touching one corner
        let conn = vec![vec![0, 1, 2], vec![1, 2, 3], vec![3, 4, 5]];
        let g = MeshGraph::from_elements(&conn);
        assert_eq!(g.edge_weight(0, 1), Some(2.0));
        assert_eq!(g.edge_weight(1, 2), Some(1.0));
        assert_eq!(g.edge_weight(0, 2), None);
        g.check_format().unwrap();
    }

    #[test]
    fn test_check_format() {
        // asymmetric
        assert!(MeshGraph::new(vec![0, 1, 1], vec![1], vec![1.0]).is_err());
        // self loop
        assert!(MeshGraph::new(vec![0, 1], vec![0], vec![1.0]).is_err());
        // bad offsets
        assert!(MeshGraph::new(vec![1, 1], vec![], vec![]).is_err());
        // ok
        MeshGraph::new(vec![0, 1, 2], vec![1, 0], vec![1.0, 1.0]).unwrap();
    }

    #[test]
    fn test_subgraph() {
        let g = MeshGraph::from_edges(4, &[(0, 1, 1.0), (1, 2, 2.0), (2, 3, 3.0)]).unwrap();
        let s = g.subgraph(&[3, 2, 0]);
        assert_eq!(s.len(), 3);
        assert_eq!(s.edge_weight(0, 1), Some(3.0));
        assert_eq!(s.degree(2), 0);
        s.check_format().unwrap();
    }
}
