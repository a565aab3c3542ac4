use super::{EliminationTree, MeshGraph, TreeError};

impl EliminationTree {
    /// Global elimination order of the elements.
    ///
    /// Nodes are taken in post order, and the elements of each node are
    /// ordered by approximate minimum degree on the subgraph they induce.
    /// Entry `k` of the result is the element eliminated `k`-th.
    pub fn elimination_order(&self, graph: &MeshGraph) -> Result<Vec<usize>, TreeError> {
        if graph.len() != self.n_elements() {
            return Err(TreeError::InvalidGraph("graph does not match the tree"));
        }
        let mut order = Vec::with_capacity(self.n_elements());
        for &node in self.post_order() {
            let elems = self.elements(node);
            if elems.len() <= 2 {
                order.extend_from_slice(elems);
                continue;
            }
            let sub = graph.subgraph(elems);
            let (colptr, rowval, _) = sub.csr();
            let control = amd::Control::default();
            match amd::order(sub.len(), colptr, rowval, &control) {
                Ok((perm, _iperm, _info)) => order.extend(perm.iter().map(|&k| elems[k])),
                Err(_) => order.extend_from_slice(elems),
            }
        }
        Ok(order)
    }
}
