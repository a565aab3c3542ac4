use super::{EliminationTree, MeshGraph};
use crate::algebra::*;
use crate::blocked;
use crate::scheduler::{MatrixHandle, SchedulerError, TileScheduler};

/// Dense local block of `node`.
///
/// The block is the graph Laplacian of the full mesh graph restricted to
/// the elements of `node`, with `shift` added to the diagonal.  Row `i`
/// belongs to `tree.elements(node)[i]`.  Since every diagonal entry holds
/// the full weighted degree of its element, the block is strictly diagonally
/// dominant, and hence positive definite, for any positive `shift`.
pub fn node_block<T: FloatT>(
    tree: &EliminationTree,
    graph: &MeshGraph,
    node: usize,
    shift: T,
) -> Result<FlatMatrix<T>, MatrixError> {
    let elems = tree.elements(node);
    let n = elems.len();
    let mut a = FlatMatrix::create(n, n)?;
    for (j, &ej) in elems.iter().enumerate() {
        let d: T = graph.weighted_degree(ej).as_T();
        a.set(j, j, d + shift)?;
        for (i, &ei) in elems.iter().enumerate() {
            if let Some(w) = graph.edge_weight(ei, ej) {
                let w: T = w.as_T();
                a.set(i, j, -w)?;
            }
        }
    }
    Ok(a)
}

/// [`node_block`] of every node, or `None` for nodes owning no elements.
pub fn node_blocks<T: FloatT>(
    tree: &EliminationTree,
    graph: &MeshGraph,
    shift: T,
) -> Result<Vec<Option<FlatMatrix<T>>>, MatrixError> {
    (0..tree.len())
        .map(|v| {
            if tree.elements(v).is_empty() {
                Ok(None)
            } else {
                node_block(tree, graph, v, shift).map(Some)
            }
        })
        .collect()
}

/// Registers the block of every node and submits its tiled Cholesky
/// factorization, with nodes taken in post order.
///
/// `blocks[v]` is the block of node `v`, as produced by [`node_blocks`].
/// Returns the handle of each registered block.
pub fn submit_tree_cholesky<'a, T: FloatT>(
    tree: &EliminationTree,
    blocks: &'a mut [Option<FlatMatrix<T>>],
    block_size: usize,
    sched: &mut TileScheduler<'a, T>,
) -> Result<Vec<Option<MatrixHandle>>, SchedulerError> {
    if blocks.len() != tree.len() {
        return Err(MatrixError::IncompatibleDimension.into());
    }
    let mut slots: Vec<Option<&'a mut FlatMatrix<T>>> =
        blocks.iter_mut().map(|b| b.as_mut()).collect();
    let mut handles = vec![None; tree.len()];

    for &v in tree.post_order() {
        if let Some(block) = slots[v].take() {
            let h = sched.register(HierMatrix::new(block, block_size, block_size)?)?;
            blocked::cholesky(sched, h)?;
            handles[v] = Some(h);
        }
    }
    Ok(handles)
}
