use super::{EliminationTree, MeshGraph, TreeError};

/// Places every element of `orphans` in the tree.
///
/// An orphan goes to the lowest common ancestor of the nodes owning its
/// already placed neighbours.  Placing an orphan can give a neighbouring
/// orphan a placed neighbour, so passes are repeated in increasing element
/// order while they make progress.  Orphans with no placed neighbour after
/// that go to the root.
pub(crate) fn place_orphans(
    tree: &mut EliminationTree,
    graph: &MeshGraph,
    mut orphans: Vec<usize>,
) -> Result<(), TreeError> {
    orphans.sort_unstable();

    while !orphans.is_empty() {
        let mut deferred = Vec::new();
        for &e in orphans.iter() {
            let target = graph
                .neighbors(e)
                .filter_map(|(v, _)| tree.owner(v))
                .reduce(|a, b| tree.lca(a, b));
            match target {
                Some(node) => tree.attach(node, e)?,
                None => deferred.push(e),
            }
        }
        if deferred.len() == orphans.len() {
            break;
        }
        orphans = deferred;
    }

    let root = tree.root();
    for e in orphans {
        tree.attach(root, e)?;
    }
    Ok(())
}
