use super::*;

/// Recursive partitioning into independent subtrees.
///
/// A vertex set larger than `leaf_size` is split by the graph partitioner
/// into `num_parts` parts.  The set becomes an element-less node with one
/// child subtree per nonempty part.  Sets that fit in a leaf, or that the
/// partitioner cannot split, become leaves.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct PartitionBased;

impl TreeStrategy for PartitionBased {
    fn coarsen(
        &self,
        ctx: &BuildContext<'_>,
        arena: &mut TreeArena,
    ) -> Result<Vec<usize>, TreeError> {
        let mut orphans = Vec::new();
        let all: Vec<usize> = (0..ctx.graph.len()).collect();
        split(ctx, arena, all, &mut orphans);
        Ok(orphans)
    }
}

fn split(
    ctx: &BuildContext<'_>,
    arena: &mut TreeArena,
    vertices: Vec<usize>,
    orphans: &mut Vec<usize>,
) -> Option<usize> {
    if vertices.is_empty() {
        return None;
    }
    if vertices.len() <= ctx.settings.leaf_size {
        return Some(arena.add_node(vertices));
    }

    let k = ctx.settings.num_parts;
    let sub = ctx.graph.subgraph(&vertices);
    let part = match ctx.partitioner.partition(&sub, k) {
        Ok(part) if part.len() == vertices.len() => part,
        _ => return Some(arena.add_node(vertices)),
    };

    let mut groups = vec![Vec::new(); k];
    for (v, p) in vertices.into_iter().zip(part) {
        match groups.get_mut(p) {
            Some(group) => group.push(v),
            None => orphans.push(v),
        }
    }
    groups.retain(|g| !g.is_empty());

    match groups.len() {
        0 => None,
        1 => groups.pop().map(|g| arena.add_node(g)),
        _ => {
            let node = arena.add_node(Vec::new());
            for group in groups {
                if let Some(child) = split(ctx, arena, group, orphans) {
                    arena.set_parent(child, node);
                }
            }
            Some(node)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // places every vertex in part 0 except the last, which is unplaced
    struct DropLast;

    impl GraphPartitioner for DropLast {
        fn partition(
            &self,
            graph: &MeshGraph,
            parts: usize,
        ) -> Result<Vec<usize>, PartitionError> {
            let n = graph.len();
            Ok((0..n).map(|v| if v + 1 == n { parts } else { v % parts }).collect())
        }
    }

    fn grid(nx: usize, ny: usize) -> MeshGraph {
        let mut edges = Vec::new();
        for j in 0..ny {
            for i in 0..nx {
                let v = i + nx * j;
                if i + 1 < nx {
                    edges.push((v, v + 1, 1.0));
                }
                if j + 1 < ny {
                    edges.push((v, v + nx, 1.0));
                }
            }
        }
        MeshGraph::from_edges(nx * ny, &edges).unwrap()
    }

    #[test]
    fn test_leaves_fit() {
        let g = grid(8, 8);
        let settings = TreeSettingsBuilder::default().leaf_size(5).build().unwrap();
        let ctx = BuildContext {
            graph: &g,
            settings: &settings,
            partitioner: &GreedyPartitioner,
        };
        let mut arena = TreeArena::new();
        let orphans = PartitionBased.coarsen(&ctx, &mut arena).unwrap();
        assert!(orphans.is_empty());

        let tree = arena.into_tree(64).unwrap();
        tree.check_cover().unwrap();
        for v in 0..tree.len() {
            if tree.children(v).is_empty() {
                assert!(tree.elements(v).len() <= 5);
            } else {
                assert!(tree.elements(v).is_empty());
            }
        }
    }

    #[test]
    fn test_unplaced_vertices_returned() {
        let g = grid(4, 4);
        let settings = TreeSettingsBuilder::default().leaf_size(4).build().unwrap();
        let ctx = BuildContext {
            graph: &g,
            settings: &settings,
            partitioner: &DropLast,
        };
        let mut arena = TreeArena::new();
        let orphans = PartitionBased.coarsen(&ctx, &mut arena).unwrap();
        assert!(orphans.contains(&15));
    }
}
