use super::*;

/// Repeated heavy-edge matching and contraction.
///
/// Every vertex starts as a single element leaf.  Each round matches
/// vertices with their heaviest unmatched neighbour, and every matched
/// pair is contracted into a new element-less parent node.  Unmatched
/// vertices are carried into the next round unchanged.  Contraction stops
/// once at most `min_coarse_size` vertices remain or nothing can be matched.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct HeavyEdgeMatching;

impl TreeStrategy for HeavyEdgeMatching {
    fn coarsen(
        &self,
        ctx: &BuildContext<'_>,
        arena: &mut TreeArena,
    ) -> Result<Vec<usize>, TreeError> {
        let mut node_of: Vec<usize> = (0..ctx.graph.len())
            .map(|v| arena.add_node(vec![v]))
            .collect();

        let mut coarse = ctx.graph.clone();
        while coarse.len() > ctx.settings.min_coarse_size {
            let mate = heavy_edge_matching(&coarse);

            // coarse vertex of each vertex
            let mut cmap = vec![usize::MAX; coarse.len()];
            let mut next_nodes = Vec::with_capacity(coarse.len());
            for v in 0..coarse.len() {
                if cmap[v] != usize::MAX {
                    continue;
                }
                cmap[v] = next_nodes.len();
                match mate[v] {
                    Some(u) => {
                        cmap[u] = next_nodes.len();
                        let p = arena.add_node(Vec::new());
                        arena.set_parent(node_of[v], p);
                        arena.set_parent(node_of[u], p);
                        next_nodes.push(p);
                    }
                    None => next_nodes.push(node_of[v]),
                }
            }
            if next_nodes.len() == coarse.len() {
                break;
            }

            let mut edges = Vec::with_capacity(coarse.num_edges());
            for u in 0..coarse.len() {
                for (v, w) in coarse.neighbors(u) {
                    if u < v && cmap[u] != cmap[v] {
                        edges.push((cmap[u], cmap[v], w));
                    }
                }
            }
            coarse = MeshGraph::from_edges(next_nodes.len(), &edges)?;
            node_of = next_nodes;
        }

        Ok(Vec::new())
    }
}

// greedy matching in vertex order.  Ties in weight go to the smaller index.
pub(crate) fn heavy_edge_matching(g: &MeshGraph) -> Vec<Option<usize>> {
    let mut mate = vec![None; g.len()];
    for v in 0..g.len() {
        if mate[v].is_some() {
            continue;
        }
        let mut best: Option<(usize, f64)> = None;
        for (u, w) in g.neighbors(v) {
            if mate[u].is_some() {
                continue;
            }
            if best.map_or(true, |(_, bw)| w > bw) {
                best = Some((u, w));
            }
        }
        if let Some((u, _)) = best {
            mate[v] = Some(u);
            mate[u] = Some(v);
        }
    }
    mate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::etree::partition::GreedyPartitioner;

    #[test]
    fn test_matching_prefers_heavy_edges() {
        // 0 -1- 1 -5- 2 -1- 3
        let g = MeshGraph::from_edges(4, &[(0, 1, 1.0), (1, 2, 5.0), (2, 3, 1.0)]).unwrap();
        let mate = heavy_edge_matching(&g);
        assert_eq!(mate, vec![Some(1), Some(0), Some(3), Some(2)]);

        // 0 claims 1 before the heavier edge to 2 is seen
        let g = MeshGraph::from_edges(3, &[(0, 1, 1.0), (1, 2, 5.0)]).unwrap();
        let mate = heavy_edge_matching(&g);
        assert_eq!(mate, vec![Some(1), Some(0), None]);
    }

    #[test]
    fn test_contraction_levels() {
        // path of 4 vertices contracts to 2 then 1
        let g = MeshGraph::from_edges(4, &[(0, 1, 1.0), (1, 2, 1.0), (2, 3, 1.0)]).unwrap();
        let settings = TreeSettings::default();
        let ctx = BuildContext {
            graph: &g,
            settings: &settings,
            partitioner: &GreedyPartitioner,
        };
        let mut arena = TreeArena::new();
        let orphans = HeavyEdgeMatching.coarsen(&ctx, &mut arena).unwrap();
        assert!(orphans.is_empty());

        // 4 leaves, 2 pairs, 1 root
        let tree = arena.into_tree(4).unwrap();
        assert_eq!(tree.len(), 7);
        tree.check_cover().unwrap();
        for v in 0..4 {
            assert_eq!(tree.depth(tree.owner(v).unwrap()), 2);
        }
    }
}
