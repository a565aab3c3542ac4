use super::*;
use crate::etree::disjoint_set_union::components;

/// Recursive nested dissection.
///
/// A vertex set larger than `leaf_size` is split by a level structure
/// separator into two halves with no edges between them.  The separator
/// vertices are owned by the node and the halves recurse as its two
/// children.  Disconnected sets are first split into their components.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct NestedDissection;

impl TreeStrategy for NestedDissection {
    fn coarsen(
        &self,
        ctx: &BuildContext<'_>,
        arena: &mut TreeArena,
    ) -> Result<Vec<usize>, TreeError> {
        let all: Vec<usize> = (0..ctx.graph.len()).collect();
        dissect(ctx, arena, all);
        Ok(Vec::new())
    }
}

fn dissect(ctx: &BuildContext<'_>, arena: &mut TreeArena, vertices: Vec<usize>) -> usize {
    if vertices.len() <= ctx.settings.leaf_size {
        return arena.add_node(vertices);
    }
    let sub = ctx.graph.subgraph(&vertices);
    let global = |local: Vec<usize>| -> Vec<usize> { local.into_iter().map(|v| vertices[v]).collect() };

    let comps = components(&sub);
    if comps.len() > 1 {
        let node = arena.add_node(Vec::new());
        for comp in comps {
            let child = dissect(ctx, arena, global(comp));
            arena.set_parent(child, node);
        }
        return node;
    }

    let (a, b, sep) = level_separator(&sub);
    if a.is_empty() || b.is_empty() {
        return arena.add_node(vertices);
    }
    let (a, b, sep) = (global(a), global(b), global(sep));
    let node = arena.add_node(sep);
    for half in [a, b] {
        let child = dissect(ctx, arena, half);
        arena.set_parent(child, node);
    }
    node
}

// Splits a connected graph into `(a, b, separator)` with no edges between
// `a` and `b`.  The separator is the middle level of a breadth first level
// structure rooted at a pseudo-peripheral vertex, and is then thinned by
// moving vertices with no neighbour on one side into the other side.
pub(crate) fn level_separator(g: &MeshGraph) -> (Vec<usize>, Vec<usize>, Vec<usize>) {
    let n = g.len();
    if n == 0 {
        return (Vec::new(), Vec::new(), Vec::new());
    }
    let start = pseudo_peripheral(g);
    let levels = level_structure(g, start);
    if levels.len() < 3 {
        return (Vec::new(), Vec::new(), (0..n).collect());
    }

    // first level reaching half of the vertices, kept off the ends
    let mut count = 0;
    let mut mid = 1;
    for (k, level) in levels.iter().enumerate() {
        count += level.len();
        if 2 * count >= n {
            mid = k;
            break;
        }
    }
    let mid = mid.clamp(1, levels.len() - 2);

    const A: u8 = 0;
    const B: u8 = 1;
    const S: u8 = 2;
    let mut side = vec![S; n];
    for (k, level) in levels.iter().enumerate() {
        let s = match k.cmp(&mid) {
            std::cmp::Ordering::Less => A,
            std::cmp::Ordering::Equal => S,
            std::cmp::Ordering::Greater => B,
        };
        for &v in level {
            side[v] = s;
        }
    }

    for (from, to) in [(B, A), (A, B)] {
        for v in levels[mid].iter().copied() {
            if side[v] == S && g.neighbors(v).all(|(u, _)| side[u] != from) {
                side[v] = to;
            }
        }
    }

    let pick = |s: u8| (0..n).filter(|&v| side[v] == s).collect::<Vec<_>>();
    (pick(A), pick(B), pick(S))
}

// vertices grouped by breadth first distance from `start`
fn level_structure(g: &MeshGraph, start: usize) -> Vec<Vec<usize>> {
    let mut seen = vec![false; g.len()];
    seen[start] = true;
    let mut levels = vec![vec![start]];
    loop {
        let mut next = Vec::new();
        for &v in levels[levels.len() - 1].iter() {
            for (u, _) in g.neighbors(v) {
                if !seen[u] {
                    seen[u] = true;
                    next.push(u);
                }
            }
        }
        if next.is_empty() {
            return levels;
        }
        next.sort_unstable();
        levels.push(next);
    }
}

// George-Liu search for a vertex of near maximal eccentricity
fn pseudo_peripheral(g: &MeshGraph) -> usize {
    let mut v = (0..g.len()).min_by_key(|&v| g.degree(v)).unwrap_or(0);
    let mut depth = level_structure(g, v).len();
    loop {
        let levels = level_structure(g, v);
        let last = &levels[levels.len() - 1];
        let u = last.iter().copied().min_by_key(|&u| g.degree(u)).unwrap_or(v);
        let d = level_structure(g, u).len();
        if d <= depth {
            return v;
        }
        v = u;
        depth = d;
    }
}
