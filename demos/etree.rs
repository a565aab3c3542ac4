// Elimination tree driver: etree <nthreads> <blockSize>
//
// Builds the tree of a structured quadrilateral mesh with every strategy,
// then factors the node blocks in elimination order.
use tessera::algebra::*;
use tessera::etree::*;
use tessera::scheduler::*;

const NX: usize = 40;
const NY: usize = 30;

// vertices of each quadrilateral element of an NX x NY element grid
fn quad_mesh() -> Vec<Vec<usize>> {
    let vid = |i: usize, j: usize| i + (NX + 1) * j;
    let mut elems = Vec::with_capacity(NX * NY);
    for j in 0..NY {
        for i in 0..NX {
            elems.push(vec![vid(i, j), vid(i + 1, j), vid(i + 1, j + 1), vid(i, j + 1)]);
        }
    }
    elems
}

fn factor_residual(tree: &EliminationTree, graph: &MeshGraph, nthreads: usize, bs: usize) -> f64 {
    let mut blocks = node_blocks::<f64>(tree, graph, 1.0).unwrap();
    let originals: Vec<_> = blocks
        .iter()
        .map(|b| b.as_ref().map(|m| m.try_clone().unwrap()))
        .collect();
    {
        let settings = SchedulerSettingsBuilder::default()
            .max_threads(nthreads)
            .sorting(SortingPolicy::CriticalPath)
            .build()
            .unwrap();
        let mut sched = TileScheduler::new(settings).unwrap();
        submit_tree_cholesky(tree, &mut blocks, bs, &mut sched).unwrap();
        sched.run().unwrap();
    }

    let mut err: f64 = 0.0;
    for (l, a) in blocks.iter().zip(originals.iter()) {
        if let (Some(l), Some(a)) = (l, a) {
            for j in 0..a.ncols() {
                for i in j..a.nrows() {
                    let s: f64 = (0..=j).map(|k| l[(i, k)] * l[(j, k)]).sum();
                    err = err.max((s - a[(i, j)]).abs());
                }
            }
        }
    }
    err
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let nthreads = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(0);
    let bs = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(16);

    let graph = MeshGraph::from_elements(&quad_mesh());
    let mut failed = false;

    for tag in [
        TreeStrategyTag::HeavyEdgeMatching,
        TreeStrategyTag::PartitionBased,
        TreeStrategyTag::NestedDissection,
    ] {
        let settings = TreeSettingsBuilder::default()
            .strategy(tag)
            .leaf_size(64)
            .verbose(true)
            .build()
            .unwrap();
        let tree = TreeBuilder::new(settings).unwrap().build(&graph).unwrap();
        let covered = tree.check_cover().is_ok();
        let err = factor_residual(&tree, &graph, nthreads, bs);

        if covered && err < 1e-9 {
            println!("PASS::{:?}_residual {:e}", tag, err);
        } else {
            println!("FAIL::{:?}_residual {:e}", tag, err);
            failed = true;
        }
    }
    if failed {
        std::process::exit(-1);
    }
}
