use super::orphans::place_orphans;
use super::strategy::{BuildContext, Strategy, TreeStrategy};
use super::tree::TreeArena;
use super::*;
use crate::io::{ConfigurablePrintTarget, PrintTarget, Summary};
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

/// Builds [`EliminationTree`]s from mesh graphs.
///
/// Vertices of degree zero are set aside before the selected strategy
/// runs on the rest of the graph.  They are placed afterwards together
/// with any vertices the strategy could not place.
pub struct TreeBuilder {
    settings: TreeSettings,
    partitioner: Arc<dyn GraphPartitioner>,
    stream: PrintTarget,
}

impl TreeBuilder {
    /// Builder using the default [`GreedyPartitioner`].
    pub fn new(settings: TreeSettings) -> Result<Self, TreeError> {
        Self::with_partitioner(settings, Arc::new(GreedyPartitioner))
    }

    /// Builder splitting graphs with a user supplied partitioner.
    pub fn with_partitioner(
        settings: TreeSettings,
        partitioner: Arc<dyn GraphPartitioner>,
    ) -> Result<Self, TreeError> {
        settings.validate()?;
        Ok(Self {
            settings,
            partitioner,
            stream: PrintTarget::default(),
        })
    }

    pub fn settings(&self) -> &TreeSettings {
        &self.settings
    }

    /// Build the elimination tree of `graph`.
    ///
    /// Fails with [`TreeError::DisconnectedInput`] if the graph has no
    /// vertices.  Disconnected graphs are otherwise accepted.
    pub fn build(&mut self, graph: &MeshGraph) -> Result<EliminationTree, TreeError> {
        if graph.is_empty() {
            return Err(TreeError::DisconnectedInput);
        }
        let start = Instant::now();

        let (active, mut orphans): (Vec<usize>, Vec<usize>) =
            (0..graph.len()).partition(|&v| graph.degree(v) > 0);
        let isolated = orphans.len();

        let sub = graph.subgraph(&active);
        let ctx = BuildContext {
            graph: &sub,
            settings: &self.settings,
            partitioner: &*self.partitioner,
        };
        let mut arena = TreeArena::new();
        let strategy = Strategy::from(self.settings.strategy);
        let unplaced = strategy.coarsen(&ctx, &mut arena)?;

        arena.relabel(&active);
        orphans.extend(unplaced.into_iter().map(|v| active[v]));
        let n_orphans = orphans.len();

        let mut tree = arena.into_tree(graph.len())?;
        place_orphans(&mut tree, graph, orphans)?;
        tree.check_cover()?;

        let stats = BuildStats {
            isolated,
            orphans: n_orphans,
            elapsed: start.elapsed(),
        };
        self.print_summary(&tree, &stats)?;
        Ok(tree)
    }

    fn print_summary(&mut self, tree: &EliminationTree, stats: &BuildStats) -> std::io::Result<()> {
        if !self.settings.verbose {
            return Ok(());
        }
        let height = (0..tree.len()).map(|v| tree.depth(v)).max().unwrap_or(0);
        let leaves = (0..tree.len()).filter(|&v| tree.children(v).is_empty()).count();
        let largest = (0..tree.len()).map(|v| tree.elements(v).len()).max().unwrap_or(0);

        let mut out = Summary::new(format!(
            "elimination tree: {} elements, {:?} strategy",
            tree.n_elements(),
            self.settings.strategy
        ));
        out.fields(&[
            ("nodes", &tree.len()),
            ("leaves", &leaves),
            ("height", &height),
            ("largest node", &largest),
        ]);
        out.line(format!(
            "orphans placed = {} ({} isolated)",
            stats.orphans, stats.isolated
        ));
        out.fields(&[("build time", &format!("{:?}", stats.elapsed))]);
        self.stream.emit(&out)
    }
}

struct BuildStats {
    isolated: usize,
    orphans: usize,
    elapsed: std::time::Duration,
}

impl ConfigurablePrintTarget for TreeBuilder {
    fn print_to_stdout(&mut self) {
        self.stream.print_to_stdout()
    }
    fn print_to_stderr(&mut self) {
        self.stream.print_to_stderr()
    }
    fn print_to_file(&mut self, file: std::fs::File) {
        self.stream.print_to_file(file)
    }
    fn print_to_stream(&mut self, stream: Box<dyn Write + Send + Sync>) {
        self.stream.print_to_stream(stream)
    }
    fn print_to_sink(&mut self) {
        self.stream.print_to_sink()
    }
    fn print_to_buffer(&mut self) {
        self.stream.print_to_buffer()
    }
    fn get_print_buffer(&mut self) -> std::io::Result<String> {
        self.stream.get_print_buffer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(n: usize) -> Vec<(usize, usize, f64)> {
        (0..n).map(|k| (k, (k + 1) % n, 1.0)).collect()
    }

    #[test]
    fn test_empty_graph() {
        let mut builder = TreeBuilder::new(TreeSettings::default()).unwrap();
        assert!(matches!(
            builder.build(&MeshGraph::isolated(0)),
            Err(TreeError::DisconnectedInput)
        ));
    }

    #[test]
    fn test_isolated_vertices_go_to_root() {
        let mut edges = ring(12);
        edges.push((12, 12, 1.0));
        let g = MeshGraph::from_edges(14, &edges).unwrap();

        for tag in [
            TreeStrategyTag::HeavyEdgeMatching,
            TreeStrategyTag::PartitionBased,
            TreeStrategyTag::NestedDissection,
        ] {
            let settings = TreeSettingsBuilder::default()
                .strategy(tag)
                .leaf_size(3)
                .build()
                .unwrap();
            let tree = TreeBuilder::new(settings).unwrap().build(&g).unwrap();
            tree.check_cover().unwrap();
            assert_eq!(tree.owner(12), Some(tree.root()));
            assert_eq!(tree.owner(13), Some(tree.root()));
        }
    }

    #[test]
    fn test_all_isolated() {
        let g = MeshGraph::isolated(3);
        let mut builder = TreeBuilder::new(TreeSettings::default()).unwrap();
        let tree = builder.build(&g).unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.elements(tree.root()), &[0, 1, 2]);
    }

    #[test]
    fn test_verbose_summary() {
        let g = MeshGraph::from_edges(8, &ring(8)).unwrap();
        let settings = TreeSettingsBuilder::default().verbose(true).build().unwrap();
        let mut builder = TreeBuilder::new(settings).unwrap();
        builder.print_to_buffer();
        builder.build(&g).unwrap();
        let text = builder.get_print_buffer().unwrap();
        assert!(text.contains("elimination tree: 8 elements"));
        assert!(text.contains("orphans placed = 0"));
    }
}
