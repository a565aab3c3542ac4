//! Coarsening strategies turning a connected mesh graph into tree nodes.

mod dissection;
mod heavy_edge;
mod partition;

pub(crate) use dissection::NestedDissection;
pub(crate) use heavy_edge::HeavyEdgeMatching;
pub(crate) use partition::PartitionBased;

use super::tree::TreeArena;
use super::*;
use enum_dispatch::*;

// inputs shared by every strategy.  Vertex indices refer to `graph`.
pub(crate) struct BuildContext<'a> {
    pub graph: &'a MeshGraph,
    pub settings: &'a TreeSettings,
    pub partitioner: &'a dyn GraphPartitioner,
}

#[enum_dispatch(TreeStrategy)]
pub(crate) enum Strategy {
    HeavyEdgeMatching(HeavyEdgeMatching),
    PartitionBased(PartitionBased),
    NestedDissection(NestedDissection),
}

impl From<TreeStrategyTag> for Strategy {
    fn from(tag: TreeStrategyTag) -> Self {
        match tag {
            TreeStrategyTag::HeavyEdgeMatching => HeavyEdgeMatching.into(),
            TreeStrategyTag::PartitionBased => PartitionBased.into(),
            TreeStrategyTag::NestedDissection => NestedDissection.into(),
        }
    }
}

#[enum_dispatch]
pub(crate) trait TreeStrategy {
    /// Adds nodes over the vertices of `ctx.graph` to `arena` and returns
    /// the vertices that were left unplaced.
    fn coarsen(
        &self,
        ctx: &BuildContext<'_>,
        arena: &mut TreeArena,
    ) -> Result<Vec<usize>, TreeError>;
}
