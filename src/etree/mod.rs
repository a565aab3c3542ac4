//! Elimination trees over mesh element graphs.
//!
//! A [`TreeBuilder`] groups the elements of a [`MeshGraph`] into the nodes
//! of an [`EliminationTree`] using one of three strategies selected by
//! [`TreeSettings::strategy`]:
//!
//! * heavy-edge matching, contracting heavy edges level by level,
//! * recursive partitioning with a [`GraphPartitioner`],
//! * nested dissection with level structure separators.
//!
//! Every element ends up in exactly one node.  The dense block of each node
//! can then be factored through a [`TileScheduler`](crate::scheduler::TileScheduler)
//! with [`submit_tree_cholesky`].

mod blocks;
mod builder;
mod disjoint_set_union;
mod error;
mod graph;
#[cfg(feature = "serde")]
mod json;
mod ordering;
mod orphans;
mod partition;
mod settings;
mod strategy;
mod tree;

pub use blocks::*;
pub use builder::*;
pub use error::*;
pub use graph::*;
pub use partition::*;
pub use settings::*;
pub use tree::EliminationTree;
