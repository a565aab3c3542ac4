//! Dependency tracking execution of tile tasks.
//!
//! Tasks are submitted against tiles of registered hierarchical matrices.
//! For every tile the scheduler remembers the last task that wrote it and
//! the tasks that have read it since, which determines the dependencies of
//! each new task.  A run then executes the resulting acyclic task graph on
//! a fixed size pool of worker threads.

mod cache;
mod error;
mod graph;
mod ready;
mod registry;
#[allow(clippy::module_inception)]
mod scheduler;
mod settings;
mod task;

pub use cache::{CacheStats, TileCache};
pub use error::*;
pub use scheduler::*;
pub use settings::*;
pub use task::*;
