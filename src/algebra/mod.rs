//! Matrix storage and tile kernels.
//!
//! A [`FlatMatrix`] owns contiguous column major storage.  A [`HierMatrix`]
//! borrows a flat matrix exclusively and partitions it into a grid of
//! [`Tile`]s, which the scheduler turns into strided [`TileRef`] and
//! [`TileMut`] views when executing the [`TileKernels`].

mod error_types;
mod flat;
mod floats;
mod hierarchical;
pub mod kernels;
mod view;

pub use error_types::*;
pub use flat::*;
pub use floats::*;
pub use hierarchical::*;
pub use kernels::{NativeKernels, TileKernels};
pub use view::*;

#[cfg(feature = "blas")]
pub use kernels::BlasKernels;
