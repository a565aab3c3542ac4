//! __tessera__ is a Rust implementation of a tiled dense linear algebra task
//! scheduler, together with a builder for elimination trees over unstructured
//! meshes.
//!
//! The crate has two halves.
//!
//! * __Tiled factorizations__.  A dense [`FlatMatrix`](crate::algebra::FlatMatrix)
//!   is partitioned into a grid of tiles by a
//!   [`HierMatrix`](crate::algebra::HierMatrix).  Blocked algorithms in
//!   [`blocked`] (Cholesky, QR, AXPY) describe a factorization as a stream of
//!   tile tasks, and the [`TileScheduler`](crate::scheduler::TileScheduler)
//!   resolves their read/write dependencies and executes them over a fixed
//!   size worker pool.
//!
//! * __Elimination trees__.  A mesh adjacency graph
//!   ([`MeshGraph`](crate::etree::MeshGraph)) is converted into an
//!   [`EliminationTree`](crate::etree::EliminationTree) by heavy-edge matching,
//!   recursive partitioning or nested dissection.  Every element of the mesh is
//!   placed in exactly one tree node, and the dense block attached to each node
//!   can be factored through the scheduler in elimination (post) order.
//!
//! ## Example
//!
//! ```no_run
//! use tessera::algebra::*;
//! use tessera::blocked;
//! use tessera::scheduler::*;
//!
//! let n = 500;
//! let mut a = FlatMatrix::<f64>::identity(n).unwrap();
//! let settings = SchedulerSettingsBuilder::default()
//!     .max_threads(4)
//!     .build()
//!     .unwrap();
//!
//! let mut sched = TileScheduler::new(settings).unwrap();
//! let h = sched.register(HierMatrix::new(&mut a, 192, 192).unwrap()).unwrap();
//! blocked::cholesky(&mut sched, h).unwrap();
//! let report = sched.run().unwrap();
//! assert_eq!(report.failed, 0);
//! ```
//!
//! # License
//!
//! Licensed under Apache License, Version 2.0.

pub mod algebra;
pub mod blocked;
pub mod etree;
pub mod io;
pub mod scheduler;
pub mod settings;
