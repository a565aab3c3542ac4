//! Blocked algorithms expressed as streams of tile tasks.
//!
//! Each function here only submits tasks; nothing is computed until
//! [`TileScheduler::run`](crate::scheduler::TileScheduler::run) is called.
//! All functions return the number of tasks submitted.

mod axpy;
mod cholesky;
mod qr;

pub use axpy::*;
pub use cholesky::*;
pub use qr::*;

use crate::algebra::MatrixError;
use crate::scheduler::{SchedulerError, TileLayout};

// square matrix tiled with square blocks
fn check_square(layout: &TileLayout) -> Result<(), SchedulerError> {
    let (m, n) = layout.size;
    let (bm, bn) = layout.block;
    if m != n || bm != bn {
        return Err(MatrixError::IncompatibleDimension.into());
    }
    Ok(())
}

fn check_same_layout(x: &TileLayout, y: &TileLayout) -> Result<(), SchedulerError> {
    if x != y {
        return Err(MatrixError::IncompatibleDimension.into());
    }
    Ok(())
}
