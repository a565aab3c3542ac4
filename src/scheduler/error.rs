use super::{MatrixHandle, TileCoord, TileOpKind};
use crate::algebra::{KernelError, MatrixError};
use crate::settings::SettingsError;
use thiserror::Error;

/// Error type returned by the tile scheduler.
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// First kernel failure of a run.  Later failures of tasks that were
    /// already executing are only counted.
    #[error("Kernel {op} failed on tile {tile}: {source}")]
    KernelFailure {
        op: TileOpKind,
        tile: TileCoord,
        #[source]
        source: KernelError,
        /// number of tasks that failed during the run
        failed_tasks: usize,
    },
    #[error("Tile {0} is outside of its matrix grid")]
    IndexOutOfBounds(TileCoord),
    #[error("No matrix registered as {0}")]
    UnknownMatrix(MatrixHandle),
    #[error("Task names tile {0} more than once")]
    AliasedOperands(TileCoord),
    #[error("Task graph was left with {pending} unexecuted tasks")]
    InternalInvariantViolation { pending: usize },
    #[error(transparent)]
    Matrix(#[from] MatrixError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("Unable to start worker pool: {0}")]
    ThreadPool(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
