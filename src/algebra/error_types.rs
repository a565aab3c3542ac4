use thiserror::Error;

/// Error type returned by flat and hierarchical matrix operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatrixError {
    /// A matrix or block dimension was zero
    #[error("Invalid dimension {rows} x {cols}")]
    InvalidDimension { rows: usize, cols: usize },
    /// Matrix storage could not be obtained
    #[error("Unable to allocate storage for {elements} elements")]
    AllocationError { elements: usize },
    /// Element or tile index outside of the valid range
    #[error("Index ({}, {}) is out of bounds for extent {} x {}", index.0, index.1, bound.0, bound.1)]
    IndexOutOfBounds {
        index: (usize, usize),
        bound: (usize, usize),
    },
    /// Matrix storage was used after being released
    #[error("Matrix storage has already been released")]
    Released,
    /// Operands have incompatible shapes
    #[error("Incompatible dimensions")]
    IncompatibleDimension,
    /// Tile grid does not cover its matrix exactly once
    #[error("Tile grid does not cover the matrix exactly once")]
    CoverViolation,
}

/// Error type returned by the tile kernels.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KernelError {
    #[error("Tile operand dimensions are incompatible")]
    IncompatibleDimension,
    #[error("Tile is not positive definite (pivot {pivot})")]
    NotPositiveDefinite { pivot: usize },
    #[error("Triangular tile is singular (pivot {pivot})")]
    Singular { pivot: usize },
    #[error("Backend error code {0}")]
    Backend(i32),
    #[error("Kernel panicked: {0}")]
    Panicked(String),
    #[error("{0}")]
    Other(String),
}
