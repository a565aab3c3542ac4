use crate::settings::SettingsError;
use thiserror::Error;

/// Error type returned by mesh graph construction and elimination tree builds.
#[derive(Error, Debug)]
pub enum TreeError {
    #[error("Mesh graph has no vertices")]
    DisconnectedInput,
    #[error("Malformed mesh graph: {0}")]
    InvalidGraph(&'static str),
    #[error("Vertex index {index} out of bounds for graph of {bound} vertices")]
    IndexOutOfBounds { index: usize, bound: usize },
    #[error("Elimination tree does not cover every element exactly once")]
    InternalInvariantViolation,
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
