/// Core error types for the Meshmorph engine.
use std::path::PathBuf;

use crate::mesh::TriangleFamily;

/// A specialized Result type for Meshmorph operations.
pub type MorphResult<T> = Result<T, MorphError>;

/// Top-level error type encompassing all Meshmorph subsystems.
#[derive(Debug, thiserror::Error)]
pub enum MorphError {
    #[error("missing {role} image: both a start and an end image are required to morph")]
    MissingImage { role: String },

    #[error("lattice resolution mismatch: start is {start}x{start}, end is {end}x{end}")]
    ResolutionMismatch { start: usize, end: usize },

    #[error("singular source triangle: {family} ({row}, {col}) at t={t:.4}")]
    SingularTriangle {
        family: TriangleFamily,
        row: usize,
        col: usize,
        t: f64,
    },

    #[error("warp render error: {0}")]
    WarpRender(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("asset error: {message} ({path:?})")]
    Asset { message: String, path: PathBuf },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MorphError {
    /// Create a missing-image error for the given image role.
    pub fn missing_image(role: impl Into<String>) -> Self {
        MorphError::MissingImage { role: role.into() }
    }

    /// Create a singular-triangle error carrying the triangle location and frame time.
    pub fn singular(family: TriangleFamily, row: usize, col: usize, t: f64) -> Self {
        MorphError::SingularTriangle {
            family,
            row,
            col,
            t,
        }
    }

    /// Create an asset error.
    pub fn asset(message: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        MorphError::Asset {
            message: message.into(),
            path: path.into(),
        }
    }

    /// Whether this error reflects a broken geometric invariant rather than I/O.
    pub fn is_geometric(&self) -> bool {
        matches!(self, MorphError::SingularTriangle { .. })
    }
}
