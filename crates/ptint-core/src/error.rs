//! Error types for ptint-rs.

use std::path::PathBuf;

use thiserror::Error;

/// The main error type for ptint-rs data operations.
#[derive(Error, Debug)]
pub enum PtintError {
    /// A text dataset or parameter file could not be parsed.
    #[error("parse error in {path:?} at line {line}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// A tetrahedron references a vertex that does not exist.
    #[error("vertex index {index} out of range ({count} vertices)")]
    InvalidIndex { index: u32, count: usize },

    /// Data size mismatch.
    #[error("data size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// `normalize` was called on an already normalized mesh.
    #[error("mesh has already been normalized")]
    AlreadyNormalized,

    /// The mesh has no vertices or no tetrahedra.
    #[error("mesh is empty")]
    EmptyMesh,

    /// A parameter is outside of its valid range.
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl PtintError {
    /// Builds a [`PtintError::Parse`] for a file and 1-based line number.
    pub fn parse(path: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            line,
            message: message.into(),
        }
    }
}

/// A specialized Result type for ptint-rs operations.
pub type Result<T> = std::result::Result<T, PtintError>;
