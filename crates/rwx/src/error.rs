//! Error types for model resolution and export.

use rwx_reader::ReadError;
use thiserror::Error;

/// Errors returned while reading, resolving or exporting a model.
#[derive(Error, Debug)]
pub enum RwxError {
    /// The model could not be parsed.
    #[error(transparent)]
    Read(#[from] ReadError),

    /// A triangle refers to a vertex its clump does not have.
    #[error("Vertex index {index} out of range (clump has {vertex_count} vertices)")]
    UnresolvedVertexIndex {
        /// The 1-based index as written.
        index: u32,
        /// Number of vertices in the owning clump.
        vertex_count: usize,
    },

    /// A transform that cannot be turned into a matrix.
    #[error("Invalid transform: {0}")]
    InvalidTransform(String),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The glTF container could not be written.
    #[error("glTF error: {0}")]
    Gltf(#[from] gltf::Error),

    /// An I/O error occurred during export.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for resolution and export.
pub type Result<T> = std::result::Result<T, RwxError>;
