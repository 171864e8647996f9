//! Error types for the world engine

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the engine
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Invalid chunk key: {0}")]
    InvalidChunkKey(String),

    #[error("Chunk shape mismatch: expected {expected} cells, found {actual}")]
    ChunkShape { expected: usize, actual: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Streaming error: {0}")]
    Streaming(String),
}

impl Error {
    /// Wrap a JSON parse failure with the file it came from
    pub fn decode(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Error::Decode { path: path.into(), source }
    }

    /// Whether this error came from malformed persisted data
    pub fn is_decode(&self) -> bool {
        matches!(self, Error::Decode { .. } | Error::ChunkShape { .. } | Error::InvalidChunkKey(_))
    }
}
