//! Error types for database loading and bit assignment

use framewright_codec::CodecError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading the database or assigning bits
#[derive(Debug, Error)]
pub enum DbError {
    /// Database or input file could not be read
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed line in a database file
    #[error("{}:{line}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// Malformed line in assignment or harness text
    #[error("line {line}: malformed entry '{text}'")]
    MalformedLine { line: usize, text: String },

    /// Tile name not present in `tiles.txt`
    #[error("Unknown tile {0}")]
    UnknownTile(String),

    /// Feature not present in the tile type's bit table
    #[error("Unknown feature {feature} in tile {tile}")]
    UnknownFeature { tile: String, feature: String },

    /// Tile-relative bit outside every frame range of the tile
    #[error("Bad bit {tile}.{bit}")]
    BadTileBit { tile: String, bit: usize },

    /// Frame store rejected the bit
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Result type for database operations
pub type Result<T> = std::result::Result<T, DbError>;
