//! Error types for bitstream encoding and decoding

use thiserror::Error;

/// Errors that can occur while building or parsing a bitstream
#[derive(Debug, Error)]
pub enum CodecError {
    /// A payload word was expected but the stream ended
    #[error("Unexpected end of bitstream at offset {offset}")]
    UnexpectedEof { offset: usize },

    /// No sync word between the given offset and the end of the stream
    #[error("Sync word not found after offset {offset}")]
    SyncNotFound { offset: usize },

    /// Encoding requires at least one frame
    #[error("Frame store is empty")]
    EmptyFrameStore,

    /// Frame address outside the frame store
    #[error("Frame 0x{0:08x} is not in the frame store")]
    UnknownFrame(u32),

    /// Bit index outside a frame
    #[error("Bit {bit} is outside frame 0x{frame:08x}")]
    BitOutOfRange { frame: u32, bit: usize },

    /// Malformed `F<frame>W<word>B<bit>` text
    #[error("Invalid bit address '{0}'")]
    InvalidBitAddress(String),

    /// Type 1 packets cannot carry this many words
    #[error("Type 1 payload of {0} words exceeds the packet limit")]
    PayloadTooLong(usize),

    /// Header string does not fit its 16-bit length prefix
    #[error("Header field '{tag}' is too long ({len} bytes)")]
    FieldTooLong { tag: char, len: usize },

    /// Structurally invalid bitstream
    #[error("Invalid bitstream: {0}")]
    InvalidBitstream(String),

    /// Profile loading failed
    #[error("Profile error: {0}")]
    Profile(#[from] crate::bitstream::ConfigError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for codec operations
pub type Result<T> = std::result::Result<T, CodecError>;
