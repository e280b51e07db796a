//! Configuration bitstream codec
//!
//! This crate handles:
//! - Transport CRC and per-frame ECC syndromes
//! - The frame/word/bit addressing model shared by both directions
//! - Packet encoding of a frame store into a configuration stream
//! - Packet decoding of a configuration stream back into frame bits

pub mod bitstream;
pub mod checksum;
pub mod error;
pub mod frame;
pub mod packet;
pub mod registers;

pub use bitstream::{
    Bitstream, BitstreamDecoder, BitstreamGenerator, BitstreamMetadata, BitstreamProfile, DecodeEvent,
    DecodeReport, Diagnostic,
};
pub use error::{CodecError, Result};
pub use frame::{BitAddress, Frame, FrameChain, FrameStore};
pub use registers::{Command, Opcode, Register};
