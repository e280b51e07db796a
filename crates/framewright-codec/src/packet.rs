//! Packet headers
//!
//! ```text
//! Type 1: [31:29]=001 [28:27]=opcode [26:13]=register [10:0]=word count
//! Type 2: [31:29]=010 [28:27]=opcode [25:0]=word count
//! ```
//!
//! A type 2 packet has no register field; its payload goes to whatever
//! register the preceding type 1 packet addressed.

use crate::registers::{Opcode, Register};

/// Sync word that starts the packet stream
pub const SYNC_WORD: u32 = 0xAA99_5566;

/// All-ones word seen where a header was expected
pub const DUMMY_WORD: u32 = 0xFFFF_FFFF;

/// Largest payload a type 1 packet can announce
pub const TYPE1_MAX_WORDS: usize = 0x7FF;

const TYPE1: u32 = 0b001;
const TYPE2: u32 = 0b010;
const REGISTER_MASK: u32 = 0x3FFF;
const TYPE2_COUNT_MASK: u32 = 0x03FF_FFFF;

/// Decoded packet header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketHeader {
    /// Short packet addressing a register
    Type1 {
        opcode: Opcode,
        register: Register,
        word_count: usize,
    },
    /// Long packet continuing the previous register
    Type2 { opcode: Opcode, word_count: usize },
    /// Any other type field; ends parsing
    Unknown { packet_type: u8, raw: u32 },
}

impl PacketHeader {
    /// Type 1 NOP with no payload
    pub fn nop() -> Self {
        PacketHeader::Type1 {
            opcode: Opcode::Nop,
            register: Register::Crc,
            word_count: 0,
        }
    }

    /// Type 1 write of `word_count` words to `register`
    pub fn write(register: Register, word_count: usize) -> Self {
        PacketHeader::Type1 {
            opcode: Opcode::Write,
            register,
            word_count,
        }
    }

    /// Type 2 packet as emitted for bulk frame data
    pub fn long(word_count: usize) -> Self {
        PacketHeader::Type2 {
            opcode: Opcode::Read,
            word_count,
        }
    }

    /// Encode to the 32-bit header word
    pub fn encode(&self) -> u32 {
        match *self {
            PacketHeader::Type1 {
                opcode,
                register,
                word_count,
            } => {
                (TYPE1 << 29)
                    | (opcode.bits() << 27)
                    | ((u32::from(register.raw()) & REGISTER_MASK) << 13)
                    | (word_count as u32 & TYPE1_MAX_WORDS as u32)
            }
            PacketHeader::Type2 { opcode, word_count } => {
                (TYPE2 << 29) | (opcode.bits() << 27) | (word_count as u32 & TYPE2_COUNT_MASK)
            }
            PacketHeader::Unknown { raw, .. } => raw,
        }
    }

    /// Decode a 32-bit header word
    pub fn decode(raw: u32) -> Self {
        let packet_type = raw >> 29;
        let opcode = Opcode::from_bits(raw >> 27);
        match packet_type {
            TYPE1 => PacketHeader::Type1 {
                opcode,
                register: Register::from_raw(((raw >> 13) & REGISTER_MASK) as u16),
                word_count: (raw & TYPE1_MAX_WORDS as u32) as usize,
            },
            TYPE2 => PacketHeader::Type2 {
                opcode,
                word_count: (raw & TYPE2_COUNT_MASK) as usize,
            },
            _ => PacketHeader::Unknown {
                packet_type: packet_type as u8,
                raw,
            },
        }
    }
}
