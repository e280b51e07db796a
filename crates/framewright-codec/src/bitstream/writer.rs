//! Byte stream writer
//!
//! Appends big-endian words to an in-memory buffer. Payload words extend the
//! running CRC with the register most recently addressed by a type 1 header;
//! header words and raw bytes do not.

use crate::checksum::crc_step;
use crate::error::{CodecError, Result};
use crate::packet::{PacketHeader, TYPE1_MAX_WORDS};
use crate::registers::{Command, Opcode, Register};
use bytes::{BufMut, BytesMut};

/// Writer with CRC bookkeeping
#[derive(Debug, Default)]
pub struct ByteStreamWriter {
    buf: BytesMut,
    crc: u32,
    crc_register: Register,
    crc_flushes: usize,
}

impl ByteStreamWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Bytes written so far
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Current CRC accumulator
    pub fn crc(&self) -> u32 {
        self.crc
    }

    /// Number of CRC register writes emitted
    pub fn crc_flushes(&self) -> usize {
        self.crc_flushes
    }

    pub fn reset_crc(&mut self) {
        self.crc = 0;
    }

    pub fn write_byte(&mut self, byte: u8) {
        self.buf.put_u8(byte);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.put_slice(bytes);
    }

    /// Write `count` copies of `byte`
    pub fn write_fill(&mut self, byte: u8, count: usize) {
        self.buf.put_bytes(byte, count);
    }

    /// Tagged header string: tag byte, u16 length (including NUL), bytes, NUL
    pub fn write_field(&mut self, tag: u8, value: &str) -> Result<()> {
        let len = u16::try_from(value.len() + 1).map_err(|_| CodecError::FieldTooLong {
            tag: tag as char,
            len: value.len(),
        })?;
        self.buf.put_u8(tag);
        self.buf.put_u16(len);
        self.buf.put_slice(value.as_bytes());
        self.buf.put_u8(0);
        Ok(())
    }

    /// Write a word without touching the CRC
    pub fn write_word(&mut self, word: u32) {
        self.buf.put_u32(word);
    }

    /// Write a payload word and extend the CRC
    pub fn write_payload_word(&mut self, word: u32) {
        self.buf.put_u32(word);
        self.crc = crc_step(u32::from(self.crc_register.raw()), word, self.crc);
    }

    /// Type 1 packet with its payload
    pub fn write_short(&mut self, opcode: Opcode, register: Register, payload: &[u32]) -> Result<()> {
        if payload.len() > TYPE1_MAX_WORDS {
            return Err(CodecError::PayloadTooLong(payload.len()));
        }
        self.crc_register = register;
        let header = PacketHeader::Type1 {
            opcode,
            register,
            word_count: payload.len(),
        };
        self.write_word(header.encode());
        for &word in payload {
            self.write_payload_word(word);
        }
        Ok(())
    }

    /// Type 2 packet with its payload; continues the current register
    pub fn write_long(&mut self, payload: &[u32]) {
        self.write_word(PacketHeader::long(payload.len()).encode());
        for &word in payload {
            self.write_payload_word(word);
        }
    }

    pub fn write_nop(&mut self) {
        self.crc_register = Register::Crc;
        self.write_word(PacketHeader::nop().encode());
    }

    pub fn write_nops(&mut self, count: usize) {
        for _ in 0..count {
            self.write_nop();
        }
    }

    /// Single-word register write
    pub fn write_register(&mut self, register: Register, value: u32) {
        self.crc_register = register;
        self.write_word(PacketHeader::write(register, 1).encode());
        self.write_payload_word(value);
    }

    pub fn write_command(&mut self, command: Command) {
        self.write_register(Register::Cmd, command.raw());
    }

    /// Emit the accumulated CRC to the CRC register, then reset it
    pub fn flush_crc(&mut self) {
        let crc = self.crc;
        self.write_register(Register::Crc, crc);
        self.crc = 0;
        self.crc_flushes += 1;
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf.to_vec()
    }
}
