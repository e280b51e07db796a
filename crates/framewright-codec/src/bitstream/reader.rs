//! Byte stream reader
//!
//! Reads big-endian words from a borrowed buffer and mirrors the writer's CRC
//! bookkeeping: payload words read with [`ByteStreamReader::read_word`] extend
//! the CRC using the register of the last type 1 WRITE.

use crate::checksum::crc_step;
use crate::error::{CodecError, Result};
use crate::packet::SYNC_WORD;
use crate::registers::Register;
use bytes::Buf;

/// Reader with CRC bookkeeping
#[derive(Debug)]
pub struct ByteStreamReader<'a> {
    buf: &'a [u8],
    len: usize,
    crc: u32,
    crc_register: Register,
}

impl<'a> ByteStreamReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            buf: data,
            len: data.len(),
            crc: 0,
            crc_register: Register::Crc,
        }
    }

    /// Byte offset of the next unread byte
    pub fn position(&self) -> usize {
        self.len - self.buf.remaining()
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    /// True if a whole word is left
    pub fn has_word(&self) -> bool {
        self.buf.remaining() >= 4
    }

    /// Next word without consuming it
    pub fn peek_word(&self) -> Option<u32> {
        if self.has_word() {
            Some(u32::from_be_bytes([
                self.buf[0],
                self.buf[1],
                self.buf[2],
                self.buf[3],
            ]))
        } else {
            None
        }
    }

    /// Read a packet header; headers never touch the CRC
    pub fn read_header(&mut self) -> Result<u32> {
        self.read_raw_word()
    }

    /// Read a payload word and extend the CRC
    pub fn read_word(&mut self) -> Result<u32> {
        let word = self.read_raw_word()?;
        self.crc = crc_step(u32::from(self.crc_register.raw()), word, self.crc);
        Ok(word)
    }

    /// Read a word without touching the CRC
    pub fn read_raw_word(&mut self) -> Result<u32> {
        if !self.has_word() {
            return Err(CodecError::UnexpectedEof {
                offset: self.position(),
            });
        }
        Ok(self.buf.get_u32())
    }

    /// Advance one byte at a time until just past the next sync word.
    ///
    /// Returns the offset of the sync word itself.
    pub fn seek_sync(&mut self) -> Result<usize> {
        let start = self.position();
        while let Some(word) = self.peek_word() {
            if word == SYNC_WORD {
                let offset = self.position();
                self.buf.advance(4);
                return Ok(offset);
            }
            self.buf.advance(1);
        }
        // Leave the reader drained so callers see a clean end of stream
        self.buf.advance(self.buf.remaining());
        Err(CodecError::SyncNotFound { offset: start })
    }

    /// Register whose address feeds subsequent payload CRC updates
    pub fn set_crc_register(&mut self, register: Register) {
        self.crc_register = register;
    }

    pub fn crc(&self) -> u32 {
        self.crc
    }

    pub fn reset_crc(&mut self) {
        self.crc = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_words_big_endian() {
        let data = [0x30, 0x00, 0x80, 0x01, 0x00, 0x00, 0x00, 0x07, 0xAB];
        let mut reader = ByteStreamReader::new(&data);
        assert_eq!(reader.peek_word(), Some(0x3000_8001));
        assert_eq!(reader.read_header().unwrap(), 0x3000_8001);
        assert_eq!(reader.position(), 4);
        assert_eq!(reader.read_raw_word().unwrap(), 7);
        assert!(!reader.has_word());
        assert_eq!(reader.remaining(), 1);
        assert!(matches!(
            reader.read_word(),
            Err(CodecError::UnexpectedEof { offset: 8 })
        ));
    }

    #[test]
    fn test_payload_crc_uses_register() {
        let data = 0x0000_1234u32.to_be_bytes();
        let mut reader = ByteStreamReader::new(&data);
        reader.set_crc_register(Register::Far);
        reader.read_word().unwrap();
        assert_eq!(reader.crc(), crc_step(0x01, 0x0000_1234, 0));
        reader.reset_crc();
        assert_eq!(reader.crc(), 0);
    }

    #[test]
    fn test_seek_sync_unaligned() {
        let mut data = vec![0xFF, 0xFF, 0x00];
        data.extend_from_slice(&SYNC_WORD.to_be_bytes());
        data.extend_from_slice(&[0x20, 0x00, 0x00, 0x00]);
        let mut reader = ByteStreamReader::new(&data);
        assert_eq!(reader.seek_sync().unwrap(), 3);
        assert_eq!(reader.position(), 7);
        assert_eq!(reader.read_header().unwrap(), 0x2000_0000);
    }

    #[test]
    fn test_seek_sync_missing() {
        let data = [0u8; 16];
        let mut reader = ByteStreamReader::new(&data);
        assert!(matches!(
            reader.seek_sync(),
            Err(CodecError::SyncNotFound { offset: 0 })
        ));
        assert_eq!(reader.remaining(), 0);
    }
}
