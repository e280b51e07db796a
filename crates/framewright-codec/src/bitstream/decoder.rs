//! Packet Decoder
//!
//! Walks a configuration stream packet by packet, rebuilding the data bits
//! written through FDRI and checking the transport CRC and every frame's ECC
//! syndrome along the way. Integrity mismatches are reported as diagnostics,
//! never as errors.

use super::reader::ByteStreamReader;
use crate::checksum::bit_syndrome;
use crate::error::{CodecError, Result};
use crate::frame::{
    is_ecc_bit, BitAddress, FrameChain, FrameStore, BITS_PER_WORD, ECC_WORD, WORDS_PER_FRAME,
};
use crate::packet::{PacketHeader, DUMMY_WORD};
use crate::registers::{Command, Opcode, Register};
use std::fmt;
use tracing::{debug, info, warn};

/// Something noteworthy seen in the stream, other than a data bit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Sync word found; `offset` is its byte position
    SyncFound { offset: usize },
    /// All-ones word where a header was expected
    Desync { offset: usize },
    /// No sync word after a desync
    SyncLost { offset: usize },
    Nop,
    /// Type 1 READ or reserved opcode; carries no payload here
    RegisterRead { register: Register },
    RegisterWrite { register: Register, word_count: usize },
    /// Type 2 packet continuing `register`
    LongPacket { register: Register, word_count: usize },
    FrameAddress { address: u32 },
    /// FAR write with other than one payload word
    BadFarLength { word_count: usize },
    Command { command: Command },
    /// Payload word of a register without special handling
    Data { register: Register, word: u32 },
    CrcCheck { written: u32, computed: u32 },
    EccCheck {
        frame: u32,
        observed: u64,
        computed: u64,
    },
    /// Unrecognised packet type; decoding stops here
    UnknownPacket { packet_type: u8, header: u32 },
}

impl Diagnostic {
    /// True for failed CRC and ECC checks
    pub fn is_mismatch(&self) -> bool {
        match *self {
            Diagnostic::CrcCheck { written, computed } => written != computed,
            Diagnostic::EccCheck {
                observed, computed, ..
            } => observed != computed,
            _ => false,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Diagnostic::SyncFound { offset } => write!(f, "sync word at offset {}", offset),
            Diagnostic::Desync { offset } => write!(f, "desync at offset {}", offset),
            Diagnostic::SyncLost { offset } => write!(f, "no sync word after offset {}", offset),
            Diagnostic::Nop => write!(f, "NOP"),
            Diagnostic::RegisterRead { register } => write!(f, "READ {}", register),
            Diagnostic::RegisterWrite {
                register,
                word_count,
            } => write!(f, "WRITE {} ({} words)", register, word_count),
            Diagnostic::LongPacket {
                register,
                word_count,
            } => write!(f, "type 2 packet, {} words to {}", word_count, register),
            Diagnostic::FrameAddress { address } => write!(f, "FAR 0x{:08x}", address),
            Diagnostic::BadFarLength { word_count } => {
                write!(f, "FAR write carries {} words", word_count)
            }
            Diagnostic::Command { command } => write!(f, "CMD {}", command),
            Diagnostic::Data { register, word } => write!(f, "{} 0x{:08x}", register, word),
            Diagnostic::CrcCheck { written, computed } => {
                write!(f, "CRC 0x{:08x} computed 0x{:08x}", written, computed)?;
                if self.is_mismatch() {
                    write!(f, " *****")?;
                }
                Ok(())
            }
            Diagnostic::EccCheck {
                frame,
                observed,
                computed,
            } => {
                write!(
                    f,
                    "ECC F0x{:08x} 0x{:012x} computed 0x{:012x}",
                    frame, observed, computed
                )?;
                if self.is_mismatch() {
                    write!(f, " ~~~~~")?;
                }
                Ok(())
            }
            Diagnostic::UnknownPacket {
                packet_type,
                header,
            } => write!(
                f,
                "unknown packet type {} (0x{:08x}), stopping",
                packet_type, header
            ),
        }
    }
}

/// One decoded item, in stream order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeEvent {
    Bit(BitAddress),
    Diagnostic(Diagnostic),
}

/// Everything a decode run produced
#[derive(Debug, Clone, Default)]
pub struct DecodeReport {
    /// Bits and diagnostics interleaved in stream order
    pub events: Vec<DecodeEvent>,
    /// Frames that received at least one data bit
    pub frames: FrameStore,
}

impl DecodeReport {
    /// Data bits in stream order
    pub fn bits(&self) -> impl Iterator<Item = BitAddress> + '_ {
        self.events.iter().filter_map(|event| match event {
            DecodeEvent::Bit(addr) => Some(*addr),
            DecodeEvent::Diagnostic(_) => None,
        })
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.events.iter().filter_map(|event| match event {
            DecodeEvent::Diagnostic(diag) => Some(diag),
            DecodeEvent::Bit(_) => None,
        })
    }

    /// Failed CRC and ECC checks
    pub fn mismatches(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics().filter(|diag| diag.is_mismatch())
    }

    /// True if every CRC and ECC check matched
    pub fn is_clean(&self) -> bool {
        self.mismatches().next().is_none()
    }
}

/// Packet stream to frame bits decoder
pub struct BitstreamDecoder<'a> {
    chain: &'a FrameChain,
}

impl<'a> BitstreamDecoder<'a> {
    /// `chain` decides where FDRI data continues after each full frame
    pub fn new(chain: &'a FrameChain) -> Self {
        Self { chain }
    }

    /// Decode a complete bitstream file image
    pub fn decode(&self, data: &[u8]) -> Result<DecodeReport> {
        let mut state = DecodeState::new(self.chain, data);
        state.run()?;
        let report = state.report;
        info!(
            "Decoded {} bits in {} frames, {} integrity mismatches",
            report.bits().count(),
            report.frames.len(),
            report.mismatches().count()
        );
        Ok(report)
    }
}

/// Transport and frame state for one decode run
struct DecodeState<'a> {
    chain: &'a FrameChain,
    reader: ByteStreamReader<'a>,
    last_register: Register,
    frame: u32,
    word: usize,
    observed_ecc: u64,
    computed_ecc: u64,
    report: DecodeReport,
}

impl<'a> DecodeState<'a> {
    fn new(chain: &'a FrameChain, data: &'a [u8]) -> Self {
        Self {
            chain,
            reader: ByteStreamReader::new(data),
            last_register: Register::Crc,
            frame: 0,
            word: 0,
            observed_ecc: 0,
            computed_ecc: 0,
            report: DecodeReport::default(),
        }
    }

    fn emit(&mut self, diagnostic: Diagnostic) {
        self.report.events.push(DecodeEvent::Diagnostic(diagnostic));
    }

    fn run(&mut self) -> Result<()> {
        let offset = self.reader.seek_sync()?;
        info!("Sync word at offset {}", offset);
        self.emit(Diagnostic::SyncFound { offset });

        while self.reader.has_word() {
            let header_offset = self.reader.position();
            let raw = self.reader.read_header()?;

            if raw == DUMMY_WORD {
                warn!("Desync at offset {}", header_offset);
                self.emit(Diagnostic::Desync {
                    offset: header_offset,
                });
                if !self.resync()? {
                    break;
                }
                continue;
            }

            match PacketHeader::decode(raw) {
                PacketHeader::Type1 {
                    opcode: Opcode::Write,
                    register,
                    word_count,
                } => {
                    self.reader.set_crc_register(register);
                    self.last_register = register;
                    debug!("WRITE {} ({} words)", register, word_count);
                    self.emit(Diagnostic::RegisterWrite {
                        register,
                        word_count,
                    });
                    self.write_packet(register, word_count)?;
                }
                PacketHeader::Type1 {
                    opcode: Opcode::Nop,
                    ..
                } => self.emit(Diagnostic::Nop),
                PacketHeader::Type1 { register, .. } => {
                    self.emit(Diagnostic::RegisterRead { register })
                }
                PacketHeader::Type2 { word_count, .. } => {
                    let register = self.last_register;
                    self.emit(Diagnostic::LongPacket {
                        register,
                        word_count,
                    });
                    self.long_packet(register, word_count)?;
                }
                PacketHeader::Unknown { packet_type, raw } => {
                    warn!(
                        "Unknown packet type {} at offset {}, stopping",
                        packet_type, header_offset
                    );
                    self.emit(Diagnostic::UnknownPacket {
                        packet_type,
                        header: raw,
                    });
                    break;
                }
            }
        }
        Ok(())
    }

    /// Returns false when the stream holds no further sync word
    fn resync(&mut self) -> Result<bool> {
        match self.reader.seek_sync() {
            Ok(offset) => {
                info!("Resynchronized at offset {}", offset);
                self.emit(Diagnostic::SyncFound { offset });
                Ok(true)
            }
            Err(CodecError::SyncNotFound { offset }) => {
                warn!("No sync word after offset {}", offset);
                self.emit(Diagnostic::SyncLost { offset });
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    fn write_packet(&mut self, register: Register, word_count: usize) -> Result<()> {
        match register {
            Register::Far => {
                if word_count != 1 {
                    self.emit(Diagnostic::BadFarLength { word_count });
                }
                let mut address = None;
                for _ in 0..word_count {
                    address = Some(self.reader.read_word()?);
                }
                if let Some(address) = address {
                    self.seek_frame(address);
                    self.emit(Diagnostic::FrameAddress { address });
                }
            }
            Register::Crc => {
                let mut written = None;
                for _ in 0..word_count {
                    written = Some(self.reader.read_raw_word()?);
                }
                if let Some(written) = written {
                    let computed = self.reader.crc();
                    if written != computed {
                        warn!(
                            "CRC mismatch: stream 0x{:08x}, computed 0x{:08x}",
                            written, computed
                        );
                    }
                    self.emit(Diagnostic::CrcCheck { written, computed });
                }
                self.reader.reset_crc();
                if let Some(next) = self.chain.next(self.frame) {
                    self.seek_frame(next);
                }
            }
            Register::Fdri => {
                for _ in 0..word_count {
                    let word = self.reader.read_word()?;
                    self.frame_word(word);
                }
            }
            Register::Cmd => {
                let mut last = None;
                for _ in 0..word_count {
                    let raw = self.reader.read_word()?;
                    self.emit(Diagnostic::Command {
                        command: Command::from_raw(raw),
                    });
                    last = Some(raw);
                }
                if last == Some(Command::Rcrc.raw()) {
                    self.reader.reset_crc();
                }
            }
            _ => {
                for _ in 0..word_count {
                    let word = self.reader.read_word()?;
                    self.emit(Diagnostic::Data { register, word });
                }
            }
        }
        Ok(())
    }

    fn long_packet(&mut self, register: Register, word_count: usize) -> Result<()> {
        for _ in 0..word_count {
            let word = self.reader.read_word()?;
            if register == Register::Fdri {
                self.frame_word(word);
            } else {
                self.emit(Diagnostic::Data { register, word });
            }
        }
        Ok(())
    }

    /// Start a new frame at `address` with clean accumulators
    fn seek_frame(&mut self, address: u32) {
        self.frame = address;
        self.word = 0;
        self.observed_ecc = 0;
        self.computed_ecc = 0;
    }

    /// Consume the next 32 bits of the current frame
    fn frame_word(&mut self, data: u32) {
        let word = self.word;
        for bit in (0..BITS_PER_WORD).filter(|&bit| data & (1 << bit) != 0) {
            if is_ecc_bit(word, bit) {
                let position = (word - ECC_WORD) * BITS_PER_WORD + bit;
                self.observed_ecc |= 1u64 << position;
            } else {
                self.computed_ecc ^= bit_syndrome(word, bit);
                let address = BitAddress::new(self.frame, word, bit);
                self.report
                    .frames
                    .entry(self.frame)
                    .set(address.frame_bit(), true);
                self.report.events.push(DecodeEvent::Bit(address));
            }
        }

        self.word += 1;
        if self.word < WORDS_PER_FRAME {
            return;
        }

        let (frame, observed, computed) = (self.frame, self.observed_ecc, self.computed_ecc);
        if observed != computed {
            warn!(
                "ECC mismatch in frame 0x{:08x}: stream 0x{:012x}, computed 0x{:012x}",
                frame, observed, computed
            );
        }
        self.emit(Diagnostic::EccCheck {
            frame,
            observed,
            computed,
        });
        let next = self.chain.next(frame).unwrap_or(frame);
        self.seek_frame(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::SYNC_WORD;

    struct StreamBuilder {
        data: Vec<u8>,
    }

    impl StreamBuilder {
        fn new() -> Self {
            let mut data = vec![0xFF; 8];
            data.extend_from_slice(&SYNC_WORD.to_be_bytes());
            Self { data }
        }

        fn word(mut self, word: u32) -> Self {
            self.data.extend_from_slice(&word.to_be_bytes());
            self
        }

        fn write(self, register: Register, payload: &[u32]) -> Self {
            let mut s = self.word(PacketHeader::write(register, payload.len()).encode());
            for &w in payload {
                s = s.word(w);
            }
            s
        }
    }

    #[test]
    fn test_missing_sync_is_error() {
        let chain = FrameChain::new();
        let result = BitstreamDecoder::new(&chain).decode(&[0u8; 64]);
        assert!(matches!(result, Err(CodecError::SyncNotFound { .. })));
    }

    #[test]
    fn test_fdri_bits_reported() {
        let chain = FrameChain::new();
        let mut frame = vec![0u32; WORDS_PER_FRAME];
        frame[2] = 1 << 5;
        let data = StreamBuilder::new()
            .write(Register::Far, &[0x10])
            .write(Register::Fdri, &frame)
            .data;
        let report = BitstreamDecoder::new(&chain).decode(&data).unwrap();

        let bits: Vec<String> = report.bits().map(|b| b.to_string()).collect();
        assert_eq!(bits, vec!["F0x00000010W002B05"]);
        assert!(report.frames.get(0x10).unwrap().get(69));
        // No ECC embedded, so the check fails
        assert_eq!(report.mismatches().count(), 1);
    }

    #[test]
    fn test_ecc_bits_not_reported_as_data() {
        let chain = FrameChain::new();
        let mut frame = vec![0u32; WORDS_PER_FRAME];
        frame[3] = 1 << 9;
        let ecc = bit_syndrome(3, 9);
        frame[45] = ecc as u32;
        frame[46] = (ecc >> 32) as u32;
        let data = StreamBuilder::new()
            .write(Register::Far, &[0])
            .write(Register::Fdri, &frame)
            .data;
        let report = BitstreamDecoder::new(&chain).decode(&data).unwrap();
        assert_eq!(report.bits().count(), 1);
        assert!(report.is_clean());
        assert!(report.diagnostics().any(|d| matches!(
            d,
            Diagnostic::EccCheck { observed, computed, .. } if *observed == ecc && *computed == ecc
        )));
    }

    #[test]
    fn test_fdri_advances_along_chain() {
        let chain = FrameChain::from_addresses([0x100, 0x180]);
        let mut words = vec![0u32; 2 * WORDS_PER_FRAME];
        words[0] = 1;
        words[WORDS_PER_FRAME] = 1 << 31;
        let data = StreamBuilder::new()
            .write(Register::Far, &[0x100])
            .write(Register::Fdri, &[])
            .word(PacketHeader::long(words.len()).encode());
        let data = words.iter().fold(data, |s, &w| s.word(w)).data;

        let report = BitstreamDecoder::new(&chain).decode(&data).unwrap();
        let bits: Vec<_> = report.bits().collect();
        assert_eq!(
            bits,
            vec![BitAddress::new(0x100, 0, 0), BitAddress::new(0x180, 0, 31)]
        );
    }

    #[test]
    fn test_long_packet_after_other_register() {
        let chain = FrameChain::new();
        let data = StreamBuilder::new()
            .write(Register::Far, &[0x10])
            .write(Register::Ctl0, &[])
            .word(PacketHeader::long(2).encode())
            .word(DUMMY_WORD)
            .word(1)
            .word(PacketHeader::nop().encode())
            .data;
        let report = BitstreamDecoder::new(&chain).decode(&data).unwrap();

        assert_eq!(report.bits().count(), 0);
        let diags: Vec<_> = report.diagnostics().skip(1).cloned().collect();
        assert_eq!(
            diags,
            vec![
                Diagnostic::RegisterWrite {
                    register: Register::Far,
                    word_count: 1,
                },
                Diagnostic::FrameAddress { address: 0x10 },
                Diagnostic::RegisterWrite {
                    register: Register::Ctl0,
                    word_count: 0,
                },
                Diagnostic::LongPacket {
                    register: Register::Ctl0,
                    word_count: 2,
                },
                Diagnostic::Data {
                    register: Register::Ctl0,
                    word: DUMMY_WORD,
                },
                Diagnostic::Data {
                    register: Register::Ctl0,
                    word: 1,
                },
                Diagnostic::Nop,
            ]
        );
    }

    #[test]
    fn test_read_carries_no_payload() {
        let chain = FrameChain::new();
        let read = PacketHeader::Type1 {
            opcode: Opcode::Read,
            register: Register::Crc,
            word_count: 2,
        };
        let data = StreamBuilder::new()
            .word(read.encode())
            .word(PacketHeader::nop().encode())
            .data;
        let report = BitstreamDecoder::new(&chain).decode(&data).unwrap();

        let diags: Vec<_> = report.diagnostics().skip(1).cloned().collect();
        assert_eq!(
            diags,
            vec![
                Diagnostic::RegisterRead {
                    register: Register::Crc,
                },
                Diagnostic::Nop,
            ]
        );
        assert!(report.is_clean());
    }

    #[test]
    fn test_crc_check_and_command_reset() {
        let chain = FrameChain::new();
        let crc = crate::checksum::crc_step(0x05, 0x101, 0);
        let data = StreamBuilder::new()
            .write(Register::Ctl0, &[0x101])
            .write(Register::Crc, &[crc])
            .write(Register::Ctl0, &[0x101])
            .write(Register::Cmd, &[Command::Rcrc.raw()])
            .write(Register::Crc, &[0xDEAD_BEEF])
            .data;
        let report = BitstreamDecoder::new(&chain).decode(&data).unwrap();
        let checks: Vec<_> = report
            .diagnostics()
            .filter(|d| matches!(d, Diagnostic::CrcCheck { .. }))
            .cloned()
            .collect();
        assert_eq!(
            checks,
            vec![
                Diagnostic::CrcCheck {
                    written: crc,
                    computed: crc
                },
                Diagnostic::CrcCheck {
                    written: 0xDEAD_BEEF,
                    computed: 0
                },
            ]
        );
        assert!(checks[1].to_string().ends_with(" *****"));
    }

    #[test]
    fn test_bad_far_length() {
        let chain = FrameChain::new();
        let data = StreamBuilder::new()
            .write(Register::Far, &[0x1, 0x2])
            .data;
        let report = BitstreamDecoder::new(&chain).decode(&data).unwrap();
        assert!(report
            .diagnostics()
            .any(|d| *d == Diagnostic::BadFarLength { word_count: 2 }));
        assert!(report
            .diagnostics()
            .any(|d| *d == Diagnostic::FrameAddress { address: 0x2 }));
    }

    #[test]
    fn test_unknown_register_echoed() {
        let chain = FrameChain::new();
        let data = StreamBuilder::new()
            .write(Register::Other(0x13), &[0x55])
            .data;
        let report = BitstreamDecoder::new(&chain).decode(&data).unwrap();
        let data_diag = report
            .diagnostics()
            .find(|d| matches!(d, Diagnostic::Data { .. }))
            .unwrap();
        assert_eq!(data_diag.to_string(), "reg0013 0x00000055");
    }

    #[test]
    fn test_desync_without_resync_ends_cleanly() {
        let chain = FrameChain::new();
        let data = StreamBuilder::new().word(DUMMY_WORD).word(0x2000_0000).data;
        let report = BitstreamDecoder::new(&chain).decode(&data).unwrap();
        let last = report.diagnostics().last().unwrap();
        assert!(matches!(last, Diagnostic::SyncLost { .. }));
    }

    #[test]
    fn test_trailing_partial_word_ignored() {
        let chain = FrameChain::new();
        let mut data = StreamBuilder::new().word(0x2000_0000).data;
        data.extend_from_slice(&[0x20, 0x00]);
        let report = BitstreamDecoder::new(&chain).decode(&data).unwrap();
        assert_eq!(report.diagnostics().filter(|d| **d == Diagnostic::Nop).count(), 1);
    }
}
