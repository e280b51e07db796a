//! Packet Encoder
//!
//! Serializes a frame store into the configuration packet stream: a fixed
//! header block, the command preamble, one FDRI/FAR/CRC group per frame with
//! a zero padding frame at every row boundary, and the startup epilogue.

use super::profile::BitstreamProfile;
use super::writer::ByteStreamWriter;
use crate::error::{CodecError, Result};
use crate::frame::{FrameChain, FrameStore, END_OF_CONFIG_FRAME, WORDS_PER_FRAME};
use crate::packet::SYNC_WORD;
use crate::registers::{Command, Opcode, Register};
use tracing::{debug, info};

/// Leading bytes of every bitstream file
const MAGIC: [u8; 13] = [
    0x00, 0x09, 0x0F, 0xF0, 0x0F, 0xF0, 0x0F, 0xF0, 0x0F, 0xF0, 0x00, 0x00, 0x01,
];

/// Bus width auto-detection pattern
const BUS_WIDTH_DETECT: [u8; 8] = [0x00, 0x00, 0x00, 0xBB, 0x11, 0x22, 0x00, 0x44];

/// Register 0x13 is written during the preamble but has no public name
const UNNAMED_PREAMBLE_REGISTER: Register = Register::Other(0x13);

const CTL0_VALUE: u32 = 0x0000_0101;
const CTL1_MASK: u32 = 0x0020_0000;

/// Bytes per emitted frame group, used to size the output buffer
const FRAME_GROUP_BYTES: usize = (WORDS_PER_FRAME + 1) * 4 + 16;

const ZERO_FRAME: [u32; WORDS_PER_FRAME] = [0; WORDS_PER_FRAME];

/// Frame store to packet stream encoder
pub struct FrameEncoder<'a> {
    profile: &'a BitstreamProfile,
}

impl<'a> FrameEncoder<'a> {
    pub fn new(profile: &'a BitstreamProfile) -> Self {
        Self { profile }
    }

    /// Encode every frame of `frames` in address order
    pub fn encode(&self, frames: &FrameStore, chain: &FrameChain) -> Result<Vec<u8>> {
        let first = frames.first_address().ok_or(CodecError::EmptyFrameStore)?;
        info!("Encoding {} frames starting at 0x{:08x}", frames.len(), first);

        let mut w = ByteStreamWriter::with_capacity(frames.len() * 2 * FRAME_GROUP_BYTES + 4096);
        self.write_header(&mut w)?;
        self.write_preamble(&mut w, first);

        let mut rows = 0usize;
        for (address, frame) in frames.iter() {
            let mut frame = frame.clone();
            frame.embed_ecc();
            write_frame_group(&mut w, address, frame.words())?;

            if chain.is_row_boundary(address) {
                rows += 1;
                write_frame_group(&mut w, address, &ZERO_FRAME)?;
                if let Some(next) = chain.next(address) {
                    debug!("Row boundary 0x{:08x} -> 0x{:08x}", address, next);
                    w.write_command(Command::Wcfg);
                    w.write_nop();
                    w.write_register(Register::Far, next);
                }
            }
        }

        self.write_epilogue(&mut w);
        info!(
            "Encoded {} rows, {} CRC checks, {} bytes",
            rows,
            w.crc_flushes(),
            w.len()
        );
        Ok(w.into_vec())
    }

    fn write_header(&self, w: &mut ByteStreamWriter) -> Result<()> {
        let profile = self.profile;
        w.write_bytes(&MAGIC);
        w.write_field(b'a', &profile.design)?;
        w.write_field(b'b', &profile.part)?;
        w.write_field(b'c', &profile.date)?;
        w.write_field(b'd', &profile.time)?;
        w.write_byte(b'e');
        w.write_word(profile.declared_length);
        w.write_fill(0xFF, 64);
        w.write_bytes(&BUS_WIDTH_DETECT);
        w.write_fill(0xFF, 8);
        w.write_word(SYNC_WORD);
        Ok(())
    }

    fn write_preamble(&self, w: &mut ByteStreamWriter, first_frame: u32) {
        let profile = self.profile;
        w.write_nops(2);
        w.write_register(Register::Timer, 0);
        w.write_register(Register::Wbstar, 0);
        w.write_command(Command::Null);
        w.write_nop();
        w.write_command(Command::Rcrc);
        w.reset_crc();
        w.write_nops(2);
        w.write_register(Register::Far, 0);
        w.write_register(UNNAMED_PREAMBLE_REGISTER, 0);
        w.write_register(Register::Cor0, profile.cor0);
        w.write_register(Register::Cor1, profile.cor1);
        w.write_register(Register::Idcode, profile.idcode);
        w.write_command(Command::Switch);
        w.write_nop();
        w.write_register(Register::Mask, 0x0000_0001);
        w.write_register(Register::Ctl0, CTL0_VALUE);
        w.write_register(Register::Mask, CTL1_MASK);
        w.write_register(Register::Ctl1, CTL1_MASK);
        w.write_nops(8);
        w.write_command(Command::Wcfg);
        w.write_nop();
        w.write_register(Register::Far, first_frame);
    }

    fn write_epilogue(&self, w: &mut ByteStreamWriter) {
        w.write_command(Command::Null);
        w.write_nops(2);
        w.write_register(Register::Mask, CTL1_MASK);
        w.write_register(Register::Ctl1, 0);
        w.flush_crc();
        w.write_nops(2);
        w.write_command(Command::Grestore);
        w.write_nops(2);
        w.write_command(Command::Dghigh);
        w.write_nops(20);
        w.write_command(Command::Start);
        w.write_nop();
        w.write_register(Register::Far, END_OF_CONFIG_FRAME);
        w.write_register(Register::Mask, CTL0_VALUE);
        w.write_register(Register::Ctl0, CTL0_VALUE);
        w.flush_crc();
        w.write_nops(2);
        w.write_command(Command::Desync);
        w.write_nops(self.profile.trailing_nops);
    }
}

/// FDRI payload, FAR confirmation and CRC check for one frame
fn write_frame_group(w: &mut ByteStreamWriter, address: u32, words: &[u32]) -> Result<()> {
    w.write_short(Opcode::Write, Register::Fdri, words)?;
    w.write_register(Register::Far, address);
    w.flush_crc();
    Ok(())
}
