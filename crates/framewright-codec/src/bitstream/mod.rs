//! Bitstream Generation and Parsing
//!
//! Builds configuration packet streams from a frame store and decodes them
//! back into frame bits.

mod decoder;
mod encoder;
mod profile;
mod reader;
mod writer;

pub use decoder::{BitstreamDecoder, DecodeEvent, DecodeReport, Diagnostic};
pub use encoder::FrameEncoder;
pub use profile::{BitstreamProfile, ConfigError};
pub use reader::ByteStreamReader;
pub use writer::ByteStreamWriter;

use crate::error::{CodecError, Result};
use crate::frame::{FrameChain, FrameStore};
use crate::packet::SYNC_WORD;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Bitstream metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitstreamMetadata {
    /// Frames carrying configuration data
    pub frame_count: usize,
    /// Zero frames inserted at row boundaries
    pub padding_frames: usize,
    /// Total size in bytes
    pub byte_length: usize,
}

/// Generated bitstream
#[derive(Debug, Clone)]
pub struct Bitstream {
    /// Raw bitstream data
    pub data: Vec<u8>,
    /// Target part name
    pub part: String,
    /// Metadata
    pub metadata: BitstreamMetadata,
}

impl Bitstream {
    /// Create a new empty bitstream
    pub fn new(part: String) -> Self {
        Self {
            data: Vec::new(),
            part,
            metadata: BitstreamMetadata::default(),
        }
    }

    /// Write bitstream to file
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        std::fs::write(path, &self.data)?;
        Ok(())
    }

    /// Write bitstream and a `.rpt` summary next to it
    pub fn write_with_report(&self, path: &Path) -> Result<()> {
        self.write_to_file(path)?;
        let report_path = path.with_extension("rpt");
        std::fs::write(&report_path, self.generate_report())?;
        Ok(())
    }

    /// Generate a plain-text summary
    pub fn generate_report(&self) -> String {
        let rule = "================================================================================\n";
        let mut report = String::new();
        report.push_str(rule);
        report.push_str("                     framewright Bitstream Report\n");
        report.push_str(rule);
        report.push('\n');
        report.push_str(&format!("Part: {}\n", self.part));
        report.push_str(&format!("Bitstream size: {} bytes\n\n", self.data.len()));
        report.push_str("Frames:\n");
        report.push_str(&format!("  Data frames: {}\n", self.metadata.frame_count));
        report.push_str(&format!(
            "  Row padding frames: {}\n",
            self.metadata.padding_frames
        ));
        report.push('\n');
        report.push_str(rule);
        report
    }

    /// Hex dump, 16 bytes per line with offsets
    pub fn to_hex_dump(&self) -> String {
        let mut output = String::new();
        output.push_str(&format!(".comment framewright bitstream for {}\n", self.part));
        output.push_str(".binary_dump\n");
        for (i, chunk) in self.data.chunks(16).enumerate() {
            output.push_str(&format!("{:08x}: ", i * 16));
            for byte in chunk {
                output.push_str(&format!("{:02x} ", byte));
            }
            output.push('\n');
        }
        output
    }

    /// Check that a sync word follows the header block
    pub fn verify(&self) -> Result<()> {
        let sync = SYNC_WORD.to_be_bytes();
        let position = self
            .data
            .windows(sync.len())
            .position(|w| w == sync)
            .ok_or_else(|| CodecError::InvalidBitstream("Missing sync word".to_string()))?;
        if position + sync.len() >= self.data.len() {
            return Err(CodecError::InvalidBitstream(
                "No packets after the sync word".to_string(),
            ));
        }
        Ok(())
    }
}

/// Bitstream generator
#[derive(Debug, Clone, Default)]
pub struct BitstreamGenerator {
    profile: BitstreamProfile,
}

impl BitstreamGenerator {
    /// Create a generator for the given profile
    pub fn new(profile: BitstreamProfile) -> Self {
        Self { profile }
    }

    /// Encode `frames`, padding each row as `chain` dictates
    pub fn generate(&self, frames: &FrameStore, chain: &FrameChain) -> Result<Bitstream> {
        let data = FrameEncoder::new(&self.profile).encode(frames, chain)?;

        let mut bitstream = Bitstream::new(self.profile.part.clone());
        bitstream.metadata = BitstreamMetadata {
            frame_count: frames.len(),
            padding_frames: frames
                .addresses()
                .filter(|&addr| chain.is_row_boundary(addr))
                .count(),
            byte_length: data.len(),
        };
        bitstream.data = data;
        info!(
            "Generated bitstream for {}: {} frames, {} bytes",
            bitstream.part, bitstream.metadata.frame_count, bitstream.metadata.byte_length
        );
        Ok(bitstream)
    }
}
