//! Configuration Frame Model
//!
//! Frames are 93 words of 32 bits. Bit `n` of a frame is bit `n % 32` of
//! word `n / 32`. Word 45 and the low half of word 46 carry the ECC syndrome.

use crate::checksum::{frame_syndrome, ECC_BITS};
use crate::error::{CodecError, Result};
use bitvec::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

/// Words per configuration frame
pub const WORDS_PER_FRAME: usize = 93;
/// Bits per frame word
pub const BITS_PER_WORD: usize = 32;
/// Bits per configuration frame
pub const FRAME_BITS: usize = WORDS_PER_FRAME * BITS_PER_WORD;
/// First word of the ECC syndrome
pub const ECC_WORD: usize = 45;
/// Address bits that must match for two frames to share a row
pub const ROW_MASK: u32 = 0xFFFC_0000;
/// Frame address written after the last frame; never part of the frame universe
pub const END_OF_CONFIG_FRAME: u32 = 0x07FC_0000;

type FrameBits = BitArr!(for FRAME_BITS, in u32, Lsb0);

/// Whether (word, bit) lies in the reserved ECC region
pub fn is_ecc_bit(word: usize, bit: usize) -> bool {
    word == ECC_WORD || (word == ECC_WORD + 1 && bit < 16)
}

/// A single configuration frame
#[derive(Clone)]
pub struct Frame {
    bits: FrameBits,
}

impl Frame {
    /// Create an all-zero frame
    pub fn new() -> Self {
        Self {
            bits: BitArray::new([0u32; WORDS_PER_FRAME]),
        }
    }

    /// Raw frame words in emission order
    pub fn words(&self) -> &[u32] {
        self.bits.as_raw_slice()
    }

    /// Get a bit by frame-relative index
    pub fn get(&self, index: usize) -> bool {
        self.bits.get(index).map(|bit| *bit).unwrap_or(false)
    }

    /// Set a bit by frame-relative index
    ///
    /// # Panics
    ///
    /// Panics if `index >= FRAME_BITS`.
    pub fn set(&mut self, index: usize, value: bool) {
        self.bits.set(index, value);
    }

    /// True if no bit is set
    pub fn is_empty(&self) -> bool {
        self.bits.not_any()
    }

    /// Set bits outside the ECC region, as (word, bit)
    pub fn data_bits(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.bits
            .iter_ones()
            .map(|index| (index / BITS_PER_WORD, index % BITS_PER_WORD))
            .filter(|&(word, bit)| !is_ecc_bit(word, bit))
    }

    /// The 48 bits currently stored in the ECC region
    pub fn ecc_field(&self) -> u64 {
        let words = self.words();
        u64::from(words[ECC_WORD]) | (u64::from(words[ECC_WORD + 1] & 0xFFFF) << 32)
    }

    /// Syndrome recomputed from the data bits
    pub fn syndrome(&self) -> u64 {
        frame_syndrome(self.words())
    }

    /// Clear the ECC region and store the recomputed syndrome in it
    pub fn embed_ecc(&mut self) -> u64 {
        let base = ECC_WORD * BITS_PER_WORD;
        self.bits[base..base + ECC_BITS].fill(false);
        let ecc = self.syndrome();
        for i in 0..ECC_BITS {
            if ecc & (1u64 << i) != 0 {
                self.bits.set(base + i, true);
            }
        }
        ecc
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Frame {
    fn eq(&self, other: &Self) -> bool {
        self.words() == other.words()
    }
}

impl Eq for Frame {}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("set_bits", &self.bits.count_ones())
            .field("ecc", &format_args!("0x{:012x}", self.ecc_field()))
            .finish()
    }
}

/// Location of one configuration bit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BitAddress {
    /// Frame address
    pub frame: u32,
    /// Word within the frame (0-92)
    pub word: usize,
    /// Bit within the word (0-31)
    pub bit: usize,
}

impl BitAddress {
    pub fn new(frame: u32, word: usize, bit: usize) -> Self {
        Self { frame, word, bit }
    }

    /// Frame-relative bit index
    pub fn frame_bit(&self) -> usize {
        self.word * BITS_PER_WORD + self.bit
    }
}

impl fmt::Display for BitAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "F0x{:08x}W{:03}B{:02}", self.frame, self.word, self.bit)
    }
}

impl FromStr for BitAddress {
    type Err = CodecError;

    /// Parse `F<hex frame>W<word>B<bit>`; the `0x` prefix is optional.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || CodecError::InvalidBitAddress(s.to_string());

        let rest = s.trim().strip_prefix('F').ok_or_else(invalid)?;
        let (frame, rest) = rest.split_once('W').ok_or_else(invalid)?;
        let (word, bit) = rest.split_once('B').ok_or_else(invalid)?;

        let frame = frame
            .strip_prefix("0x")
            .or_else(|| frame.strip_prefix("0X"))
            .unwrap_or(frame);
        let frame = u32::from_str_radix(frame, 16).map_err(|_| invalid())?;
        let word: usize = word.parse().map_err(|_| invalid())?;
        let bit: usize = bit.parse().map_err(|_| invalid())?;

        if word >= WORDS_PER_FRAME || bit >= BITS_PER_WORD {
            return Err(invalid());
        }
        Ok(Self { frame, word, bit })
    }
}

/// Frames keyed by address, iterated in address order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameStore {
    frames: BTreeMap<u32, Frame>,
}

impl FrameStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with an empty frame at each address
    pub fn with_addresses(addresses: impl IntoIterator<Item = u32>) -> Self {
        Self {
            frames: addresses
                .into_iter()
                .map(|addr| (addr, Frame::new()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn contains(&self, address: u32) -> bool {
        self.frames.contains_key(&address)
    }

    pub fn get(&self, address: u32) -> Option<&Frame> {
        self.frames.get(&address)
    }

    pub fn get_mut(&mut self, address: u32) -> Option<&mut Frame> {
        self.frames.get_mut(&address)
    }

    /// Frame at `address`, created empty if missing
    pub fn entry(&mut self, address: u32) -> &mut Frame {
        self.frames.entry(address).or_default()
    }

    /// Replace each listed frame (existing or not) with an empty one
    pub fn reset_frames(&mut self, addresses: impl IntoIterator<Item = u32>) {
        for address in addresses {
            self.frames.insert(address, Frame::new());
        }
    }

    pub fn addresses(&self) -> impl Iterator<Item = u32> + '_ {
        self.frames.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &Frame)> {
        self.frames.iter().map(|(&addr, frame)| (addr, frame))
    }

    /// First frame address in emission order
    pub fn first_address(&self) -> Option<u32> {
        self.frames.keys().next().copied()
    }

    /// Set a bit in an existing frame
    pub fn set_bit(&mut self, frame: u32, bit: usize) -> Result<()> {
        if bit >= FRAME_BITS {
            return Err(CodecError::BitOutOfRange { frame, bit });
        }
        let target = self
            .frames
            .get_mut(&frame)
            .ok_or(CodecError::UnknownFrame(frame))?;
        target.set(bit, true);
        Ok(())
    }

    /// Every set data bit, in address order
    pub fn data_bits(&self) -> impl Iterator<Item = BitAddress> + '_ {
        self.frames.iter().flat_map(|(&addr, frame)| {
            frame
                .data_bits()
                .map(move |(word, bit)| BitAddress::new(addr, word, bit))
        })
    }
}

/// Next-frame links in configuration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameChain {
    next: HashMap<u32, u32>,
}

impl FrameChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Link each address to the one after it
    pub fn from_addresses(addresses: impl IntoIterator<Item = u32>) -> Self {
        let mut chain = Self::new();
        let mut last: Option<u32> = None;
        for address in addresses {
            if let Some(prev) = last {
                chain.next.insert(prev, address);
            }
            last = Some(address);
        }
        chain
    }

    pub fn next(&self, address: u32) -> Option<u32> {
        self.next.get(&address).copied()
    }

    pub fn len(&self) -> usize {
        self.next.len()
    }

    pub fn is_empty(&self) -> bool {
        self.next.is_empty()
    }

    /// True if `address` ends a row: no successor, or the successor's
    /// row/column bits differ.
    pub fn is_row_boundary(&self, address: u32) -> bool {
        match self.next(address) {
            Some(next) => (next ^ address) & ROW_MASK != 0,
            None => true,
        }
    }
}
