//! Frame ECC syndrome
//!
//! Each data bit contributes an 11-bit offset built from its word index and
//! nibble, extended with an odd-parity bit and then spread one bit per
//! nibble. The bit's position inside its nibble selects the lane. For word 3,
//! bit 9 the offset is `0b10100110010` (word + 163, then nibble 2), the
//! expanded value `0x10100110010` and the lane shift 1 gives `0x20200220020`.

use crate::frame::{is_ecc_bit, BITS_PER_WORD, WORDS_PER_FRAME};

/// Width of the syndrome stored in words 45/46
pub const ECC_BITS: usize = 48;

/// Base added to the word index (255 - 92)
pub const ECC_OFFSET_BASE: usize = 255 - (WORDS_PER_FRAME - 1);

const OFFSET_BITS: u32 = 11;
const PARITY_BIT: u32 = 1 << OFFSET_BITS;

/// Offset of (word, bit) with the odd-parity bit in position 11
pub(crate) fn parity_offset(word: usize, bit: usize) -> u32 {
    let mut offset = (((word + ECC_OFFSET_BASE) << 3) | (bit / 4)) as u32;
    offset ^= PARITY_BIT;
    for i in 0..OFFSET_BITS {
        if offset & (1 << i) != 0 {
            offset ^= PARITY_BIT;
        }
    }
    offset
}

/// Syndrome contribution of a single set bit.
pub fn bit_syndrome(word: usize, bit: usize) -> u64 {
    let offset = parity_offset(word, bit);
    let mut expanded = 0u64;
    for i in 0..=OFFSET_BITS {
        if offset & (1 << i) != 0 {
            expanded |= 1u64 << (4 * i);
        }
    }
    expanded << (bit % 4)
}

/// XOR of the contributions of every set data bit in `words`.
///
/// Bits in the reserved ECC region are ignored.
pub fn frame_syndrome(words: &[u32]) -> u64 {
    let mut ecc = 0u64;
    for (word, &value) in words.iter().enumerate().take(WORDS_PER_FRAME) {
        if value == 0 {
            continue;
        }
        for bit in 0..BITS_PER_WORD {
            if value & (1 << bit) != 0 && !is_ecc_bit(word, bit) {
                ecc ^= bit_syndrome(word, bit);
            }
        }
    }
    ecc
}
