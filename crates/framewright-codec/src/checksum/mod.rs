//! Transport CRC and frame ECC
//!
//! Both checksums are pure functions. The running state (CRC accumulator,
//! per-frame syndrome) lives in the stream reader/writer and the decoder.

mod crc;
mod ecc;

pub use crc::{crc_step, CRC32C_POLYNOMIAL};
pub use ecc::{bit_syndrome, frame_syndrome, ECC_BITS, ECC_OFFSET_BASE};
