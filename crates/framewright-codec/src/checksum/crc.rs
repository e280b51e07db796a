//! Configuration port CRC
//!
//! Every payload word written to a register extends the CRC with a 37-bit
//! value: the 5-bit register address concatenated above the 32-bit data.

/// Castagnoli CRC-32 polynomial, reflected form
pub const CRC32C_POLYNOMIAL: u32 = 0x82F6_3B78;

const ADDRESS_BITS: u32 = 5;
const DATA_BITS: u32 = 32;

/// Extend `prev` with one (register address, data word) pair.
///
/// Only the low 5 bits of `addr` take part in the CRC.
pub fn crc_step(addr: u32, data: u32, prev: u32) -> u32 {
    let poly = u64::from(CRC32C_POLYNOMIAL) << 1;
    let mut val = (u64::from(addr) << DATA_BITS) | u64::from(data);
    let mut crc = u64::from(prev);

    for _ in 0..ADDRESS_BITS + DATA_BITS {
        if (val & 1) != (crc & 1) {
            crc ^= poly;
        }
        val >>= 1;
        crc >>= 1;
    }

    crc as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_input_keeps_zero() {
        assert_eq!(crc_step(0, 0, 0), 0);
    }

    #[test]
    fn test_address_changes_crc() {
        assert_ne!(crc_step(1, 0, 0), 0);
        assert_ne!(crc_step(0x02, 0xDEAD_BEEF, 0), crc_step(0x04, 0xDEAD_BEEF, 0));
    }

    #[test]
    fn test_address_truncated_to_five_bits() {
        // FDRI (0x02) with garbage above bit 4 hashes like plain FDRI
        assert_eq!(
            crc_step(0x3FE2, 0x1234_5678, 0xCAFE_F00D),
            crc_step(0x02, 0x1234_5678, 0xCAFE_F00D)
        );
    }

    #[test]
    fn test_linear_in_data() {
        let a = 0x0F0F_1234;
        let b = 0x8000_0001;
        assert_eq!(crc_step(0, a ^ b, 0), crc_step(0, a, 0) ^ crc_step(0, b, 0));
    }

    #[test]
    fn test_prev_contributes_linearly() {
        let prev = 0x1357_9BDF;
        assert_eq!(
            crc_step(0x04, 0x0000_0007, prev),
            crc_step(0x04, 0x0000_0007, 0) ^ crc_step(0, 0, prev)
        );
    }

    #[test]
    fn test_chunking_independent() {
        let pairs: Vec<(u32, u32)> = (0..64u32)
            .map(|i| (i % 3, i.wrapping_mul(0x9E37_79B9)))
            .collect();

        let whole = pairs
            .iter()
            .fold(0, |crc, &(addr, data)| crc_step(addr, data, crc));

        let (head, tail) = pairs.split_at(23);
        let mid = head
            .iter()
            .fold(0, |crc, &(addr, data)| crc_step(addr, data, crc));
        let chunked = tail
            .iter()
            .fold(mid, |crc, &(addr, data)| crc_step(addr, data, crc));

        assert_eq!(whole, chunked);
    }

    #[test]
    fn test_order_sensitive() {
        let ab = crc_step(0x02, 2, crc_step(0x02, 1, 0));
        let ba = crc_step(0x02, 1, crc_step(0x02, 2, 0));
        assert_ne!(ab, ba);
    }
}
