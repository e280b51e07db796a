//! Bit assignment
//!
//! Sets frame bits from feature assignments (`tile.feature` lines) and from
//! harness bit lists (`F<frame>W<word>B<bit>` lines), and reads the frame
//! address lists used for regions of interest and chaining.

use crate::chipdb::{ChipDatabase, TileInstance};
use crate::error::{DbError, Result};
use crate::lines::{content_lines, parse_hex_prefix, read_file};
use framewright_codec::frame::{is_ecc_bit, BITS_PER_WORD, END_OF_CONFIG_FRAME};
use framewright_codec::{BitAddress, FrameChain, FrameStore};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, warn};

/// Set one tile-relative bit in the frame store
pub fn set_tile_bit(store: &mut FrameStore, tile: &TileInstance, bit: usize) -> Result<()> {
    let (frame, frame_bit) = tile.locate(bit).ok_or_else(|| DbError::BadTileBit {
        tile: tile.name.clone(),
        bit,
    })?;
    let (word, word_bit) = (frame_bit / BITS_PER_WORD, frame_bit % BITS_PER_WORD);
    if is_ecc_bit(word, word_bit) {
        warn!(
            "{}.{} maps to ECC bit W{:03}B{:02} of frame 0x{:08x}",
            tile.name, bit, word, word_bit, frame
        );
    }
    store.set_bit(frame, frame_bit)?;
    Ok(())
}

impl ChipDatabase {
    /// Set every bit of `feature` in `tile`
    pub fn set_feature(&mut self, store: &mut FrameStore, tile: &str, feature: &str) -> Result<()> {
        let (instance, bits) = self.feature_bits(tile, feature)?;
        for &bit in bits {
            set_tile_bit(store, instance, bit)?;
        }
        Ok(())
    }

    /// Apply `tile.feature` lines; returns the number of features set.
    ///
    /// Lines without a `.` are ignored. Only the first `.` separates the tile
    /// from the feature, so feature names may contain dots.
    pub fn apply_features(&mut self, store: &mut FrameStore, text: &str) -> Result<usize> {
        let mut count = 0;
        for (_, line) in content_lines(text) {
            let Some((tile, feature)) = line.split_once('.') else {
                continue;
            };
            self.set_feature(store, tile, feature)?;
            count += 1;
        }
        debug!("Applied {} features", count);
        Ok(count)
    }
}

/// Set harness bits, skipping frames in `roi`; returns the number of bits set
pub fn ingest_harness(store: &mut FrameStore, text: &str, roi: &BTreeSet<u32>) -> Result<usize> {
    let mut count = 0;
    for (line_no, line) in content_lines(text) {
        let addr: BitAddress = line.parse().map_err(|_| DbError::MalformedLine {
            line: line_no,
            text: line.to_string(),
        })?;
        if roi.contains(&addr.frame) {
            continue;
        }
        store.set_bit(addr.frame, addr.frame_bit())?;
        count += 1;
    }
    debug!("Ingested {} harness bits", count);
    Ok(count)
}

/// Parse a frame address list; lines without a leading hex number are skipped
pub fn parse_address_list(text: &str) -> BTreeSet<u32> {
    content_lines(text)
        .filter_map(|(_, line)| parse_hex_prefix(line))
        .collect()
}

/// Read a frame address list from a file
pub fn read_address_list(path: &Path) -> Result<BTreeSet<u32>> {
    Ok(parse_address_list(&read_file(path)?))
}

/// Chain the addresses listed in `path` in address order
pub fn load_chain(path: &Path) -> Result<FrameChain> {
    let addresses = read_address_list(path)?;
    Ok(FrameChain::from_addresses(
        addresses
            .into_iter()
            .filter(|&addr| addr != END_OF_CONFIG_FRAME),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chipdb::BitRange;
    use framewright_codec::CodecError;

    fn tile() -> TileInstance {
        TileInstance {
            name: "CLEM_X0Y0".to_string(),
            tile_type: "CLEM".to_string(),
            x: 0,
            y: 0,
            ranges: vec![
                BitRange {
                    frame: 0x100,
                    bit_offset: 64,
                    size: 32,
                },
                BitRange {
                    frame: 0x101,
                    bit_offset: 0,
                    size: 16,
                },
            ],
        }
    }

    #[test]
    fn test_set_tile_bit() {
        let mut store = FrameStore::with_addresses([0x100, 0x101]);
        set_tile_bit(&mut store, &tile(), 3).unwrap();
        set_tile_bit(&mut store, &tile(), 33).unwrap();
        assert!(store.get(0x100).unwrap().get(67));
        assert!(store.get(0x101).unwrap().get(1));
    }

    #[test]
    fn test_set_tile_bit_out_of_range() {
        let mut store = FrameStore::with_addresses([0x100, 0x101]);
        let err = set_tile_bit(&mut store, &tile(), 48).unwrap_err();
        assert!(matches!(err, DbError::BadTileBit { bit: 48, .. }));
        assert_eq!(err.to_string(), "Bad bit CLEM_X0Y0.48");
    }

    #[test]
    fn test_set_tile_bit_unknown_frame() {
        let mut store = FrameStore::with_addresses([0x100]);
        let err = set_tile_bit(&mut store, &tile(), 40).unwrap_err();
        assert!(matches!(err, DbError::Codec(CodecError::UnknownFrame(0x101))));
    }

    #[test]
    fn test_ingest_harness() {
        let mut store = FrameStore::with_addresses([0x10, 0x20]);
        let roi: BTreeSet<u32> = [0x20].into_iter().collect();
        let text = "F0x00000010W002B05\nF0x00000020W000B00\n# skipped\nF00000010W092B31\n";
        let count = ingest_harness(&mut store, text, &roi).unwrap();
        assert_eq!(count, 2);
        assert!(store.get(0x10).unwrap().get(69));
        assert!(store.get(0x10).unwrap().get(92 * 32 + 31));
        assert!(store.get(0x20).unwrap().is_empty());
    }

    #[test]
    fn test_ingest_harness_errors() {
        let mut store = FrameStore::with_addresses([0x10]);
        let roi = BTreeSet::new();
        let err = ingest_harness(&mut store, "F0x10W001\n", &roi).unwrap_err();
        assert!(matches!(err, DbError::MalformedLine { line: 1, .. }));

        let err = ingest_harness(&mut store, "F0x99W001B01\n", &roi).unwrap_err();
        assert!(matches!(err, DbError::Codec(CodecError::UnknownFrame(0x99))));
    }

    #[test]
    fn test_parse_address_list() {
        let list = parse_address_list("0x00020500\n00020400 # row\nxyz\n\n0x00020500\n");
        assert_eq!(list.into_iter().collect::<Vec<_>>(), vec![0x20400, 0x20500]);
    }

    #[test]
    fn test_load_chain_skips_end_of_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"0x0\n0x1\n0x07FC0000\n0x08000000\n").unwrap();
        let chain = load_chain(file.path()).unwrap();
        assert_eq!(chain.next(0x0), Some(0x1));
        assert_eq!(chain.next(0x1), Some(0x0800_0000));
        assert_eq!(chain.next(END_OF_CONFIG_FRAME), None);
    }
}
