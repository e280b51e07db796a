//! Chip Database
//!
//! A database directory holds:
//! - `frames.txt`: every valid frame address, hexadecimal, one per line
//! - `tiles.txt`: `.tile NAME TYPE X Y` headers, each followed by
//!   `frame ADDR <kw> BIT_OFFSET <kw> SIZE` lines giving the tile's bit ranges
//! - `<TYPE>.bits`: `FEATURE bit bit ...` lines, bits relative to the tile
//!
//! Tile type tables are only read the first time a feature of that type is
//! needed.

use crate::error::{DbError, Result};
use crate::lines::{content_lines, parse_hex_prefix, read_file};
use framewright_codec::frame::{END_OF_CONFIG_FRAME, FRAME_BITS};
use framewright_codec::{FrameChain, FrameStore};
use indexmap::IndexMap;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A contiguous run of tile bits inside one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitRange {
    /// Frame address
    pub frame: u32,
    /// First frame bit of the run
    pub bit_offset: usize,
    /// Number of bits
    pub size: usize,
}

/// A placed tile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileInstance {
    pub name: String,
    pub tile_type: String,
    pub x: i32,
    pub y: i32,
    /// Ranges in tile bit order; tile bit 0 is the first bit of the first range
    pub ranges: Vec<BitRange>,
}

impl TileInstance {
    /// Map a tile-relative bit to (frame address, frame bit)
    pub fn locate(&self, bit: usize) -> Option<(u32, usize)> {
        let mut base: usize = 0;
        for range in &self.ranges {
            let end = base.checked_add(range.size)?;
            if bit < end {
                return Some((range.frame, range.bit_offset.checked_add(bit - base)?));
            }
            base = end;
        }
        None
    }

    /// Total number of tile bits
    pub fn bit_count(&self) -> usize {
        self.ranges.iter().map(|r| r.size).sum()
    }
}

/// Feature bit table of one tile type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TileTypeBits {
    features: IndexMap<String, Vec<usize>>,
}

impl TileTypeBits {
    /// Parse `.bits` text; repeated feature lines accumulate
    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        let mut features: IndexMap<String, Vec<usize>> = IndexMap::new();
        for (line_no, line) in content_lines(text) {
            let mut fields = line.split_whitespace();
            let Some(name) = fields.next() else {
                continue;
            };
            let bits = features.entry(name.to_string()).or_default();
            for field in fields {
                let bit = field.parse().map_err(|_| DbError::Parse {
                    path: path.to_path_buf(),
                    line: line_no,
                    message: format!("invalid bit '{}' for feature {}", field, name),
                })?;
                bits.push(bit);
            }
        }
        Ok(Self { features })
    }

    pub fn feature(&self, name: &str) -> Option<&[usize]> {
        self.features.get(name).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Frames and tiles of one device
#[derive(Debug, Clone)]
pub struct ChipDatabase {
    root: PathBuf,
    frames: BTreeSet<u32>,
    tiles: IndexMap<String, TileInstance>,
    tile_types: HashMap<String, TileTypeBits>,
}

impl ChipDatabase {
    /// Load `frames.txt` and `tiles.txt` from a database directory
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        let frames_path = root.join("frames.txt");
        let frames = parse_frames(&read_file(&frames_path)?, &frames_path)?;

        let tiles_path = root.join("tiles.txt");
        let tiles = parse_tiles(&read_file(&tiles_path)?, &tiles_path)?;

        info!(
            "Loaded database {}: {} frames, {} tiles",
            root.display(),
            frames.len(),
            tiles.len()
        );
        Ok(Self {
            root,
            frames,
            tiles,
            tile_types: HashMap::new(),
        })
    }

    /// Every address listed in `frames.txt`, sorted
    pub fn frames(&self) -> &BTreeSet<u32> {
        &self.frames
    }

    pub fn tile(&self, name: &str) -> Option<&TileInstance> {
        self.tiles.get(name)
    }

    pub fn tiles(&self) -> impl Iterator<Item = &TileInstance> {
        self.tiles.values()
    }

    /// Empty frames for the whole universe, chained in address order.
    ///
    /// The end-of-configuration address is never part of either.
    pub fn base_frames(&self) -> (FrameStore, FrameChain) {
        let addresses = || {
            self.frames
                .iter()
                .copied()
                .filter(|&addr| addr != END_OF_CONFIG_FRAME)
        };
        (
            FrameStore::with_addresses(addresses()),
            FrameChain::from_addresses(addresses()),
        )
    }

    /// Feature table for a tile type, loading `<TYPE>.bits` on first use
    pub fn tile_type_bits(&mut self, tile_type: &str) -> Result<&TileTypeBits> {
        if !self.tile_types.contains_key(tile_type) {
            let path = self.root.join(format!("{}.bits", tile_type));
            let bits = TileTypeBits::parse(&read_file(&path)?, &path)?;
            debug!("Loaded {} features for tile type {}", bits.len(), tile_type);
            self.tile_types.insert(tile_type.to_string(), bits);
        }
        Ok(&self.tile_types[tile_type])
    }

    /// Tile instance and the bits of one of its features
    pub fn feature_bits(&mut self, tile: &str, feature: &str) -> Result<(&TileInstance, &[usize])> {
        let tile_type = self
            .tiles
            .get(tile)
            .ok_or_else(|| DbError::UnknownTile(tile.to_string()))?
            .tile_type
            .clone();
        self.tile_type_bits(&tile_type)?;

        let instance = self
            .tiles
            .get(tile)
            .ok_or_else(|| DbError::UnknownTile(tile.to_string()))?;
        let bits = self
            .tile_types
            .get(&tile_type)
            .and_then(|table| table.feature(feature))
            .ok_or_else(|| DbError::UnknownFeature {
                tile: tile.to_string(),
                feature: feature.to_string(),
            })?;
        Ok((instance, bits))
    }
}

/// Parse `frames.txt` text into the sorted address universe
pub fn parse_frames(text: &str, path: &Path) -> Result<BTreeSet<u32>> {
    content_lines(text)
        .map(|(line_no, line)| {
            parse_hex_prefix(line).ok_or_else(|| DbError::Parse {
                path: path.to_path_buf(),
                line: line_no,
                message: format!("invalid frame address '{}'", line),
            })
        })
        .collect()
}

/// Parse `tiles.txt` text, keeping tiles in file order
pub fn parse_tiles(text: &str, path: &Path) -> Result<IndexMap<String, TileInstance>> {
    let mut tiles: IndexMap<String, TileInstance> = IndexMap::new();
    let mut current: Option<String> = None;

    for (line_no, line) in content_lines(text) {
        let parse_error = |message: String| DbError::Parse {
            path: path.to_path_buf(),
            line: line_no,
            message,
        };
        let fields: Vec<&str> = line.split_whitespace().collect();

        match fields[0] {
            ".tile" => {
                if fields.len() < 5 {
                    return Err(parse_error(format!("incomplete tile header '{}'", line)));
                }
                let coord = |s: &str| {
                    s.parse::<i32>()
                        .map_err(|_| parse_error(format!("invalid coordinate '{}'", s)))
                };
                let tile = TileInstance {
                    name: fields[1].to_string(),
                    tile_type: fields[2].to_string(),
                    x: coord(fields[3])?,
                    y: coord(fields[4])?,
                    ranges: Vec::new(),
                };
                current = Some(tile.name.clone());
                tiles.insert(tile.name.clone(), tile);
            }
            "frame" => {
                if fields.len() < 6 {
                    return Err(parse_error(format!("incomplete frame range '{}'", line)));
                }
                let frame = parse_hex_prefix(fields[1])
                    .ok_or_else(|| parse_error(format!("invalid frame address '{}'", fields[1])))?;
                let number = |s: &str| {
                    s.parse::<usize>()
                        .map_err(|_| parse_error(format!("invalid number '{}'", s)))
                };
                let range = BitRange {
                    frame,
                    bit_offset: number(fields[3])?,
                    size: number(fields[5])?,
                };
                if range
                    .bit_offset
                    .checked_add(range.size)
                    .map_or(true, |end| end > FRAME_BITS)
                {
                    return Err(parse_error(format!(
                        "range {}+{} exceeds the {} bits of a frame",
                        range.bit_offset, range.size, FRAME_BITS
                    )));
                }
                let tile = current
                    .as_ref()
                    .and_then(|name| tiles.get_mut(name))
                    .ok_or_else(|| parse_error("frame range outside a tile".to_string()))?;
                tile.ranges.push(range);
            }
            _ => {}
        }
    }
    Ok(tiles)
}
