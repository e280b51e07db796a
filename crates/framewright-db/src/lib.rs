//! Tile and frame database for framewright
//!
//! This crate handles:
//! - Loading the frame address universe (`frames.txt`)
//! - Loading tile instances and their frame ranges (`tiles.txt`)
//! - Lazily loading per-tile-type feature bit tables (`<TYPE>.bits`)
//! - Turning `tile.feature` assignments and harness bit lists into frame bits

pub mod assign;
pub mod chipdb;
pub mod error;
pub mod lines;

pub use assign::{ingest_harness, load_chain, parse_address_list, read_address_list, set_tile_bit};
pub use chipdb::{BitRange, ChipDatabase, TileInstance, TileTypeBits};
pub use error::{DbError, Result};
