//! tmx - Map image to Tiled tilemap converter
//!
//! Splits hand-painted map images into fixed-size tiles, deduplicates them
//! into a packed tileset atlas, and encodes the map as a grid of tile IDs in
//! a Tiled-compatible `.tmx` document.

pub mod cli;
pub mod config;
pub mod convert;
pub mod diagnostic;
pub mod discovery;
pub mod document;
pub mod error;
pub mod image_io;
pub mod output;
pub mod pixels;
pub mod tilemap;
pub mod tileset;

pub use config::Config;
pub use convert::{convert_batch, BatchSummary, ConvertOptions, JobReport};
pub use diagnostic::{Diagnostic, Diagnostics, Severity};
pub use document::{decode_payload, encode_payload, DataEncoding, MapDocument};
pub use error::{Result, TmxError};
pub use image_io::{load_pixels, write_atlas};
pub use pixels::PixelBuffer;
pub use tilemap::{MissPolicy, TileGrid, TilemapBuilder};
pub use tileset::{AtlasLayout, BuildState, Tile, TileCatalog, TileId, TileKey, TilesetBuilder};
