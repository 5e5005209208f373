//! The deduplicated tile catalog.
//!
//! Tiles are stored arena-style in first-seen order; the key lookup table is
//! kept separately and maps content to a 1-based tile ID.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::TileKey;

/// 1-based tile identifier. ID 0 is reserved for "no tile".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId(u32);

impl TileId {
    /// Reserved ID meaning "no tile" in map data.
    pub const EMPTY: u32 = 0;

    pub fn get(self) -> u32 {
        self.0
    }

    /// Zero-based position of the tile in the catalog (and atlas).
    pub fn index(self) -> usize {
        self.0 as usize - 1
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One deduplicated tile. Immutable once created.
#[derive(Debug, Clone)]
pub struct Tile {
    id: TileId,
    pixels: Arc<[u8]>,
}

impl Tile {
    pub fn id(&self) -> TileId {
        self.id
    }

    /// Row-major RGBA bytes, `tile_width * tile_height * 4` long.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

/// Ordered tiles plus the content-key to ID mapping.
///
/// IDs are assigned in strict first-seen order starting at 1, and the catalog
/// only ever grows.
#[derive(Debug, Default)]
pub struct TileCatalog {
    tiles: Vec<Tile>,
    ids: HashMap<TileKey, TileId>,
}

impl TileCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a key, inserting a new tile when it has not been seen.
    ///
    /// Returns the tile's ID and whether it was newly created.
    pub fn intern(&mut self, key: TileKey) -> (TileId, bool) {
        if let Some(&id) = self.ids.get(&key) {
            return (id, false);
        }

        let id = TileId(self.tiles.len() as u32 + 1);
        self.tiles.push(Tile {
            id,
            pixels: key.pixels(),
        });
        self.ids.insert(key, id);
        (id, true)
    }

    pub fn lookup(&self, key: &TileKey) -> Option<TileId> {
        self.ids.get(key).copied()
    }

    pub fn get(&self, id: TileId) -> Option<&Tile> {
        self.tiles.get(id.index())
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}
