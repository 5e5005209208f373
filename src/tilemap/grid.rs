//! Row-major grid of tile IDs.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Result, TmxError};

/// Tile IDs for every cell of a map image, row-major (y outer, x inner).
///
/// ID 0 marks a cell that could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileGrid {
    width: u32,
    height: u32,
    ids: Vec<u32>,
}

impl TileGrid {
    pub(crate) fn new(width: u32, height: u32, ids: Vec<u32>) -> Self {
        debug_assert_eq!(ids.len(), width as usize * height as usize);
        Self { width, height, ids }
    }

    /// Rebuild a grid from its 4-byte little-endian wire form.
    pub fn from_le_bytes(width: u32, height: u32, bytes: &[u8]) -> Result<Self> {
        let cells = width as usize * height as usize;
        if bytes.len() != cells * 4 {
            return Err(TmxError::InvalidBuffer {
                message: format!(
                    "{}x{} grid needs {} bytes, got {}",
                    width,
                    height,
                    cells * 4,
                    bytes.len()
                ),
            });
        }
        let mut ids = vec![0u32; cells];
        LittleEndian::read_u32_into(bytes, &mut ids);
        Ok(Self { width, height, ids })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn ids(&self) -> &[u32] {
        &self.ids
    }

    /// Tile ID at cell (x, y).
    pub fn get(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.ids
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// Iterate rows of IDs, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[u32]> {
        // chunks() rejects a zero size
        self.ids.chunks(self.width.max(1) as usize)
    }

    /// The raw index buffer: one 32-bit little-endian value per cell.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; self.ids.len() * 4];
        LittleEndian::write_u32_into(&self.ids, &mut bytes);
        bytes
    }

    /// Number of cells left unresolved (ID 0).
    pub fn unresolved(&self) -> usize {
        self.ids.iter().filter(|&&id| id == 0).count()
    }
}
