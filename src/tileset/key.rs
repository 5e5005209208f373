//! Content keys for tile deduplication.

use std::sync::Arc;

/// Byte-exact fingerprint of one tile's decoded RGBA content.
///
/// Equality and hashing run over every byte of the cell, so two cells with
/// identical pixels share a key regardless of where they came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TileKey(Arc<[u8]>);

impl TileKey {
    pub fn new(pixels: Vec<u8>) -> Self {
        Self(pixels.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Shared handle to the key's pixel bytes.
    pub(crate) fn pixels(&self) -> Arc<[u8]> {
        Arc::clone(&self.0)
    }
}
