//! Tilemap builder.
//!
//! Re-scans a map image cell by cell and resolves every cell against a
//! ready tileset, producing the row-major grid of tile IDs.

mod grid;

pub use grid::TileGrid;

use crate::diagnostic::{Diagnostic, Diagnostics, TILE_NOT_FOUND};
use crate::error::{Result, TmxError};
use crate::pixels::PixelBuffer;
use crate::tileset::{self, BuildState, TilesetBuilder};

/// What to do with a map cell whose content is not in the tileset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissPolicy {
    /// Report a warning per cell and leave the cell as ID 0.
    #[default]
    Lenient,
    /// Fail the whole resolve.
    Strict,
}

/// Resolves a map image into a `TileGrid` against a tileset.
pub struct TilemapBuilder<'a> {
    tileset: &'a TilesetBuilder,
    image: &'a PixelBuffer,
    policy: MissPolicy,
    precomputed: Option<TileGrid>,
    grid: Option<TileGrid>,
    diagnostics: Diagnostics,
}

impl<'a> TilemapBuilder<'a> {
    pub fn new(tileset: &'a TilesetBuilder, image: &'a PixelBuffer) -> Self {
        Self {
            tileset,
            image,
            policy: MissPolicy::default(),
            precomputed: None,
            grid: None,
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn with_policy(mut self, policy: MissPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Reuse the grid the tileset recorded while appending this same image.
    ///
    /// Ignored if its dimensions do not match the image's grid.
    pub fn with_precomputed(mut self, grid: TileGrid) -> Self {
        self.precomputed = Some(grid);
        self
    }

    /// Columns of whole tiles in the image.
    pub fn grid_width(&self) -> u32 {
        self.dims().0
    }

    /// Rows of whole tiles in the image.
    pub fn grid_height(&self) -> u32 {
        self.dims().1
    }

    pub fn state(&self) -> BuildState {
        if self.grid.is_some() {
            BuildState::Ready
        } else {
            BuildState::Pending
        }
    }

    /// Resolve every cell to a tile ID.
    ///
    /// Misses are reported per cell as `tmx::tile-not-found` warnings under
    /// `MissPolicy::Lenient`, and fail with `TmxError::TileNotFound` (first
    /// missing cell plus total count) under `MissPolicy::Strict`.
    pub fn resolve(&mut self) -> Result<&TileGrid> {
        if !self.tileset.is_ready() {
            return Err(TmxError::NotReady {
                message: "tileset has no appended images to resolve against".to_string(),
            });
        }

        let (grid_w, grid_h) = self.dims();

        if let Some(pre) = self.precomputed.take() {
            if pre.width() == grid_w && pre.height() == grid_h {
                return Ok(&*self.grid.insert(pre));
            }
        }

        let catalog = self.tileset.catalog();
        let mut ids = Vec::with_capacity(grid_w as usize * grid_h as usize);
        let mut misses = Diagnostics::new();
        let mut first_miss = None;

        let (tile_w, tile_h) = (self.tileset.tile_width(), self.tileset.tile_height());
        for (x, y, key) in tileset::cells(self.image, tile_w, tile_h) {
            match catalog.lookup(&key) {
                Some(id) => ids.push(id.get()),
                None => {
                    first_miss.get_or_insert((x, y));
                    misses.push(
                        Diagnostic::warning(
                            TILE_NOT_FOUND,
                            format!("Tile at cell ({}, {}) not found in tileset", x, y),
                        )
                        .at_cell(x, y),
                    );
                    ids.push(0);
                }
            }
        }

        if let (MissPolicy::Strict, Some((x, y))) = (self.policy, first_miss) {
            return Err(TmxError::TileNotFound {
                x,
                y,
                count: misses.len(),
            });
        }

        self.diagnostics.merge(misses);
        Ok(&*self.grid.insert(TileGrid::new(grid_w, grid_h, ids)))
    }

    /// The resolved grid, once `resolve` has succeeded.
    pub fn grid(&self) -> Option<&TileGrid> {
        self.grid.as_ref()
    }

    pub fn into_grid(self) -> Option<TileGrid> {
        self.grid
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Diagnostics {
        std::mem::take(&mut self.diagnostics)
    }

    fn dims(&self) -> (u32, u32) {
        tileset::grid_size(self.image, self.tileset.tile_width(), self.tileset.tile_height())
    }
}
