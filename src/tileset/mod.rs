//! Tileset builder.
//!
//! Splits source images into fixed-size cells, deduplicates cells by their
//! pixel content and packs the unique tiles into a square atlas.
//!
//! A builder can be fed several images in turn to accumulate one shared
//! catalog. Appending only ever adds tiles, so IDs handed out earlier stay
//! valid for every later tilemap.

mod atlas;
mod catalog;
mod key;

pub use atlas::AtlasLayout;
pub use catalog::{Tile, TileCatalog, TileId};
pub use key::TileKey;

use crate::diagnostic::{Diagnostic, Diagnostics, DIMENSION_MISMATCH};
use crate::error::{Result, TmxError};
use crate::pixels::PixelBuffer;
use crate::tilemap::TileGrid;

/// Tile size used when none (or zero) is given.
pub const DEFAULT_TILE_SIZE: u32 = 16;

/// Readiness of a builder's outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    /// No input has been processed yet.
    Pending,
    /// Outputs reflect every input processed so far.
    Ready,
}

/// Builds a deduplicated tile catalog and renders it as an atlas.
#[derive(Debug)]
pub struct TilesetBuilder {
    tile_width: u32,
    tile_height: u32,
    power_of_two: bool,
    catalog: TileCatalog,
    layout: AtlasLayout,
    state: BuildState,
    appends: usize,
    scanned: Option<TileGrid>,
    diagnostics: Diagnostics,
}

impl Default for TilesetBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_TILE_SIZE, DEFAULT_TILE_SIZE)
    }
}

impl TilesetBuilder {
    /// Create a builder for `tile_width` x `tile_height` tiles with
    /// power-of-two atlas packing. A zero dimension falls back to 16.
    pub fn new(tile_width: u32, tile_height: u32) -> Self {
        let tile_width = non_zero_or_default(tile_width);
        let tile_height = non_zero_or_default(tile_height);
        Self {
            tile_width,
            tile_height,
            power_of_two: true,
            catalog: TileCatalog::new(),
            layout: AtlasLayout::for_count(0, tile_width, tile_height, true),
            state: BuildState::Pending,
            appends: 0,
            scanned: None,
            diagnostics: Diagnostics::new(),
        }
    }

    /// Enable or disable rounding the atlas side up to a power of two.
    pub fn with_power_of_two(mut self, power_of_two: bool) -> Self {
        self.power_of_two = power_of_two;
        self.relayout();
        self
    }

    /// Split `image` into cells and add every unseen cell to the catalog.
    ///
    /// Trailing partial cells are ignored and reported as a
    /// `tmx::dimension-mismatch` warning. The grid of IDs seen during the scan
    /// is kept and can be reused by a tilemap for the same image.
    pub fn append(&mut self, image: &PixelBuffer) -> &mut Self {
        if let Some(d) = dimension_mismatch(image, self.tile_width, self.tile_height) {
            self.diagnostics.push(d);
        }

        let (grid_w, grid_h) = grid_size(image, self.tile_width, self.tile_height);
        let mut ids = Vec::with_capacity(grid_w as usize * grid_h as usize);

        for (_, _, key) in cells(image, self.tile_width, self.tile_height) {
            let (id, _) = self.catalog.intern(key);
            ids.push(id.get());
        }

        self.scanned = Some(TileGrid::new(grid_w, grid_h, ids));
        self.relayout();
        self.appends += 1;
        self.state = BuildState::Ready;
        self
    }

    /// Render every catalog tile into a fresh atlas buffer.
    ///
    /// Tile `id` is drawn at row-major slot `id - 1`; unused slots stay
    /// transparent. Calling this again after further appends yields the
    /// grown atlas.
    pub fn render_atlas(&self) -> Result<PixelBuffer> {
        if self.state != BuildState::Ready {
            return Err(TmxError::NotReady {
                message: "cannot render an atlas before any image was appended".to_string(),
            });
        }

        let mut atlas = PixelBuffer::blank(self.layout.width(), self.layout.height());
        for tile in self.catalog.tiles() {
            if let Some((x, y)) = self.layout.position(tile.id().index()) {
                atlas.blit(tile.pixels(), self.tile_width, self.tile_height, x, y);
            }
        }
        Ok(atlas)
    }

    /// Take the ID grid recorded by the most recent `append`.
    pub fn take_scanned_grid(&mut self) -> Option<TileGrid> {
        self.scanned.take()
    }

    /// Take the diagnostics collected so far.
    pub fn take_diagnostics(&mut self) -> Diagnostics {
        std::mem::take(&mut self.diagnostics)
    }

    pub fn catalog(&self) -> &TileCatalog {
        &self.catalog
    }

    pub fn layout(&self) -> AtlasLayout {
        self.layout
    }

    pub fn tile_width(&self) -> u32 {
        self.tile_width
    }

    pub fn tile_height(&self) -> u32 {
        self.tile_height
    }

    pub fn power_of_two(&self) -> bool {
        self.power_of_two
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == BuildState::Ready
    }

    /// Number of completed `append` calls.
    pub fn appends(&self) -> usize {
        self.appends
    }

    /// Atlas width in pixels.
    pub fn out_width(&self) -> u32 {
        self.layout.width()
    }

    /// Atlas height in pixels.
    pub fn out_height(&self) -> u32 {
        self.layout.height()
    }

    fn relayout(&mut self) {
        self.layout = AtlasLayout::for_count(
            self.catalog.len(),
            self.tile_width,
            self.tile_height,
            self.power_of_two,
        );
    }
}

fn non_zero_or_default(n: u32) -> u32 {
    if n == 0 {
        DEFAULT_TILE_SIZE
    } else {
        n
    }
}

/// Whole cells along each axis; partial trailing cells are dropped.
pub(crate) fn grid_size(image: &PixelBuffer, tile_width: u32, tile_height: u32) -> (u32, u32) {
    (image.width() / tile_width, image.height() / tile_height)
}

/// Every whole cell of `image` in row-major order, with its content key.
pub(crate) fn cells(
    image: &PixelBuffer,
    tile_width: u32,
    tile_height: u32,
) -> impl Iterator<Item = (u32, u32, TileKey)> + '_ {
    let (grid_w, grid_h) = grid_size(image, tile_width, tile_height);
    (0..grid_h).flat_map(move |y| {
        (0..grid_w).map(move |x| {
            let pixels = image.region(x * tile_width, y * tile_height, tile_width, tile_height);
            (x, y, TileKey::new(pixels))
        })
    })
}

pub(crate) fn dimension_mismatch(
    image: &PixelBuffer,
    tile_width: u32,
    tile_height: u32,
) -> Option<Diagnostic> {
    let extra_x = image.width() % tile_width;
    let extra_y = image.height() % tile_height;
    if extra_x == 0 && extra_y == 0 {
        return None;
    }

    Some(
        Diagnostic::warning(
            DIMENSION_MISMATCH,
            format!(
                "Image size {}x{} is not a multiple of the {}x{} tile size; trailing {}px column and {}px row ignored",
                image.width(),
                image.height(),
                tile_width,
                tile_height,
                extra_x,
                extra_y
            ),
        )
        .with_help("Crop or pad the image to a whole number of tiles"),
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Solid-colour tile bytes.
    pub(crate) fn solid(w: u32, h: u32, rgba: [u8; 4]) -> Vec<u8> {
        rgba.repeat(w as usize * h as usize)
    }

    /// Build an image from a grid of solid-colour cells.
    pub(crate) fn tiled_image(tile: u32, colours: &[&[[u8; 4]]]) -> PixelBuffer {
        let rows = colours.len() as u32;
        let cols = colours.first().map_or(0, |r| r.len()) as u32;
        let mut image = PixelBuffer::blank(cols * tile, rows * tile);
        for (y, row) in colours.iter().enumerate() {
            for (x, &c) in row.iter().enumerate() {
                image.blit(&solid(tile, tile, c), tile, tile, x as u32 * tile, y as u32 * tile);
            }
        }
        image
    }

    const A: [u8; 4] = [255, 0, 0, 255];
    const B: [u8; 4] = [0, 0, 255, 255];
    const C: [u8; 4] = [0, 255, 0, 255];

    #[test]
    fn test_defaults() {
        let builder = TilesetBuilder::default();
        assert_eq!((builder.tile_width(), builder.tile_height()), (16, 16));
        assert!(builder.power_of_two());
        assert_eq!(builder.state(), BuildState::Pending);

        let zero = TilesetBuilder::new(0, 8);
        assert_eq!((zero.tile_width(), zero.tile_height()), (16, 8));
    }

    #[test]
    fn test_quadrant_scenario() {
        let image = tiled_image(16, &[&[A, B], &[B, A]]);
        let mut builder = TilesetBuilder::new(16, 16);
        builder.append(&image);

        assert!(builder.is_ready());
        assert_eq!(builder.catalog().len(), 2);
        assert_eq!(builder.take_scanned_grid().unwrap().ids(), &[1, 2, 2, 1]);
        assert_eq!((builder.out_width(), builder.out_height()), (32, 32));

        let atlas = builder.render_atlas().unwrap();
        assert_eq!((atlas.width(), atlas.height()), (32, 32));
        assert_eq!(atlas.get(0, 0), Some(A));
        assert_eq!(atlas.get(16, 0), Some(B));
        assert_eq!(atlas.get(0, 16), Some([0, 0, 0, 0]));
        assert_eq!(atlas.get(31, 31), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_single_blank_tile() {
        let image = PixelBuffer::blank(16, 16);
        let mut builder = TilesetBuilder::new(16, 16);
        builder.append(&image);

        assert_eq!(builder.catalog().len(), 1);
        assert_eq!(builder.take_scanned_grid().unwrap().ids(), &[1]);
        assert_eq!((builder.out_width(), builder.out_height()), (16, 16));
    }

    #[test]
    fn test_render_before_append_fails() {
        let builder = TilesetBuilder::new(16, 16);
        assert!(matches!(builder.render_atlas(), Err(TmxError::NotReady { .. })));
    }

    #[test]
    fn test_empty_image_gives_empty_atlas() {
        let image = PixelBuffer::blank(0, 0);
        let mut builder = TilesetBuilder::new(16, 16);
        builder.append(&image);

        assert!(builder.is_ready());
        assert!(builder.catalog().is_empty());
        let atlas = builder.render_atlas().unwrap();
        assert_eq!((atlas.width(), atlas.height()), (0, 0));
    }

    #[test]
    fn test_image_smaller_than_tile() {
        let image = PixelBuffer::blank(10, 10);
        let mut builder = TilesetBuilder::new(16, 16);
        builder.append(&image);

        assert!(builder.catalog().is_empty());
        assert_eq!(builder.out_width(), 0);
        assert_eq!(builder.take_diagnostics().count_code(DIMENSION_MISMATCH), 1);
    }

    #[test]
    fn test_partial_cells_truncated() {
        // 40x20 image with 16x16 tiles -> 2x1 grid
        let mut image = PixelBuffer::blank(40, 20);
        image.blit(&solid(16, 16, A), 16, 16, 0, 0);
        image.blit(&solid(8, 4, C), 8, 4, 32, 16);

        let mut builder = TilesetBuilder::new(16, 16);
        builder.append(&image);

        let grid = builder.take_scanned_grid().unwrap();
        assert_eq!((grid.width(), grid.height()), (2, 1));
        assert_eq!(grid.ids(), &[1, 2]);
        assert_eq!(builder.catalog().len(), 2);

        let diagnostics = builder.take_diagnostics();
        assert_eq!(diagnostics.count_code(DIMENSION_MISMATCH), 1);
        assert!(builder.take_diagnostics().is_empty());
    }

    #[test]
    fn test_first_seen_ids() {
        let image = tiled_image(4, &[&[C, A, C], &[B, A, B]]);
        let mut builder = TilesetBuilder::new(4, 4);
        builder.append(&image);

        assert_eq!(builder.take_scanned_grid().unwrap().ids(), &[1, 2, 1, 3, 2, 3]);
        let first = builder.catalog().get(builder.catalog().tiles()[0].id()).unwrap();
        assert_eq!(&first.pixels()[0..4], &C);
    }

    #[test]
    fn test_common_tileset_no_growth() {
        let a = tiled_image(16, &[&[A, B]]);
        let b = tiled_image(16, &[&[B, B], &[A, B]]);

        let mut builder = TilesetBuilder::new(16, 16);
        builder.append(&a);
        let after_a = builder.catalog().len();
        builder.append(&b);

        assert_eq!(after_a, 2);
        assert_eq!(builder.catalog().len(), after_a);
        assert_eq!(builder.appends(), 2);
    }

    #[test]
    fn test_append_chaining_grows_atlas() {
        let a = tiled_image(8, &[&[A]]);
        let b = tiled_image(8, &[&[B, C]]);

        let mut builder = TilesetBuilder::new(8, 8);
        builder.append(&a);
        assert_eq!(builder.render_atlas().unwrap().width(), 8);

        builder.append(&b).append(&a);
        assert_eq!(builder.catalog().len(), 3);

        let atlas = builder.render_atlas().unwrap();
        assert_eq!((atlas.width(), atlas.height()), (16, 16));
        assert_eq!(atlas.get(0, 0), Some(A));
        assert_eq!(atlas.get(8, 0), Some(B));
        assert_eq!(atlas.get(0, 8), Some(C));
    }

    #[test]
    fn test_without_power_of_two() {
        let image = tiled_image(2, &[&[A, B, C, [1, 1, 1, 1], [2, 2, 2, 2]]]);
        let mut builder = TilesetBuilder::new(2, 2).with_power_of_two(false);
        builder.append(&image);

        assert_eq!(builder.layout().side, 3);
        assert_eq!(builder.out_width(), 6);

        let builder = builder.with_power_of_two(true);
        assert_eq!(builder.layout().side, 4);
    }
}
