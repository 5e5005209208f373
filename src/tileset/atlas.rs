//! Square atlas layout for a tile catalog.

/// Geometry of the packed atlas: a square grid of `side` x `side` tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AtlasLayout {
    pub side: u32,
    pub tile_width: u32,
    pub tile_height: u32,
}

impl AtlasLayout {
    /// Compute the layout for `tile_count` tiles.
    ///
    /// The side is `ceil(sqrt(tile_count))`, rounded up to a power of two when
    /// `power_of_two` is set. Zero tiles give a zero-sized atlas.
    pub fn for_count(
        tile_count: usize,
        tile_width: u32,
        tile_height: u32,
        power_of_two: bool,
    ) -> Self {
        let mut side = ceil_sqrt(tile_count as u64) as u32;
        if power_of_two && side > 0 {
            side = side.next_power_of_two();
        }
        Self {
            side,
            tile_width,
            tile_height,
        }
    }

    pub fn width(&self) -> u32 {
        self.side * self.tile_width
    }

    pub fn height(&self) -> u32 {
        self.side * self.tile_height
    }

    /// Number of tile slots in the atlas.
    pub fn capacity(&self) -> usize {
        self.side as usize * self.side as usize
    }

    /// Pixel position of the tile at zero-based `index`, row-major.
    pub fn position(&self, index: usize) -> Option<(u32, u32)> {
        if index >= self.capacity() {
            return None;
        }
        let side = self.side as usize;
        let col = (index % side) as u32;
        let row = (index / side) as u32;
        Some((col * self.tile_width, row * self.tile_height))
    }
}

/// Smallest `s` with `s * s >= n`.
fn ceil_sqrt(n: u64) -> u64 {
    if n == 0 {
        return 0;
    }
    let mut s = (n as f64).sqrt() as u64;
    while s * s < n {
        s += 1;
    }
    while s > 0 && (s - 1) * (s - 1) >= n {
        s -= 1;
    }
    s
}
