//! Slippy-map tile addressing.

use serde::{Deserialize, Serialize};

use crate::bounds::GeoBoundingBox;
use crate::math::mercator::tile_to_lon_lat;

/// Side length in pixels of every raster tile.
pub const TILE_SIZE: u32 = 256;

/// Deepest zoom level addressable here. Past it tile indices and stitched
/// pixel sizes no longer fit in `u32`.
pub const MAX_ZOOM: u8 = 24;

/// Tile coordinate in ZXY scheme.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TileCoord {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    pub fn new(z: u8, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Number of tiles along one axis at zoom `z` (2^z), with `z` capped at
    /// [`MAX_ZOOM`].
    pub fn tiles_per_axis(z: u8) -> u64 {
        1u64 << z.min(MAX_ZOOM)
    }

    pub fn is_valid(&self) -> bool {
        if self.z > MAX_ZOOM {
            return false;
        }
        let n = Self::tiles_per_axis(self.z);
        (self.x as u64) < n && (self.y as u64) < n
    }

    /// The `"z/x/y"` key used to deduplicate fetches.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl std::fmt::Display for TileCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Inclusive rectangle of tiles at a single zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileRange {
    pub z: u8,
    /// `[min_x, max_x]`, inclusive.
    pub x: [u32; 2],
    /// `[min_y, max_y]`, inclusive.
    pub y: [u32; 2],
}

impl TileRange {
    pub fn new(z: u8, x: [u32; 2], y: [u32; 2]) -> Self {
        debug_assert!(x[0] <= x[1] && y[0] <= y[1], "unordered tile range");
        Self { z, x, y }
    }

    pub fn single(tile: TileCoord) -> Self {
        Self::new(tile.z, [tile.x, tile.x], [tile.y, tile.y])
    }

    /// Number of tile columns.
    pub fn width(&self) -> u32 {
        self.x[1].saturating_sub(self.x[0]) + 1
    }

    /// Number of tile rows.
    pub fn height(&self) -> u32 {
        self.y[1].saturating_sub(self.y[0]) + 1
    }

    pub fn len(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    /// Stitched raster size in pixels, saturating at `u32::MAX`.
    pub fn pixel_size(&self) -> (u32, u32) {
        (
            self.width().saturating_mul(TILE_SIZE),
            self.height().saturating_mul(TILE_SIZE),
        )
    }

    pub fn contains(&self, tile: TileCoord) -> bool {
        tile.z == self.z
            && (self.x[0]..=self.x[1]).contains(&tile.x)
            && (self.y[0]..=self.y[1]).contains(&tile.y)
    }

    /// Tiles in row-major order (y outer, x inner).
    pub fn iter(&self) -> impl Iterator<Item = TileCoord> + '_ {
        (self.y[0]..=self.y[1])
            .flat_map(move |y| (self.x[0]..=self.x[1]).map(move |x| TileCoord::new(self.z, x, y)))
    }

    /// Geographic box covered by the whole range.
    pub fn to_bounds(&self) -> GeoBoundingBox {
        let (west, north) = tile_to_lon_lat(self.x[0] as f64, self.y[0] as f64, self.z);
        let (east, south) =
            tile_to_lon_lat(self.x[1] as f64 + 1.0, self.y[1] as f64 + 1.0, self.z);
        GeoBoundingBox {
            west,
            south,
            east,
            north,
        }
    }
}
