//! Spherical Web Mercator as used by slippy-map tile pyramids.
//!
//! Two formulations of the same projection live here: the tile-index form
//! (`ln(tan φ + sec φ)`) and the world-pixel form (`ln((1 + sin φ) / (1 − sin φ)) / 2`).
//! They are algebraically identical and the tests hold them to each other.
//!
//! Nothing in this module panics on out-of-range input. Latitudes are clamped
//! to the Mercator limit, zoom levels to [`MAX_ZOOM`] and tile indices to
//! `0..2^z`.

use std::f64::consts::PI;

use crate::bounds::GeoBoundingBox;
use crate::tiles::{MAX_ZOOM, TILE_SIZE, TileCoord, TileRange};

/// Latitude where the square Web Mercator world ends (`atan(sinh(π))`).
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;

/// Highest zoom level served by terrain-RGB sources.
pub const MAX_TERRAIN_ZOOM: u8 = 15;

/// Fractional pixel position inside a tile.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PixelInTile {
    pub tile: TileCoord,
    /// `0.0..=256.0`
    pub px: f64,
    /// `0.0..=256.0`
    pub py: f64,
}

pub fn clamp_lat(lat: f64) -> f64 {
    if lat.is_nan() {
        return 0.0;
    }
    lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT)
}

fn clamp_index(v: f64, z: u8) -> u32 {
    let max = (TileCoord::tiles_per_axis(z) - 1) as f64;
    if v.is_nan() {
        return 0;
    }
    v.clamp(0.0, max) as u32
}

/// Tile containing `(lon, lat)` at zoom `z`.
pub fn lon_lat_to_tile(lon: f64, lat: f64, z: u8) -> TileCoord {
    let z = z.min(MAX_ZOOM);
    let n = TileCoord::tiles_per_axis(z) as f64;
    let lat_rad = clamp_lat(lat).to_radians();
    let x = ((lon + 180.0) / 360.0 * n).floor();
    let y = ((1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * n).floor();
    TileCoord::new(z, clamp_index(x, z), clamp_index(y, z))
}

/// Tile plus in-tile pixel offset for `(lng, lat)` at zoom `z`.
pub fn lng_lat_to_pixel_in_tile(lng: f64, lat: f64, z: u8) -> PixelInTile {
    let z = z.min(MAX_ZOOM);
    let tile_size = TILE_SIZE as f64;
    let scale = TileCoord::tiles_per_axis(z) as f64 * tile_size;
    let world_x = (lng + 180.0) / 360.0 * scale;
    let sin_lat = clamp_lat(lat).to_radians().sin();
    let world_y = (0.5 - ((1.0 + sin_lat) / (1.0 - sin_lat)).ln() / (4.0 * PI)) * scale;

    let tile_x = clamp_index((world_x / tile_size).floor(), z);
    let tile_y = clamp_index((world_y / tile_size).floor(), z);
    let px = (world_x - tile_x as f64 * tile_size).clamp(0.0, tile_size);
    let py = (world_y - tile_y as f64 * tile_size).clamp(0.0, tile_size);

    PixelInTile {
        tile: TileCoord::new(z, tile_x, tile_y),
        px,
        py,
    }
}

/// Longitude/latitude of the north-west corner of tile `(x, y)`.
///
/// Accepts fractional and one-past-the-end indices so callers can address
/// tile edges and interiors.
pub fn tile_to_lon_lat(x: f64, y: f64, z: u8) -> (f64, f64) {
    let n = TileCoord::tiles_per_axis(z) as f64;
    let lon = x / n * 360.0 - 180.0;
    let m = PI - 2.0 * PI * y / n;
    let lat = (0.5 * (m.exp() - (-m).exp())).atan().to_degrees();
    (lon, lat)
}

/// Tile range spanned by the NW and SE corners of `bbox`.
///
/// X and Y are paired corner-wise rather than sorted; for a valid box the
/// north-west tile never has a larger index than the south-east one.
pub fn bounds_to_tile_range(bbox: &GeoBoundingBox, z: u8) -> TileRange {
    let z = z.min(MAX_ZOOM);
    let nw = lon_lat_to_tile(bbox.west, bbox.north, z);
    let se = lon_lat_to_tile(bbox.east, bbox.south, z);
    TileRange::new(z, [nw.x, se.x], [nw.y, se.y])
}

/// Sampling zoom for a map view: one level finer than the view, capped at
/// the deepest terrain level.
pub fn terrain_zoom(map_zoom: f64) -> u8 {
    if !map_zoom.is_finite() {
        return 0;
    }
    (map_zoom.round() + 1.0).clamp(0.0, MAX_TERRAIN_ZOOM as f64) as u8
}
