//! Terrain-RGB elevation encoding.
//!
//! `height = -10000 + (R * 256 * 256 + G * 256 + B) * 0.1` meters.

use crate::raster::RasterImage;

pub const ELEVATION_OFFSET_M: f64 = -10_000.0;
pub const ELEVATION_STEP_M: f64 = 0.1;

/// Largest raw value the three channels can hold (2^24 - 1).
const MAX_RAW: u32 = 0xFF_FF_FF;

/// Pixel space the sampler addresses, independent of a tile's real size.
const CANONICAL_TILE_PX: f64 = 256.0;

/// Pixel that decodes to exactly 0 m, used in place of missing terrain.
pub const ZERO_ELEVATION_RGBA: [u8; 4] = [1, 134, 160, 255];

pub fn decode_elevation(r: u8, g: u8, b: u8) -> f64 {
    let raw = (r as u32) * 65_536 + (g as u32) * 256 + b as u32;
    ELEVATION_OFFSET_M + raw as f64 * ELEVATION_STEP_M
}

/// Inverse of [`decode_elevation`], rounded to the nearest 0.1 m and clamped
/// to the encodable range.
pub fn encode_elevation(meters: f64) -> [u8; 3] {
    let raw = ((meters - ELEVATION_OFFSET_M) / ELEVATION_STEP_M).round();
    let raw = if raw.is_nan() {
        0
    } else {
        raw.clamp(0.0, MAX_RAW as f64) as u32
    };
    [(raw >> 16) as u8, (raw >> 8) as u8, raw as u8]
}

/// Elevation of pixel `(x, y)`, or `None` outside the raster.
pub fn elevation_at(raster: &RasterImage, x: u32, y: u32) -> Option<f64> {
    raster
        .pixel(x, y)
        .map(|[r, g, b, _]| decode_elevation(r, g, b))
}

/// Elevation at a fractional offset in canonical 256-px tile space.
///
/// Offsets are rescaled to the raster's real size so `@2x` tiles sample the
/// same ground point, then floored and clamped into the raster.
pub fn sample_tile_elevation(raster: &RasterImage, px: f64, py: f64) -> Option<f64> {
    if raster.width() == 0 || raster.height() == 0 {
        return None;
    }
    let x = (px * raster.width() as f64 / CANONICAL_TILE_PX).floor();
    let y = (py * raster.height() as f64 / CANONICAL_TILE_PX).floor();
    let x = x.clamp(0.0, (raster.width() - 1) as f64) as u32;
    let y = y.clamp(0.0, (raster.height() - 1) as f64) as u32;
    elevation_at(raster, x, y)
}
