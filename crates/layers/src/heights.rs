//! Elevation sampling on a regular lat/lng grid.

use formats::sample_tile_elevation;
use foundation::GeoBoundingBox;
use foundation::math::{PixelInTile, lng_lat_to_pixel_in_tile};
use streaming::{TileFetcher, TileKind};
use tracing::debug;

use crate::error::TerrainError;

/// `rows x cols` elevations in meters, row 0 at the north edge.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightGrid {
    rows: usize,
    cols: usize,
    heights: Vec<f64>,
}

impl HeightGrid {
    pub fn new(rows: usize, cols: usize, heights: Vec<f64>) -> Result<Self, TerrainError> {
        if rows < 2 || cols < 2 || heights.len() != rows * cols {
            return Err(TerrainError::InvalidGrid { rows, cols });
        }
        Ok(Self {
            rows,
            cols,
            heights,
        })
    }

    /// Every sample at the same height.
    pub fn flat(rows: usize, cols: usize, meters: f64) -> Result<Self, TerrainError> {
        Self::new(rows, cols, vec![meters; rows * cols])
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.heights[row * self.cols + col]
    }

    pub fn heights(&self) -> &[f64] {
        &self.heights
    }

    pub fn min(&self) -> f64 {
        self.heights.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn max(&self) -> f64 {
        self.heights.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Where each grid sample falls in the tile pyramid at zoom `z`, row-major.
pub fn grid_samples(bbox: &GeoBoundingBox, z: u8, rows: usize, cols: usize) -> Vec<PixelInTile> {
    let mut samples = Vec::with_capacity(rows * cols);
    for r in 0..rows {
        let lat = bbox.north - (r as f64 / (rows - 1) as f64) * bbox.height_deg();
        for c in 0..cols {
            let lng = bbox.west + (c as f64 / (cols - 1) as f64) * bbox.width_deg();
            samples.push(lng_lat_to_pixel_in_tile(lng, lat, z));
        }
    }
    samples
}

/// Sample terrain-RGB elevation over `bbox`.
///
/// All tiles touched by the grid are fetched in one joint request. Samples
/// in missing tiles read as 0 m.
pub async fn sample_height_grid(
    fetcher: &TileFetcher,
    bbox: &GeoBoundingBox,
    z: u8,
    rows: usize,
    cols: usize,
) -> Result<HeightGrid, TerrainError> {
    if rows < 2 || cols < 2 {
        return Err(TerrainError::InvalidGrid { rows, cols });
    }
    bbox.validate()?;

    let samples = grid_samples(bbox, z, rows, cols);
    let tiles = fetcher
        .fetch(TileKind::Terrain, samples.iter().map(|s| s.tile))
        .await?;

    let heights = samples
        .iter()
        .map(|s| {
            tiles
                .get(s.tile)
                .and_then(|tile| sample_tile_elevation(tile, s.px, s.py))
                .unwrap_or(0.0)
        })
        .collect();
    debug!(rows, cols, z, tiles = tiles.unique(), "height grid sampled");
    HeightGrid::new(rows, cols, heights)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use formats::{RasterImage, encode_elevation};
    use foundation::{GeoBoundingBox, TileCoord};
    use pretty_assertions::assert_eq;
    use streaming::{MemorySource, TileFetcher, TileSources};

    use super::{HeightGrid, grid_samples, sample_height_grid};
    use crate::error::TerrainError;

    fn terrain_png(meters: f64) -> Vec<u8> {
        let [r, g, b] = encode_elevation(meters);
        RasterImage::filled(256, 256, [r, g, b, 255]).encode_png().unwrap()
    }

    #[test]
    fn grid_rejects_degenerate_shapes() {
        assert!(matches!(
            HeightGrid::flat(1, 5, 0.0),
            Err(TerrainError::InvalidGrid { rows: 1, cols: 5 })
        ));
        assert!(HeightGrid::new(2, 2, vec![0.0; 3]).is_err());
        let grid = HeightGrid::new(2, 2, vec![1.0, -4.0, 9.0, 2.0]).unwrap();
        assert_eq!((grid.min(), grid.max()), (-4.0, 9.0));
        assert_eq!(grid.get(1, 0), 9.0);
    }

    #[test]
    fn samples_span_the_box_edges() {
        let bbox = GeoBoundingBox::from_array([10.0, -20.0, 20.0, -10.0]).unwrap();
        let samples = grid_samples(&bbox, 2, 3, 4);
        assert_eq!(samples.len(), 12);
        // First sample is the NW corner, last the SE corner; all in tile (2, 2).
        assert!(samples.iter().all(|s| s.tile == TileCoord::new(2, 2, 2)));
        assert!(samples[0].px < samples[3].px);
        assert!(samples[0].py < samples[11].py);
    }

    #[tokio::test]
    async fn heights_come_from_the_right_tiles() {
        let terrain = Arc::new(MemorySource::new("terrain"));
        // [10,-20,20,-10] sits inside tile 2/2/2.
        terrain.set_tile(TileCoord::new(2, 2, 2), terrain_png(1234.5)).await;
        let fetcher = TileFetcher::new(TileSources::new(terrain.clone(), Arc::new(MemorySource::new("imagery"))));
        let bbox = GeoBoundingBox::from_array([10.0, -20.0, 20.0, -10.0]).unwrap();

        let grid = sample_height_grid(&fetcher, &bbox, 2, 10, 10).await.unwrap();

        assert_eq!(terrain.request_count(), 1);
        assert!(grid.heights().iter().all(|h| (h - 1234.5).abs() < 1e-6));
    }

    #[tokio::test]
    async fn missing_tiles_read_as_sea_level() {
        let fetcher = TileFetcher::new(TileSources::new(
            Arc::new(MemorySource::new("terrain")),
            Arc::new(MemorySource::new("imagery")),
        ));
        let bbox = GeoBoundingBox::from_array([-1.0, -1.0, 1.0, 1.0]).unwrap();
        let grid = sample_height_grid(&fetcher, &bbox, 2, 5, 5).await.unwrap();
        assert!(grid.heights().iter().all(|&h| h == 0.0));
    }
}
