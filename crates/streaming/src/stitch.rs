//! Mosaics a tile range into one raster.

use formats::RasterImage;
use foundation::{TILE_SIZE, TileRange};
use tracing::debug;

use crate::fetch::{FetchError, FetchedTiles, TileFetcher};
use crate::source::TileKind;

/// Fetch every tile of `range` and paste them into one canvas of
/// `range.width() * 256` by `range.height() * 256` pixels.
pub async fn stitch(
    fetcher: &TileFetcher,
    kind: TileKind,
    range: &TileRange,
) -> Result<RasterImage, FetchError> {
    let tiles = fetcher.fetch(kind, range.iter()).await?;
    Ok(stitch_tiles(kind, range, &tiles))
}

/// Paste already fetched tiles. Missing tiles keep the kind's placeholder.
pub fn stitch_tiles(kind: TileKind, range: &TileRange, tiles: &FetchedTiles) -> RasterImage {
    let (width, height) = range.pixel_size();
    let mut canvas = RasterImage::filled(width, height, kind.placeholder());

    for coord in range.iter() {
        let Some(tile) = tiles.get(coord) else {
            continue;
        };
        let x = (coord.x - range.x[0]) * TILE_SIZE;
        let y = (coord.y - range.y[0]) * TILE_SIZE;
        if tile.width() == TILE_SIZE && tile.height() == TILE_SIZE {
            canvas.blit(tile, x, y);
        } else {
            debug!(%kind, tile = %coord, width = tile.width(), height = tile.height(), "resampling tile to 256px");
            canvas.blit(&tile.resized_nearest(TILE_SIZE, TILE_SIZE), x, y);
        }
    }
    canvas
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use formats::{RasterImage, ZERO_ELEVATION_RGBA};
    use foundation::{TileCoord, TileRange};
    use pretty_assertions::assert_eq;

    use super::stitch;
    use crate::fetch::TileFetcher;
    use crate::source::{MemorySource, TileKind, TileSources};

    fn png(size: u32, rgba: [u8; 4]) -> Vec<u8> {
        RasterImage::filled(size, size, rgba).encode_png().unwrap()
    }

    #[tokio::test]
    async fn three_by_three_range_is_768_square_with_tiles_in_place() {
        let imagery = Arc::new(MemorySource::new("imagery"));
        let range = TileRange::new(6, [10, 12], [20, 22]);
        for coord in range.iter() {
            let shade = ((coord.x - 10) * 3 + (coord.y - 20)) as u8 * 20;
            imagery.set_tile(coord, png(256, [shade, 0, 0, 255])).await;
        }
        let fetcher = TileFetcher::new(TileSources::new(Arc::new(MemorySource::new("terrain")), imagery.clone()));

        let canvas = stitch(&fetcher, TileKind::Imagery, &range).await.unwrap();

        assert_eq!((canvas.width(), canvas.height()), (768, 768));
        assert_eq!(imagery.request_count(), 9);
        // Tile (11, 22) occupies x 256..512, y 512..768.
        let shade = (3 + 2) * 20;
        assert_eq!(canvas.pixel(256, 512), Some([shade, 0, 0, 255]));
        assert_eq!(canvas.pixel(511, 767), Some([shade, 0, 0, 255]));
        assert_eq!(canvas.pixel(0, 0), Some([0, 0, 0, 255]));
    }

    #[tokio::test]
    async fn missing_tiles_keep_kind_placeholder() {
        let terrain = Arc::new(MemorySource::new("terrain"));
        let imagery = Arc::new(MemorySource::new("imagery"));
        let range = TileRange::new(3, [0, 1], [0, 0]);
        terrain.set_tile(TileCoord::new(3, 0, 0), png(256, [7, 7, 7, 255])).await;
        let fetcher = TileFetcher::new(TileSources::new(terrain, imagery));

        let heights = stitch(&fetcher, TileKind::Terrain, &range).await.unwrap();
        assert_eq!(heights.pixel(10, 10), Some([7, 7, 7, 255]));
        assert_eq!(heights.pixel(300, 10), Some(ZERO_ELEVATION_RGBA));

        let colors = stitch(&fetcher, TileKind::Imagery, &range).await.unwrap();
        assert_eq!(colors.pixel(300, 10), Some([0, 0, 0, 0]));
    }

    #[tokio::test]
    async fn retina_tiles_are_normalized() {
        let imagery = Arc::new(MemorySource::new("imagery"));
        let tile = TileCoord::new(2, 2, 2);
        imagery.set_tile(tile, png(512, [1, 2, 3, 255])).await;
        let fetcher = TileFetcher::new(TileSources::new(Arc::new(MemorySource::new("terrain")), imagery));

        let canvas = stitch(&fetcher, TileKind::Imagery, &TileRange::single(tile)).await.unwrap();
        assert_eq!((canvas.width(), canvas.height()), (256, 256));
        assert_eq!(canvas.pixel(255, 255), Some([1, 2, 3, 255]));
    }
}
