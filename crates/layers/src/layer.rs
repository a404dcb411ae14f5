use formats::RasterImage;
use foundation::GeoBoundingBox;
use futures_util::future::try_join;
use scene::{CameraPose, Material, TerrainMesh, Texture};
use streaming::{TileFetcher, TileKind, stitch};
use tracing::info;

use crate::error::TerrainError;
use crate::heights::{HeightGrid, sample_height_grid};
use crate::raster::{DrapeOptions, build_drape_mesh, drape_camera};
use crate::terrain::{GridTerrainOptions, build_grid_mesh, grid_camera};

/// How a viewport becomes terrain geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TerrainStrategy {
    /// Closed grey block sampled on a fixed grid.
    Grid(GridTerrainOptions),
    /// Satellite-textured surface, one vertex per stitched pixel (or per step).
    Drape(DrapeOptions),
}

impl Default for TerrainStrategy {
    fn default() -> Self {
        TerrainStrategy::Grid(GridTerrainOptions::default())
    }
}

/// Fetched inputs for one build. Holding one means all network work is done.
#[derive(Debug)]
pub enum PreparedTerrain {
    Grid {
        heights: HeightGrid,
        options: GridTerrainOptions,
    },
    Drape {
        heights: RasterImage,
        imagery: RasterImage,
        options: DrapeOptions,
    },
}

/// A finished terrain ready to hand to a scene.
#[derive(Debug)]
pub struct TerrainBuild {
    pub mesh: TerrainMesh,
    pub material: Material,
    pub camera: CameraPose,
}

impl TerrainStrategy {
    /// Fetch everything the strategy needs for `bbox` at tile zoom `z`.
    pub async fn prepare(
        &self,
        fetcher: &TileFetcher,
        bbox: &GeoBoundingBox,
        z: u8,
    ) -> Result<PreparedTerrain, TerrainError> {
        bbox.validate()?;
        match *self {
            TerrainStrategy::Grid(options) => {
                let heights =
                    sample_height_grid(fetcher, bbox, z, options.rows, options.cols).await?;
                Ok(PreparedTerrain::Grid { heights, options })
            }
            TerrainStrategy::Drape(options) => {
                let range = bbox.tile_range(z);
                let (heights, imagery) = try_join(
                    stitch(fetcher, TileKind::Terrain, &range),
                    stitch(fetcher, TileKind::Imagery, &range),
                )
                .await?;
                info!(
                    z,
                    tiles = range.len(),
                    width = heights.width(),
                    height = heights.height(),
                    "drape rasters stitched"
                );
                Ok(PreparedTerrain::Drape {
                    heights,
                    imagery,
                    options,
                })
            }
        }
    }
}

impl PreparedTerrain {
    pub fn build(self) -> Result<TerrainBuild, TerrainError> {
        let build = match self {
            PreparedTerrain::Grid { heights, options } => TerrainBuild {
                mesh: build_grid_mesh(&heights, &options),
                material: Material::terrain_grey(),
                camera: grid_camera(&heights, &options),
            },
            PreparedTerrain::Drape {
                heights,
                imagery,
                options,
            } => {
                let mesh = build_drape_mesh(&heights, &options);
                let camera = drape_camera(&mesh);
                let texture = Texture::from_raster(&imagery)?;
                TerrainBuild {
                    mesh,
                    material: Material::textured(texture),
                    camera,
                }
            }
        };
        build.mesh.validate()?;
        Ok(build)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use formats::RasterImage;
    use foundation::{GeoBoundingBox, TileCoord};
    use scene::Material;
    use streaming::{MemorySource, TileFetcher, TileSources};

    use super::{PreparedTerrain, TerrainStrategy};
    use crate::raster::DrapeOptions;

    fn png(rgba: [u8; 4]) -> Vec<u8> {
        RasterImage::filled(256, 256, rgba).encode_png().unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn drape_fetches_terrain_and_imagery_together() {
        let latency = Duration::from_millis(50);
        let terrain = Arc::new(MemorySource::new("terrain").with_latency(latency));
        let imagery = Arc::new(MemorySource::new("imagery").with_latency(latency));
        let tile = TileCoord::new(2, 2, 2);
        terrain.set_tile(tile, png([1, 134, 160, 255])).await;
        imagery.set_tile(tile, png([40, 120, 60, 255])).await;
        let fetcher = TileFetcher::new(TileSources::new(terrain.clone(), imagery.clone()));
        let bbox = GeoBoundingBox::from_array([10.0, -20.0, 20.0, -10.0]).unwrap();
        let strategy = TerrainStrategy::Drape(DrapeOptions::default());

        let started = tokio::time::Instant::now();
        let prepared = strategy.prepare(&fetcher, &bbox, 2).await.unwrap();
        let elapsed = started.elapsed();

        // One stitch after the other would take two latencies.
        assert!(elapsed >= latency && elapsed < latency * 2, "took {elapsed:?}");
        assert_eq!((terrain.request_count(), imagery.request_count()), (1, 1));
        assert!(matches!(prepared, PreparedTerrain::Drape { .. }));

        let build = prepared.build().unwrap();
        let Material::Textured { texture } = build.material else {
            panic!("expected a textured material");
        };
        assert_eq!((texture.width(), texture.height()), (256, 256));
    }
}
