use std::sync::Arc;

use formats::{RasterImage, encode_elevation};
use foundation::{GeoBoundingBox, TileRange};
use layers::{
    DrapeOptions, GridTerrainOptions, ReconstructionOutcome, TerrainSession, TerrainStrategy,
};
use pretty_assertions::assert_eq;
use scene::{Material, SceneOwner, World};
use streaming::{MemorySource, TileFetcher, TileKind, TileSources, stitch};

const Z: u8 = 4;

fn range() -> TileRange {
    TileRange::new(Z, [5, 7], [5, 7])
}

/// The range's own bounds pulled 1% inward so every corner stays inside it.
fn inner_bounds() -> GeoBoundingBox {
    let outer = range().to_bounds();
    let (dx, dy) = (outer.width_deg() * 0.01, outer.height_deg() * 0.01);
    GeoBoundingBox::new(outer.west + dx, outer.south + dy, outer.east - dx, outer.north - dy)
        .unwrap()
}

async fn sources() -> (Arc<MemorySource>, Arc<MemorySource>) {
    let terrain = Arc::new(MemorySource::new("terrain"));
    let imagery = Arc::new(MemorySource::new("imagery"));
    for coord in range().iter() {
        let [r, g, b] = encode_elevation(100.0 * (coord.x + coord.y) as f64);
        let heights = RasterImage::filled(256, 256, [r, g, b, 255]);
        terrain.set_tile(coord, heights.encode_png().unwrap()).await;

        let color = [(coord.x * 30) as u8, (coord.y * 30) as u8, 90, 255];
        let image = RasterImage::filled(256, 256, color);
        imagery.set_tile(coord, image.encode_png().unwrap()).await;
    }
    (terrain, imagery)
}

#[test]
fn bounds_map_back_onto_the_range() {
    assert_eq!(inner_bounds().tile_range(Z), range());
}

#[tokio::test]
async fn grid_terrain_fetches_each_tile_once() {
    let (terrain, imagery) = sources().await;
    let fetcher = TileFetcher::new(TileSources::new(terrain.clone(), imagery.clone()));
    let session = TerrainSession::new(fetcher, World::new())
        .with_strategy(TerrainStrategy::Grid(GridTerrainOptions::square(10)));

    let outcome = session.reconstruct_bounds(&inner_bounds(), Z).await.unwrap();

    let ReconstructionOutcome::Installed { mesh, vertices, .. } = outcome else {
        panic!("expected install, got {outcome:?}");
    };
    // 100 samples over a 3x3 range.
    assert_eq!(terrain.request_count(), 9);
    assert_eq!(imagery.request_count(), 0);
    assert_eq!(vertices, 100 + 36 + 1);

    session.with_scene(|world| {
        let installed = world.mesh(mesh).unwrap();
        assert_eq!(installed.material, Material::terrain_grey());
        let aabb = installed.mesh.bounds().unwrap();
        // Tiles range from 1000 m to 1400 m, i.e. 100..140 mesh units.
        assert!((aabb.max[1] - 140.0).abs() < 1e-3, "{aabb:?}");
        assert!((aabb.min[1] - 50.0).abs() < 1e-3, "{aabb:?}");
    });
}

#[tokio::test]
async fn stitched_range_is_768_square() {
    let (terrain, imagery) = sources().await;
    let fetcher = TileFetcher::new(TileSources::new(terrain, imagery.clone()));

    let canvas = stitch(&fetcher, TileKind::Imagery, &range()).await.unwrap();

    assert_eq!((canvas.width(), canvas.height()), (768, 768));
    assert_eq!(imagery.request_count(), 9);
    // Tile (6, 7) lands in the middle column, bottom row.
    assert_eq!(canvas.pixel(300, 600), Some([180, 210, 90, 255]));
}

#[tokio::test]
async fn textured_drape_installs_the_imagery_texture() {
    let (terrain, imagery) = sources().await;
    let fetcher = TileFetcher::new(TileSources::new(terrain.clone(), imagery.clone()));
    let options = DrapeOptions::within_vertex_budget(768, 768, 20_000);
    let session =
        TerrainSession::new(fetcher, World::new()).with_strategy(TerrainStrategy::Drape(options));

    session.reconstruct_bounds(&inner_bounds(), Z).await.unwrap();
    session.reconstruct_bounds(&inner_bounds(), Z).await.unwrap();

    assert_eq!(terrain.request_count(), 18);
    assert_eq!(imagery.request_count(), 18);
    session.with_scene(|world| {
        assert_eq!(world.mesh_count(), 1);
        let (_, installed) = world.meshes().next().unwrap();
        let texture = installed.material.texture().unwrap();
        assert_eq!((texture.width(), texture.height()), (768, 768));
        assert!(installed.mesh.uvs.is_some());
        assert!(installed.mesh.vertex_count() <= 20_000);
    });
}
