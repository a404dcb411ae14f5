mod config;

use clap::Parser;
use layers::{ReconstructionOutcome, StaticViewport, TerrainSession};
use scene::World;
use streaming::{TileFetcher, TileKind, TileSources, stitch};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{Args, BuilderConfig, key_provider};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = BuilderConfig::resolve(&args)?;
    info!(bbox = ?config.bbox, zoom = config.zoom, strategy = ?config.strategy, "starting");

    let sources = TileSources::http(&config.sources, key_provider(&args));
    let fetcher = TileFetcher::new(sources).with_timeout(config.sources.timeout());
    let session = TerrainSession::new(fetcher, World::new()).with_strategy(config.strategy);

    let viewport = StaticViewport::new(config.bbox, config.zoom);
    let outcome = session.reconstruct(&viewport).await?;
    let ReconstructionOutcome::Installed {
        mesh,
        vertices,
        triangles,
        ..
    } = outcome
    else {
        warn!(?outcome, "reconstruction was superseded");
        return Ok(());
    };

    let texture = session.with_scene(|world| {
        let camera = world.camera().position;
        println!(
            "terrain: {vertices} vertices, {triangles} triangles, camera at ({:.1}, {:.1}, {:.1})",
            camera.x, camera.y, camera.z
        );
        world
            .mesh(mesh)
            .and_then(|m| m.material.texture())
            .map(|t| t.png().to_vec())
    });

    if let Some(path) = &config.texture_out {
        let png = match texture {
            Some(png) => png,
            None => {
                let z = foundation::math::terrain_zoom(config.zoom);
                let range = config.bbox.tile_range(z);
                stitch(session.fetcher(), TileKind::Imagery, &range)
                    .await?
                    .encode_png()?
            }
        };
        tokio::fs::write(path, &png).await?;
        info!(path = %path.display(), bytes = png.len(), "texture written");
    }

    Ok(())
}
