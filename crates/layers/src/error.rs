use formats::RasterError;
use foundation::BoundsError;
use scene::MeshError;
use streaming::FetchError;

/// Why a terrain reconstruction failed. The scene is left as it was.
#[derive(Debug, thiserror::Error)]
pub enum TerrainError {
    #[error("invalid viewport: {0}")]
    Bounds(#[from] BoundsError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("could not encode terrain texture: {0}")]
    Texture(#[from] RasterError),
    #[error("tile zoom {z} is deeper than the supported maximum {max}")]
    Zoom { z: u8, max: u8 },
    #[error("terrain grid needs at least 2x2 samples, got {rows}x{cols}")]
    InvalidGrid { rows: usize, cols: usize },
    #[error("built an invalid mesh: {0}")]
    Mesh(#[from] MeshError),
}
