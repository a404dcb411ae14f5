use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use foundation::GeoBoundingBox;
use foundation::math::terrain_zoom;
use layers::{DrapeOptions, GridTerrainOptions, TerrainStrategy};
use streaming::{EnvKey, KeyProvider, StaticKey, TileSourceConfig};

pub const API_KEY_VAR: &str = "TILE_API_KEY";

#[derive(Parser, Debug)]
#[command(author, version, about = "Reconstruct a terrain mesh from elevation and imagery tiles")]
pub struct Args {
    /// Bounding box: minLon,minLat,maxLon,maxLat
    #[arg(long)]
    pub bbox: String,

    /// Map zoom of the view; tiles are sampled one level finer
    #[arg(long, default_value_t = 12.0)]
    pub zoom: f64,

    #[arg(long, value_enum, default_value_t = Mode::Grid)]
    pub mode: Mode,

    /// Samples per side of the grid mesh
    #[arg(long)]
    pub grid_size: Option<usize>,

    /// Vertex budget for the drape mesh
    #[arg(long)]
    pub drape_max_vertices: Option<usize>,

    /// JSON file with tile source settings
    #[arg(long)]
    pub sources: Option<PathBuf>,

    /// Terrain-RGB URL template with {z}/{x}/{y} and optional {key}
    #[arg(long)]
    pub terrain_template: Option<String>,

    /// Imagery URL template with {z}/{x}/{y} and optional {key}
    #[arg(long)]
    pub imagery_template: Option<String>,

    /// API key; falls back to TILE_API_KEY
    #[arg(long)]
    pub api_key: Option<String>,

    /// Per-tile request timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Write the stitched imagery of the viewport as PNG
    #[arg(long)]
    pub texture_out: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Closed grey block on a regular grid
    Grid,
    /// Imagery-textured surface over the tile range
    Drape,
}

/// Everything the run needs, after flags, environment and files are merged.
#[derive(Debug)]
pub struct BuilderConfig {
    pub bbox: GeoBoundingBox,
    pub zoom: f64,
    pub strategy: TerrainStrategy,
    pub sources: TileSourceConfig,
    pub texture_out: Option<PathBuf>,
}

impl BuilderConfig {
    /// Flags win over environment variables, which win over the sources
    /// file, which wins over defaults.
    pub fn resolve(args: &Args) -> Result<Self, Box<dyn std::error::Error>> {
        let bbox = GeoBoundingBox::from_array(parse_bbox(&args.bbox)?)?;

        let mut sources = match &args.sources {
            Some(path) => read_sources(path)?,
            None => TileSourceConfig::default(),
        };
        if let Some(template) = env_var_string("TERRAIN_TILE_TEMPLATE") {
            sources.terrain_template = template;
        }
        if let Some(template) = env_var_string("IMAGERY_TILE_TEMPLATE") {
            sources.imagery_template = template;
        }
        sources.timeout_secs = env_var_u64("TILE_TIMEOUT_SECS", sources.timeout_secs);
        if let Some(template) = &args.terrain_template {
            sources.terrain_template = template.clone();
        }
        if let Some(template) = &args.imagery_template {
            sources.imagery_template = template.clone();
        }
        if let Some(secs) = args.timeout_secs {
            sources.timeout_secs = secs;
        }

        let strategy = match args.mode {
            Mode::Grid => {
                let size = args
                    .grid_size
                    .unwrap_or_else(|| env_var_usize("TERRAIN_GRID_SIZE", layers::DEFAULT_GRID_SIZE));
                TerrainStrategy::Grid(GridTerrainOptions::square(size))
            }
            Mode::Drape => {
                let budget = args
                    .drape_max_vertices
                    .unwrap_or_else(|| env_var_usize("DRAPE_MAX_VERTICES", layers::LARGE_DRAPE_VERTICES));
                let (width, height) = bbox.tile_range(terrain_zoom(args.zoom)).pixel_size();
                TerrainStrategy::Drape(DrapeOptions::within_vertex_budget(width, height, budget))
            }
        };

        Ok(Self {
            bbox,
            zoom: args.zoom,
            strategy,
            sources,
            texture_out: args.texture_out.clone(),
        })
    }
}

pub fn key_provider(args: &Args) -> Arc<dyn KeyProvider> {
    match &args.api_key {
        Some(key) => Arc::new(StaticKey::new(key.clone())),
        None => Arc::new(EnvKey::new(API_KEY_VAR)),
    }
}

fn read_sources(path: &Path) -> Result<TileSourceConfig, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    Ok(serde_json::from_str(&text)?)
}

pub fn parse_bbox(bbox: &str) -> Result<[f64; 4], Box<dyn std::error::Error>> {
    let parts: Vec<_> = bbox.split(',').collect();
    if parts.len() != 4 {
        return Err("bbox must be minLon,minLat,maxLon,maxLat".into());
    }
    let min_lon: f64 = parts[0].trim().parse()?;
    let min_lat: f64 = parts[1].trim().parse()?;
    let max_lon: f64 = parts[2].trim().parse()?;
    let max_lat: f64 = parts[3].trim().parse()?;
    Ok([min_lon, min_lat, max_lon, max_lat])
}

fn env_var_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_var_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_var_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
