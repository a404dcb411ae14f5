//! Terrain reconstruction session.
//!
//! One session owns the tile sources, the target scene and its terrain slot.
//! Every reconstruction takes a fresh generation number; a run whose
//! generation is no longer the latest when its tiles arrive is dropped
//! without touching the scene.

use std::sync::atomic::{AtomicU64, Ordering};

use foundation::math::terrain_zoom;
use foundation::{GeoBoundingBox, MAX_ZOOM};
use parking_lot::Mutex;
use scene::{ActiveTerrain, MeshId, SceneOwner};
use streaming::TileFetcher;
use tracing::{debug, info};

use crate::error::TerrainError;
use crate::layer::TerrainStrategy;

/// Where the user is looking. Read once at the start of a reconstruction.
pub trait ViewportSource: Send + Sync {
    fn bounds(&self) -> GeoBoundingBox;

    /// Map zoom level, possibly fractional.
    fn zoom(&self) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticViewport {
    pub bounds: GeoBoundingBox,
    pub zoom: f64,
}

impl StaticViewport {
    pub fn new(bounds: GeoBoundingBox, zoom: f64) -> Self {
        Self { bounds, zoom }
    }
}

impl ViewportSource for StaticViewport {
    fn bounds(&self) -> GeoBoundingBox {
        self.bounds
    }

    fn zoom(&self) -> f64 {
        self.zoom
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconstructionOutcome {
    Installed {
        generation: u64,
        mesh: MeshId,
        vertices: usize,
        triangles: usize,
    },
    /// A newer reconstruction started first; nothing was installed.
    Superseded { generation: u64 },
}

#[derive(Debug)]
struct SceneSlot<S> {
    scene: S,
    terrain: ActiveTerrain,
}

pub struct TerrainSession<S> {
    fetcher: TileFetcher,
    strategy: TerrainStrategy,
    slot: Mutex<SceneSlot<S>>,
    generation: AtomicU64,
}

impl<S: SceneOwner> TerrainSession<S> {
    pub fn new(fetcher: TileFetcher, scene: S) -> Self {
        Self {
            fetcher,
            strategy: TerrainStrategy::default(),
            slot: Mutex::new(SceneSlot {
                scene,
                terrain: ActiveTerrain::new(),
            }),
            generation: AtomicU64::new(0),
        }
    }

    pub fn with_strategy(mut self, strategy: TerrainStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn fetcher(&self) -> &TileFetcher {
        &self.fetcher
    }

    /// Latest generation handed out.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Supersede whatever is in flight. Returns the new generation.
    pub fn cancel(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation() == generation
    }

    /// Rebuild terrain for the viewport, sampling one zoom level finer than
    /// the map view.
    pub async fn reconstruct(
        &self,
        viewport: &dyn ViewportSource,
    ) -> Result<ReconstructionOutcome, TerrainError> {
        let bounds = viewport.bounds();
        let z = terrain_zoom(viewport.zoom());
        self.reconstruct_bounds(&bounds, z).await
    }

    /// Rebuild terrain for `bbox` at tile zoom `z` and install it.
    ///
    /// On error the previously installed terrain stays in place. A run that
    /// was superseded reports `Superseded` even if its fetch failed.
    pub async fn reconstruct_bounds(
        &self,
        bbox: &GeoBoundingBox,
        z: u8,
    ) -> Result<ReconstructionOutcome, TerrainError> {
        bbox.validate()?;
        if z > MAX_ZOOM {
            return Err(TerrainError::Zoom { z, max: MAX_ZOOM });
        }
        let generation = self.cancel();
        info!(generation, z, ?bbox, "terrain reconstruction started");

        let prepared = self.strategy.prepare(&self.fetcher, bbox, z).await;
        if !self.is_current(generation) {
            debug!(generation, failed = prepared.is_err(), "superseded after fetch");
            return Ok(ReconstructionOutcome::Superseded { generation });
        }
        let prepared = prepared?;

        let build = prepared.build()?;
        let vertices = build.mesh.vertex_count();
        let triangles = build.mesh.triangle_count();

        let mut slot = self.slot.lock();
        if !self.is_current(generation) {
            debug!(generation, "superseded before install");
            return Ok(ReconstructionOutcome::Superseded { generation });
        }
        let SceneSlot { scene, terrain } = &mut *slot;
        let mesh = terrain.replace(scene, build.mesh, build.material, build.camera);
        info!(generation, vertices, triangles, "terrain reconstruction finished");

        Ok(ReconstructionOutcome::Installed {
            generation,
            mesh,
            vertices,
            triangles,
        })
    }

    /// Run `f` against the scene under the session lock.
    pub fn with_scene<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.slot.lock().scene)
    }

    pub fn active_mesh(&self) -> Option<MeshId> {
        self.slot.lock().terrain.current()
    }

    /// Cancel in-flight work and remove the installed terrain.
    pub fn teardown(&self) -> bool {
        self.cancel();
        let mut slot = self.slot.lock();
        let SceneSlot { scene, terrain } = &mut *slot;
        terrain.clear(scene)
    }

    pub fn into_scene(self) -> S {
        self.slot.into_inner().scene
    }
}
