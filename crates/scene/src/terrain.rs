//! The single terrain slot of a scene.

use tracing::info;

use crate::camera::CameraPose;
use crate::entity::MeshId;
use crate::material::Material;
use crate::mesh::TerrainMesh;
use crate::world::SceneOwner;

/// Tracks the terrain mesh currently installed in a scene.
///
/// Installing a terrain disposes the previous one first, so at most one
/// terrain mesh and material are live at any time.
#[derive(Debug, Default)]
pub struct ActiveTerrain {
    current: Option<MeshId>,
}

impl ActiveTerrain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<MeshId> {
        self.current
    }

    pub fn replace<S: SceneOwner + ?Sized>(
        &mut self,
        scene: &mut S,
        mesh: TerrainMesh,
        material: Material,
        camera: CameraPose,
    ) -> MeshId {
        self.clear(scene);
        let vertices = mesh.vertex_count();
        let triangles = mesh.triangle_count();
        let id = scene.add_mesh(mesh, material);
        scene.set_camera_position(camera.position);
        scene.set_camera_target(camera.target);
        self.current = Some(id);
        info!(vertices, triangles, "terrain installed");
        id
    }

    /// Dispose the installed terrain, if any.
    pub fn clear<S: SceneOwner + ?Sized>(&mut self, scene: &mut S) -> bool {
        match self.current.take() {
            Some(id) => scene.dispose_mesh(id),
            None => false,
        }
    }
}
