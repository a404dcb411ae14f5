use foundation::handles::Handle;
use foundation::math::Vec3;
use tracing::debug;

use crate::camera::CameraPose;
use crate::entity::MeshId;
use crate::material::Material;
use crate::mesh::TerrainMesh;

/// The 3D scene as seen by terrain reconstruction.
///
/// A renderer implements this to receive finished meshes; [`World`] is the
/// in-memory implementation.
pub trait SceneOwner {
    fn add_mesh(&mut self, mesh: TerrainMesh, material: Material) -> MeshId;

    /// Removes the mesh and its material. `false` if `id` is not live.
    fn dispose_mesh(&mut self, id: MeshId) -> bool;

    fn set_camera_position(&mut self, position: Vec3);

    fn set_camera_target(&mut self, _target: Vec3) {}

    fn mesh_count(&self) -> usize;
}

#[derive(Debug)]
pub struct SceneMesh {
    pub mesh: TerrainMesh,
    pub material: Material,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    entry: Option<SceneMesh>,
}

#[derive(Debug, Default)]
pub struct World {
    slots: Vec<Slot>,
    free: Vec<u32>,
    camera: CameraPose,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn camera(&self) -> &CameraPose {
        &self.camera
    }

    pub fn mesh(&self, id: MeshId) -> Option<&SceneMesh> {
        self.slots
            .get(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.entry.as_ref())
    }

    pub fn meshes(&self) -> impl Iterator<Item = (MeshId, &SceneMesh)> + '_ {
        self.slots.iter().enumerate().filter_map(|(idx, slot)| {
            let entry = slot.entry.as_ref()?;
            Some((MeshId(Handle::new(idx as u32, slot.generation)), entry))
        })
    }
}

impl SceneOwner for World {
    fn add_mesh(&mut self, mesh: TerrainMesh, material: Material) -> MeshId {
        let entry = Some(SceneMesh { mesh, material });
        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index as usize].entry = entry;
                index
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    entry,
                });
                (self.slots.len() - 1) as u32
            }
        };
        let id = MeshId(Handle::new(index, self.slots[index as usize].generation));
        debug!(index, generation = id.generation(), "mesh added");
        id
    }

    fn dispose_mesh(&mut self, id: MeshId) -> bool {
        let Some(slot) = self.slots.get_mut(id.index() as usize) else {
            return false;
        };
        if slot.generation != id.generation() || slot.entry.is_none() {
            return false;
        }
        slot.entry = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index());
        debug!(index = id.index(), "mesh disposed");
        true
    }

    fn set_camera_position(&mut self, position: Vec3) {
        self.camera.position = position;
    }

    fn set_camera_target(&mut self, target: Vec3) {
        self.camera.target = target;
    }

    fn mesh_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.entry.is_some()).count()
    }
}
