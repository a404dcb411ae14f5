use foundation::handles::Handle;

/// Mesh living in a scene. Stale ids never alias a newer mesh.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct MeshId(pub Handle);

impl MeshId {
    pub fn index(&self) -> u32 {
        self.0.index()
    }

    pub fn generation(&self) -> u32 {
        self.0.generation()
    }
}
