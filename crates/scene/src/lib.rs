pub mod camera;
pub mod entity;
pub mod material;
pub mod mesh;
pub mod terrain;
pub mod world;

pub use camera::*;
pub use entity::*;
pub use material::*;
pub use mesh::*;
pub use terrain::*;
pub use world::*;
