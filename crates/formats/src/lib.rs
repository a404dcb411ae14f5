pub mod raster;
pub mod terrain_rgb;

pub use raster::*;
pub use terrain_rgb::*;
