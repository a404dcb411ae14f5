pub mod error;
pub mod heights;
pub mod layer;
pub mod raster;
pub mod session;
pub mod terrain;

pub use error::*;
pub use heights::*;
pub use layer::*;
pub use raster::*;
pub use session::*;
pub use terrain::*;
