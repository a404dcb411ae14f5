pub mod bounds;
pub mod handles;
pub mod math;
pub mod tiles;

pub use bounds::*;
pub use handles::*;
pub use tiles::*;
