pub mod fetch;
pub mod source;
pub mod stitch;

pub use fetch::*;
pub use source::*;
pub use stitch::*;
