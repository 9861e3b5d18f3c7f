mod read;
pub mod sequence;

pub use read::*;
