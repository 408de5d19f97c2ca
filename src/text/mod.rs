pub mod normalize;
pub mod preamble;
pub mod similarity;

pub use normalize::*;
pub use preamble::*;
pub use similarity::*;
