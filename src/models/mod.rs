pub mod corpus;
pub mod match_result;
pub mod segment;
pub mod window;

pub use corpus::*;
pub use match_result::*;
pub use segment::*;
pub use window::*;
