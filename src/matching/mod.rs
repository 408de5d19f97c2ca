pub mod engine;
pub mod index;
pub mod rank;
pub mod stream;

pub use engine::*;
pub use index::*;
pub use rank::*;
pub use stream::*;
