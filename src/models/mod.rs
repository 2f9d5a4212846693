pub mod comment;
pub mod membership;
pub mod thread;
pub mod vote;

pub use comment::*;
pub use membership::*;
pub use thread::*;
pub use vote::*;
