pub mod macros;
pub mod program;
pub mod time;

pub use program::*;
pub use time::*;
