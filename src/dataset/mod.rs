pub mod cache;
pub mod loader;
pub mod table;

pub use cache::*;
pub use loader::*;
pub use table::*;
