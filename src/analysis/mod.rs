pub mod filters;
pub mod frame;
pub mod genres;
pub mod stats;
pub mod views;

pub use filters::*;
pub use genres::*;
pub use views::*;
