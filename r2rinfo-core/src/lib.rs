pub mod error;
pub mod header;
pub mod image;
pub mod reader;
pub mod sections;

pub use error::*;
pub use header::*;
pub use image::*;
pub use reader::*;
pub use sections::*;
