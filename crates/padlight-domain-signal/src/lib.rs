pub mod color;
pub mod pixel;
pub mod screen;
pub mod signal;

pub use color::*;
pub use pixel::*;
pub use screen::*;
pub use signal::*;
