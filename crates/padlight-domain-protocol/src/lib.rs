pub mod coords;
pub mod family;
pub mod framing;
pub mod identify;
pub mod input;
pub mod mf64;
pub mod optimizer;

pub use coords::*;
pub use family::*;
pub use framing::*;
pub use identify::*;
pub use input::*;
pub use optimizer::*;
