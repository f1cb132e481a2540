pub mod advisory;
pub mod app;
pub mod device;
pub mod diagnostics;
pub mod heaven;
pub mod ipc;
pub mod outbound;
pub mod pipeline;
pub mod registry;
pub mod router;
pub mod timers;

pub use advisory::*;
pub use app::*;
pub use device::*;
pub use diagnostics::*;
pub use heaven::*;
pub use ipc::*;
pub use outbound::*;
pub use pipeline::*;
pub use registry::*;
pub use router::*;
pub use timers::*;
