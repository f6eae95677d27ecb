mod block;
mod net;
mod optimizations;
mod wire;
pub use block::*;
pub use net::*;
pub use wire::*;
