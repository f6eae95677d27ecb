mod bits;
mod slab;
pub use bits::*;
pub use slab::{Iter, Slab, SlabIndex};
