use crate::data_structures::SlabIndex;
use crate::debug::Frame;

use indexmap::IndexSet;
use std::fmt::{self, Display, Formatter};
use strum_macros::{Display as StrumDisplay, EnumIter};

/// Identity of a wire in a [Block](super::Block).
///
/// Indexes are never reused by a block and carry the identity of the block that
/// created them, so using a handle with the wrong block is detected instead of
/// silently aliasing another wire.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug, Ord, PartialOrd)]
pub struct WireIndex {
    pub(super) block: u32,
    pub(super) idx: usize,
}

/// Identity of a net in a [Block](super::Block).
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug, Ord, PartialOrd)]
pub struct NetIndex {
    pub(super) block: u32,
    pub(super) idx: usize,
}

macro_rules! index_conversions {
    ($ty:ident, $prefix:expr) => {
        impl $ty {
            pub(super) fn new(block: u32, idx: SlabIndex) -> Self {
                Self {
                    block,
                    idx: idx.i_actually_really_know_what_i_am_doing_and_i_want_the_inner_usize(),
                }
            }

            pub(super) fn slab(&self) -> SlabIndex {
                SlabIndex::i_actually_really_know_what_i_am_doing_and_i_want_to_construct_from_usize(
                    self.idx,
                )
            }

            /// Returns the position of this item in creation order within its block.
            pub fn id(&self) -> usize {
                self.idx
            }
        }
        impl Display for $ty {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $prefix, self.idx)
            }
        }
    };
}
index_conversions!(WireIndex, "w");
index_conversions!(NetIndex, "n");

/// The role a wire plays in the circuit.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, StrumDisplay, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum WireKind {
    /// Driven from outside on every simulation step.
    Input,
    /// Observable result of the circuit.
    Output,
    /// Holds state across cycles, driven by a register transfer net.
    Register,
    /// Fixed value, never driven.
    Constant,
    /// Anything else.
    Intermediate,
}

impl WireKind {
    /// Returns true if wires of this kind must not be driven by a net.
    pub fn is_source(&self) -> bool {
        matches!(self, WireKind::Input | WireKind::Constant)
    }
}

/// A typed signal carrier.
#[derive(Debug, Clone)]
pub struct Wire {
    pub(super) name: String,
    pub(super) width: usize,
    pub(super) kind: WireKind,
    pub(super) value: Option<u128>,
    pub(super) provenance: Option<Vec<Frame>>,
    pub(super) driver: Option<NetIndex>,
    pub(super) readers: IndexSet<NetIndex>,
}

impl Wire {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn kind(&self) -> WireKind {
        self.kind
    }

    /// Value of a [WireKind::Constant] wire.
    pub fn value(&self) -> Option<u128> {
        self.value
    }

    /// The net producing this wire, if any.
    pub fn driver(&self) -> Option<NetIndex> {
        self.driver
    }

    /// Nets reading this wire, in the order they were connected.
    pub fn readers(&self) -> impl Iterator<Item = NetIndex> + '_ {
        self.readers.iter().copied()
    }

    pub(super) fn provenance(&self) -> &[Frame] {
        self.provenance.as_deref().unwrap_or(&[])
    }
}
