//! Error types for building, simulating and inspecting circuits.
//!
//! Every failure is returned as a value. Structural errors are raised before the
//! offending mutation is committed, simulation errors before any state advances.

use thiserror::Error;

use crate::data_structures::MAX_WIDTH;
use crate::graph::{NetIndex, Op, WireIndex, WireKind};

/// Violations of the structural invariants of a [Block](crate::graph::Block).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("duplicate wire name `{name}`")]
    DuplicateName { name: String },

    #[error("wire `{name}` has invalid bit width {width}, widths must be in 1..={max}", max = MAX_WIDTH)]
    InvalidWidth { name: String, width: usize },

    #[error("constant value {value} does not fit in {width} bits")]
    ConstantOverflow { value: u128, width: usize },

    #[error("wire {wire} does not belong to this block")]
    ForeignWire { wire: WireIndex },

    #[error("{op} expects {expected} inputs, got {actual}")]
    Arity {
        op: Op,
        expected: &'static str,
        actual: usize,
    },

    #[error("{op} operands have incompatible widths {widths:?}: {rule}")]
    OperandWidth {
        op: Op,
        widths: Vec<usize>,
        rule: &'static str,
    },

    #[error("{op} produces {expected} bits but output wire `{wire}` is {actual} bits wide")]
    WidthMismatch {
        op: Op,
        wire: String,
        expected: usize,
        actual: usize,
    },

    #[error("select bit {bit} is out of range for a {width} bit wire")]
    SelectOutOfRange { bit: usize, width: usize },

    #[error("wire `{wire}` is already driven by net {net}")]
    AlreadyDriven { wire: String, net: NetIndex },

    #[error("{kind} wire `{wire}` cannot be driven by {op}")]
    InvalidDriver { wire: String, kind: WireKind, op: Op },

    #[error("wire `{wire}` is still read by net {net}")]
    StillReferenced { wire: String, net: NetIndex },

    #[error("no wire named `{name}`")]
    UnknownWire { name: String },

    #[error("{kind} wire `{wire}` has no driving net")]
    Undriven { wire: String, kind: WireKind },

    #[error("net {net} references missing wire {wire}")]
    DanglingReference { net: NetIndex, wire: WireIndex },

    #[error("name table entry `{name}` is inconsistent with the wire set")]
    NameTable { name: String },

    #[error("combinational cycle through wire `{wire}`")]
    CombinationalCycle { wire: String },
}

/// Failures of a single simulation step, none of which advance any state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulationError {
    #[error("no value supplied for input `{name}`")]
    MissingInput { name: String },

    #[error("`{name}` is not an input wire")]
    UnknownInput { name: String },

    #[error("value {value} for `{name}` exceeds its {width} bit width")]
    InputOutOfRange {
        name: String,
        value: u128,
        width: usize,
    },

    #[error("no wire named `{name}` in the simulated block")]
    UnknownWire { name: String },

    #[error("`{name}` is not a register")]
    NotARegister { name: String },
}

/// Recoverable debugging conditions, reported as warnings and never returned as errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DebugError {
    #[error("probe name `{requested}` already in use, using `{assigned}` instead")]
    ProbeNameCollision { requested: String, assigned: String },
}

/// Failures while exporting a block.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("dead wire elimination must run before export")]
    NotEliminated,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Any error this crate returns.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error(transparent)]
    Simulation(#[from] SimulationError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
