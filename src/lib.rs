//! Build word level circuits out of typed wires and nets, simulate them cycle by cycle,
//! and look inside with probes, provenance, waveforms and graph export.
//!
//! ```
//! # use wirenet::{Block, Evaluator, ProbeRegistry, Tracer};
//! # fn main() -> Result<(), wirenet::Error> {
//! let mut b = Block::new();
//! let in1 = b.input("in1", 8)?;
//! let in2 = b.input("in2", 8)?;
//! let add1 = b.add(in1, in2)?;
//! let add2 = b.add(add1, in2)?;
//! b.output("out", add2)?;
//!
//! let mut probes = ProbeRegistry::new();
//! probes.probe(&mut b, add1, Some("debug_out"))?;
//!
//! let mut tracer = Tracer::new(Evaluator::new(&b)?);
//! let outputs = tracer.step(vec![("in1", 5), ("in2", 7)])?;
//! assert_eq!(outputs["out"], 19);
//! assert_eq!(tracer.trace()["debug_out"][0], 12);
//! # Ok(())
//! # }
//! ```
pub mod data_structures;
pub mod debug;
pub mod error;
pub mod graph;
pub mod sim;
extern crate concat_idents;
pub use debug::*;
pub use error::*;
pub use graph::*;
pub use sim::*;
