//! Cycle based simulation of a [Block](crate::graph::Block).
mod evaluator;
mod tracer;
pub use evaluator::*;
pub use tracer::*;
