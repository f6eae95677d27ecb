//! Observability on top of the circuit graph: probes, provenance and static export.
//!
//! Nothing in here changes simulated values.
mod export;
mod probe;
mod provenance;
pub use export::*;
pub use probe::*;
pub use provenance::*;

use std::sync::atomic::{AtomicBool, Ordering};

static DEBUG_MODE: AtomicBool = AtomicBool::new(false);

/// Turns the process wide debug mode on or off.
///
/// While on, wires created by [ProbeRegistry::probe] capture their provenance even if the
/// block's [ProvenanceTracker] is disabled. It has no effect on simulation.
pub fn set_debug_mode(on: bool) {
    DEBUG_MODE.store(on, Ordering::SeqCst)
}

/// Returns the current debug mode, false unless turned on by [set_debug_mode].
pub fn debug_mode() -> bool {
    DEBUG_MODE.load(Ordering::SeqCst)
}
