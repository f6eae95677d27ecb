use super::debug_mode;
use crate::error::{DebugError, StructuralError};
use crate::graph::{Block, Op, WireIndex, WireKind};

/// An observation tap on a wire.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Probe {
    name: String,
    target: WireIndex,
    tap: WireIndex,
}

impl Probe {
    /// Name of the tap wire, which is also its key in a trace.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The observed wire.
    pub fn target(&self) -> WireIndex {
        self.target
    }

    /// The output wire carrying the value of the target.
    pub fn tap(&self) -> WireIndex {
        self.tap
    }
}

/// Inserts and removes probes.
///
/// A probe is an [output](WireKind::Output) wire driven by the probed wire, so it shows up
/// in the outputs of every step and in the default trace. Probing never changes the value
/// of any other wire.
///
/// # Example
/// ```
/// # use wirenet::{Block, Evaluator, ProbeRegistry, Tracer};
/// # fn main() -> Result<(), wirenet::Error> {
/// let mut b = Block::new();
/// let a = b.input("a", 4)?;
/// let c = b.input("c", 4)?;
/// let x = b.xor(a, c)?;
/// let y = b.and(x, c)?;
/// b.output("y", y)?;
///
/// let mut probes = ProbeRegistry::new();
/// let same = probes.probe(&mut b, x, Some("x"))?;
/// assert_eq!(same, x);
///
/// let mut tracer = Tracer::new(Evaluator::new(&b)?);
/// tracer.step(vec![("a", 0b1100), ("c", 0b1010)])?;
/// assert_eq!(tracer.trace()["x"], [0b0110]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ProbeRegistry {
    probes: Vec<Probe>,
    warnings: Vec<DebugError>,
    auto_names: usize,
}

impl ProbeRegistry {
    pub fn new() -> Self {
        Default::default()
    }

    /// Taps `wire` and returns it unchanged.
    ///
    /// The tap is called `name`, or `(Probe-N: wire_name)` if [None]. A name already
    /// used in `block` gets a `_K` suffix, which is reported as a [DebugError] warning.
    /// While [debug mode](super::set_debug_mode) is on the tap records its provenance.
    pub fn probe(
        &mut self,
        block: &mut Block,
        wire: WireIndex,
        name: Option<&str>,
    ) -> Result<WireIndex, StructuralError> {
        let (target_name, width) = match block.wire(wire) {
            Some(w) => (w.name().to_owned(), w.width()),
            None => return Err(StructuralError::ForeignWire { wire }),
        };
        let requested = match name {
            Some(name) => name.to_owned(),
            None => {
                let name = format!("(Probe-{}: {})", self.auto_names, target_name);
                self.auto_names += 1;
                name
            }
        };

        let mut assigned = requested.clone();
        let mut k = 1;
        while block.wire_by_name(&assigned).is_some() {
            assigned = format!("{}_{}", requested, k);
            k += 1;
        }
        if assigned != requested {
            tracing::warn!(requested = %requested, assigned = %assigned, "probe name collision");
            self.warnings.push(DebugError::ProbeNameCollision {
                requested,
                assigned: assigned.clone(),
            });
        }

        let tap = block.create_wire(width, WireKind::Output, Some(&assigned), None, debug_mode())?;
        if let Err(e) = block.add_net(Op::Wire, &[wire], tap) {
            block.remove_wire(tap)?;
            return Err(e);
        }
        tracing::debug!(probe = %assigned, target = %target_name, "inserted probe");

        self.probes.push(Probe {
            name: assigned,
            target: wire,
            tap,
        });
        Ok(wire)
    }

    /// Removes every tap inserted by this registry from `block`.
    ///
    /// Fails if something else was connected to a tap, the remaining probes are kept.
    pub fn remove_all(&mut self, block: &mut Block) -> Result<(), StructuralError> {
        while let Some(probe) = self.probes.last() {
            if block.wire(probe.tap).is_some() {
                block.remove_wire(probe.tap)?;
            }
            self.probes.pop();
        }
        Ok(())
    }

    /// Returns the inserted probes in insertion order.
    pub fn probes(&self) -> &[Probe] {
        &self.probes
    }

    /// Returns the conditions reported while probing.
    pub fn warnings(&self) -> &[DebugError] {
        &self.warnings
    }
}
