use super::net::*;
use super::optimizations::*;
use super::wire::*;
use crate::data_structures::{fits, Slab, MAX_WIDTH};
use crate::debug::{CaptureHook, Frame, ProvenanceTracker};
use crate::error::StructuralError;

use casey::pascal;
use concat_idents::concat_idents;
use indexmap::IndexMap;
use petgraph::graph::NodeIndex;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::ops::Range;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_BLOCK_ID: AtomicU32 = AtomicU32::new(0);

fn next_block_id() -> u32 {
    NEXT_BLOCK_ID.fetch_add(1, Ordering::Relaxed)
}

/// Creates name and name_named constructors for every two operand [Op].
/// The constructors create a new intermediate wire of the width the [Op] demands.
macro_rules! binary_ops {
    ($name:ident,$($rest:ident),*) => {
        binary_ops!($name);
        binary_ops!($($rest),*);
    };
    ($name:ident) => {
        #[doc = concat!(
            "Returns a new wire driven by `", stringify!($name), "` of `a` and `b`.\n\n",
            "The width of the wire follows [Op::width_rule]."
        )]
        pub fn $name(&mut self, a: WireIndex, b: WireIndex) -> Result<WireIndex, StructuralError> {
            self.op_wire({ use Op::*; pascal!($name) }, &[a, b], None)
        }

        concat_idents!(named = $name, _, named {
            /// Same as the unnamed constructor, naming the new wire `name`.
            pub fn named(
                &mut self,
                a: WireIndex,
                b: WireIndex,
                name: &str,
            ) -> Result<WireIndex, StructuralError> {
                self.op_wire({ use Op::*; pascal!($name) }, &[a, b], Some(name))
            }
        });
    };
}

/// A circuit: the set of [Wire]s, the [Net]s connecting them and a table of wire names.
///
/// Every operation that mutates the block validates before committing, a rejected
/// mutation leaves the block as it was.
///
/// Wires that are neither [inputs](WireKind::Input) nor [constants](WireKind::Constant)
/// must be the output of exactly one net. [Register](WireKind::Register) wires are driven by
/// [Op::Register] nets, which delay their input by one cycle and are the only way to
/// close a loop in the graph.
///
/// # Examples
/// Simple arithmetic.
/// ```
/// # use wirenet::{Block, Evaluator};
/// # fn main() -> Result<(), wirenet::Error> {
/// let mut b = Block::new();
///
/// let a = b.input("a", 8)?;
/// let c = b.input("c", 8)?;
///
/// // 8 bit + 8 bit is 9 bits, no carry is lost.
/// let sum = b.add(a, c)?;
/// assert_eq!(b.wire(sum).unwrap().width(), 9);
/// b.output("sum", sum)?;
///
/// let mut sim = Evaluator::new(&b)?;
/// let outputs = sim.step(vec![("a", 200), ("c", 100)])?;
/// assert_eq!(outputs["sum"], 300);
/// # Ok(())
/// # }
/// ```
///
/// A counter, the register closes the loop.
/// ```
/// # use wirenet::{Block, Evaluator};
/// # fn main() -> Result<(), wirenet::Error> {
/// let mut b = Block::new();
///
/// let count = b.register("count", 4)?;
/// let one = b.constant(1, 4)?;
/// let next = b.add(count, one)?;
/// let next = b.truncate(next, 4)?;
/// b.set_next(count, next)?;
/// b.output("out", count)?;
///
/// let mut sim = Evaluator::new(&b)?;
/// for expected in 0..20u128 {
///     let outputs = sim.step(Vec::new())?;
///     assert_eq!(outputs["out"], expected % 16);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Block {
    id: u32,
    pub(super) wires: Slab<Wire>,
    pub(super) nets: Slab<Net>,
    names: IndexMap<String, WireIndex>,
    metadata: HashMap<WireIndex, IndexMap<String, String>>,
    provenance: ProvenanceTracker,
    tmp_names: usize,
    pub(super) eliminated: bool,
}

impl Block {
    /// Returns a new empty [Block].
    pub fn new() -> Block {
        Block {
            id: next_block_id(),
            wires: Slab::new(),
            nets: Slab::new(),
            names: Default::default(),
            metadata: Default::default(),
            provenance: Default::default(),
            tmp_names: 0,
            eliminated: false,
        }
    }

    /// Empties the block to start a new design.
    ///
    /// Handles to the old design become foreign to the block. Provenance settings are kept.
    pub fn reset(&mut self) {
        self.id = next_block_id();
        self.wires.clear();
        self.nets.clear();
        self.names.clear();
        self.metadata.clear();
        self.tmp_names = 0;
        self.eliminated = false;
    }

    /// Fails unless `wire` belongs to this block and hasn't been removed.
    fn owns(&self, wire: WireIndex) -> Result<(), StructuralError> {
        if wire.block == self.id && self.wires.contains(wire.slab()) {
            Ok(())
        } else {
            Err(StructuralError::ForeignWire { wire })
        }
    }

    /// Returns a name nobody uses, in the tmpN sequence.
    fn tmp_name(&mut self) -> String {
        loop {
            let name = format!("tmp{}", self.tmp_names);
            self.tmp_names += 1;
            if !self.names.contains_key(&name) {
                return name;
            }
        }
    }

    pub(crate) fn create_wire(
        &mut self,
        width: usize,
        kind: WireKind,
        name: Option<&str>,
        value: Option<u128>,
        force_provenance: bool,
    ) -> Result<WireIndex, StructuralError> {
        let name = match name {
            Some(name) if self.names.contains_key(name) => {
                return Err(StructuralError::DuplicateName { name: name.into() })
            }
            Some(name) => name.to_owned(),
            None => self.tmp_name(),
        };
        if width == 0 || width > MAX_WIDTH {
            return Err(StructuralError::InvalidWidth { name, width });
        }
        if let Some(value) = value {
            if !fits(value, width) {
                return Err(StructuralError::ConstantOverflow { value, width });
            }
        }

        let provenance = self.provenance.capture(force_provenance);
        let idx = WireIndex::new(
            self.id,
            self.wires.insert(Wire {
                name: name.clone(),
                width,
                kind,
                value,
                provenance,
                driver: None,
                readers: Default::default(),
            }),
        );
        self.names.insert(name, idx);
        self.eliminated = false;
        Ok(idx)
    }

    /// Returns a new wire of `width` bits and `kind`.
    ///
    /// If `name` is [None] a unique name is generated.
    /// Constants should be created with [Block::add_const], they carry a value.
    pub fn add_wire(
        &mut self,
        width: usize,
        kind: WireKind,
        name: Option<&str>,
    ) -> Result<WireIndex, StructuralError> {
        let value = if kind == WireKind::Constant { Some(0) } else { None };
        self.create_wire(width, kind, name, value, false)
    }

    /// Returns a new [constant](WireKind::Constant) wire holding `value`.
    pub fn add_const(&mut self, value: u128, width: usize) -> Result<WireIndex, StructuralError> {
        let name = format!("const{}_{}", self.wires.next_index(), value);
        let name = if self.names.contains_key(&name) {
            None
        } else {
            Some(name.as_str())
        };
        self.create_wire(width, WireKind::Constant, name, Some(value), false)
    }

    /// Connects `inputs` to `output` through a new net performing `op`.
    ///
    /// Fails if any wire is foreign to the block, if the widths break the width rule of
    /// `op`, if `output` is already driven, or if `output` can't be driven by `op`:
    /// inputs and constants can't be driven at all and registers are driven exactly by
    /// [Op::Register] nets.
    pub fn add_net(
        &mut self,
        op: Op,
        inputs: &[WireIndex],
        output: WireIndex,
    ) -> Result<NetIndex, StructuralError> {
        let mut widths: SmallVec<[usize; NET_INPUTS_TINYVEC_SIZE]> = SmallVec::new();
        for input in inputs {
            self.owns(*input)?;
            widths.push(self.get(*input).width);
        }
        self.owns(output)?;
        let expected = op.width_rule(&widths)?;

        let out = self.get(output);
        if out.kind.is_source() || (out.kind == WireKind::Register) != op.is_register() {
            return Err(StructuralError::InvalidDriver {
                wire: out.name.clone(),
                kind: out.kind,
                op,
            });
        }
        if let Some(net) = out.driver {
            return Err(StructuralError::AlreadyDriven {
                wire: out.name.clone(),
                net,
            });
        }
        let width_ok = match op {
            Op::Wire => out.width >= expected,
            _ => out.width == expected,
        };
        if !width_ok {
            return Err(StructuralError::WidthMismatch {
                op,
                wire: out.name.clone(),
                expected,
                actual: out.width,
            });
        }

        let net = NetIndex::new(
            self.id,
            self.nets.insert(Net {
                op,
                inputs: inputs.iter().copied().collect(),
                output,
            }),
        );
        self.get_mut(output).driver = Some(net);
        for input in inputs {
            self.get_mut(*input).readers.insert(net);
        }
        self.eliminated = false;
        Ok(net)
    }

    /// Removes `wire` and the net driving it.
    ///
    /// Fails if any net still reads `wire`.
    pub fn remove_wire(&mut self, wire: WireIndex) -> Result<(), StructuralError> {
        self.owns(wire)?;
        let w = self.get(wire);
        if let Some(&net) = w.readers.iter().next() {
            return Err(StructuralError::StillReferenced {
                wire: w.name.clone(),
                net,
            });
        }
        if let Some(net) = w.driver {
            self.discard_net(net);
        }
        self.discard_wire(wire);
        self.eliminated = false;
        Ok(())
    }

    /// Removes `net` and its edges without any checks, the output is left undriven.
    pub(super) fn discard_net(&mut self, net: NetIndex) {
        if let Some(removed) = self.nets.remove(net.slab()) {
            for input in removed.inputs {
                if let Some(w) = self.wires.get_mut(input.slab()) {
                    w.readers.shift_remove(&net);
                }
            }
            if let Some(w) = self.wires.get_mut(removed.output.slab()) {
                w.driver = None;
            }
        }
    }

    /// Removes `wire`, its name and its metadata without any checks.
    pub(super) fn discard_wire(&mut self, wire: WireIndex) {
        if let Some(removed) = self.wires.remove(wire.slab()) {
            self.names.shift_remove(&removed.name);
            self.metadata.remove(&wire);
        }
    }

    /// Verifies the structural invariants of the block and returns the first violation.
    ///
    /// Checks, in order: the name table matches the wire set, nets only reference live
    /// wires, every wire that needs a driver has one, and the combinational part of
    /// the graph is acyclic. The result only depends on the contents of the block, so
    /// calling it twice without mutating returns the same result.
    pub fn sanity_check(&self) -> Result<(), StructuralError> {
        for (name, wire) in &self.names {
            match self.wire(*wire) {
                Some(w) if w.name == *name => {}
                _ => return Err(StructuralError::NameTable { name: name.clone() }),
            }
        }
        for (_, wire) in self.wires.iter() {
            if !self.names.contains_key(&wire.name) {
                return Err(StructuralError::NameTable {
                    name: wire.name.clone(),
                });
            }
        }

        for (idx, net) in self.nets.iter() {
            let idx = NetIndex::new(self.id, idx);
            for wire in net.inputs.iter().chain(std::iter::once(&net.output)) {
                if self.owns(*wire).is_err() {
                    return Err(StructuralError::DanglingReference {
                        net: idx,
                        wire: *wire,
                    });
                }
            }
        }

        for (_, wire) in self.wires.iter() {
            if !wire.kind.is_source() && wire.driver.is_none() {
                return Err(StructuralError::Undriven {
                    wire: wire.name.clone(),
                    kind: wire.kind,
                });
            }
        }

        self.combinational_order().map(|_| ())
    }

    /// Returns the combinational nets in an order where every net comes after the nets
    /// producing its inputs. Register nets are left out, they only read values from the
    /// current cycle to produce the next one.
    pub(crate) fn combinational_order(&self) -> Result<Vec<NetIndex>, StructuralError> {
        let mut graph = petgraph::Graph::<WireIndex, ()>::new();
        let mut index = HashMap::<WireIndex, NodeIndex>::new();
        for (i, _) in self.wires.iter() {
            let wire = WireIndex::new(self.id, i);
            index.insert(wire, graph.add_node(wire));
        }
        for (_, net) in self.nets.iter() {
            if net.op.is_register() {
                continue;
            }
            if net.inputs.contains(&net.output) {
                return Err(StructuralError::CombinationalCycle {
                    wire: self.get(net.output).name.clone(),
                });
            }
            for input in &net.inputs {
                graph.add_edge(index[input], index[&net.output], ());
            }
        }

        let order = petgraph::algo::toposort(&graph, None).map_err(|cycle| {
            StructuralError::CombinationalCycle {
                wire: self.get(graph[cycle.node_id()]).name.clone(),
            }
        })?;
        Ok(order
            .into_iter()
            .filter_map(|node| {
                let net = self.get(graph[node]).driver?;
                if self.get_net(net).op.is_register() {
                    None
                } else {
                    Some(net)
                }
            })
            .collect())
    }

    /// Returns an immutable reference to the [Wire] at `idx`.
    ///
    /// # Panics
    ///
    /// Will panic if `idx` has been removed or belongs to another block.
    #[inline(always)]
    pub(super) fn get(&self, idx: WireIndex) -> &Wire {
        self.wires.get(idx.slab()).unwrap()
    }

    /// Returns a mutable reference to the [Wire] at `idx`.
    ///
    /// # Panics
    ///
    /// Will panic if `idx` has been removed or belongs to another block.
    #[inline(always)]
    pub(super) fn get_mut(&mut self, idx: WireIndex) -> &mut Wire {
        self.wires.get_mut(idx.slab()).unwrap()
    }

    #[inline(always)]
    pub(super) fn get_net(&self, idx: NetIndex) -> &Net {
        self.nets.get(idx.slab()).unwrap()
    }

    /// Returns the [Wire] at `wire`, [None] if it was removed or belongs to another block.
    pub fn wire(&self, wire: WireIndex) -> Option<&Wire> {
        self.owns(wire).ok().map(|_| self.get(wire))
    }

    /// Returns the [Net] at `net`, [None] if it was removed or belongs to another block.
    pub fn net(&self, net: NetIndex) -> Option<&Net> {
        if net.block != self.id {
            return None;
        }
        self.nets.get(net.slab())
    }

    /// Returns the wire called `name`.
    pub fn wire_by_name(&self, name: &str) -> Option<WireIndex> {
        self.names.get(name).copied()
    }

    /// Returns all wires in creation order.
    pub fn wires(&self) -> impl Iterator<Item = (WireIndex, &Wire)> + '_ {
        let id = self.id;
        self.wires.iter().map(move |(i, w)| (WireIndex::new(id, i), w))
    }

    /// Returns all nets in creation order.
    pub fn nets(&self) -> impl Iterator<Item = (NetIndex, &Net)> + '_ {
        let id = self.id;
        self.nets.iter().map(move |(i, n)| (NetIndex::new(id, i), n))
    }

    /// Returns the net driving `wire`.
    pub fn producer(&self, wire: WireIndex) -> Option<NetIndex> {
        self.wire(wire)?.driver
    }

    /// Returns the nets reading `wire`.
    pub fn consumers(&self, wire: WireIndex) -> Vec<NetIndex> {
        self.wire(wire)
            .map(|w| w.readers().collect())
            .unwrap_or_default()
    }

    /// Returns the number of wires in the block.
    pub fn len(&self) -> usize {
        self.wires.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wires.is_empty()
    }

    /// Returns the number of nets in the block.
    pub fn net_count(&self) -> usize {
        self.nets.len()
    }

    /// Returns true if no wire was added, connected or removed since the last
    /// [dead wire elimination](Block::eliminate_dead_wires).
    pub fn is_eliminated(&self) -> bool {
        self.eliminated
    }

    /// Attaches `key` = `value` to `wire`. Metadata never affects simulation.
    pub fn set_metadata<K: Into<String>, V: Into<String>>(
        &mut self,
        wire: WireIndex,
        key: K,
        value: V,
    ) -> Result<(), StructuralError> {
        self.owns(wire)?;
        self.metadata
            .entry(wire)
            .or_default()
            .insert(key.into(), value.into());
        Ok(())
    }

    /// Returns the metadata attached to `wire`.
    pub fn metadata(&self, wire: WireIndex) -> Option<&IndexMap<String, String>> {
        self.metadata.get(&wire)
    }

    /// Starts capturing provenance for every new wire.
    pub fn enable_provenance(&mut self) {
        self.provenance.enable()
    }

    pub fn disable_provenance(&mut self) {
        self.provenance.disable()
    }

    /// Replaces the mechanism used to capture provenance.
    pub fn set_capture_hook<H: CaptureHook + 'static>(&mut self, hook: H) {
        self.provenance.set_hook(hook)
    }

    /// Returns the call frames captured when `wire` was created, outermost first.
    ///
    /// Empty if provenance was disabled, capture wasn't possible, or the wire is unknown.
    pub fn provenance(&self, wire: WireIndex) -> &[Frame] {
        self.wire(wire).map(|w| w.provenance()).unwrap_or(&[])
    }

    /// Removes every wire and net that no [output](WireKind::Output) or
    /// [register](WireKind::Register) depends on. Inputs are always kept.
    ///
    /// Returns the number of removed wires.
    pub fn eliminate_dead_wires(&mut self) -> usize {
        self.run_optimization(dead_wire_elimination_pass, "dead wire elimination")
    }

    /// Runs optimization `f` and logs the results of the optimization.
    fn run_optimization<F: Fn(&mut Block)>(&mut self, f: F, name: &'static str) -> usize {
        let old_len = self.len();
        f(self);
        let removed = old_len - self.len();
        tracing::debug!(
            optimization = name,
            old_size = old_len,
            new_size = self.len(),
            "reduction: {:.1}%",
            removed as f32 / old_len.max(1) as f32 * 100.
        );
        removed
    }

    /// Returns true if `wire` must survive optimizations.
    pub(super) fn is_observable(&self, wire: WireIndex) -> bool {
        matches!(
            self.get(wire).kind,
            WireKind::Input | WireKind::Output | WireKind::Register
        )
    }

    /// Creates a new intermediate wire as wide as `op` demands and drives it with `op`.
    fn op_wire(
        &mut self,
        op: Op,
        inputs: &[WireIndex],
        name: Option<&str>,
    ) -> Result<WireIndex, StructuralError> {
        let mut widths: SmallVec<[usize; NET_INPUTS_TINYVEC_SIZE]> = SmallVec::new();
        for input in inputs {
            self.owns(*input)?;
            widths.push(self.get(*input).width);
        }
        let width = op.width_rule(&widths)?;
        let output = self.create_wire(width, WireKind::Intermediate, name, None, false)?;
        if let Err(e) = self.add_net(op, inputs, output) {
            self.discard_wire(output);
            return Err(e);
        }
        Ok(output)
    }

    /// Returns a new [input](WireKind::Input) wire.
    pub fn input(&mut self, name: &str, width: usize) -> Result<WireIndex, StructuralError> {
        self.add_wire(width, WireKind::Input, Some(name))
    }

    /// Returns a new [output](WireKind::Output) wire called `name` carrying the value of `source`.
    pub fn output(&mut self, name: &str, source: WireIndex) -> Result<WireIndex, StructuralError> {
        self.owns(source)?;
        let width = self.get(source).width;
        let output = self.add_wire(width, WireKind::Output, Some(name))?;
        self.assign(output, source)?;
        Ok(output)
    }

    /// Returns a new unnamed constant. See [Block::add_const].
    pub fn constant(&mut self, value: u128, width: usize) -> Result<WireIndex, StructuralError> {
        self.add_const(value, width)
    }

    /// Returns a new [register](WireKind::Register) wire, connect what it stores with
    /// [Block::set_next]. Registers start at 0.
    pub fn register(&mut self, name: &str, width: usize) -> Result<WireIndex, StructuralError> {
        self.add_wire(width, WireKind::Register, Some(name))
    }

    /// Makes `register` take the value of `next` on every cycle.
    pub fn set_next(&mut self, register: WireIndex, next: WireIndex) -> Result<NetIndex, StructuralError> {
        self.add_net(Op::Register, &[next], register)
    }

    /// Drives the undriven `dest` with `source`, `dest` can be wider than `source`.
    pub fn assign(&mut self, dest: WireIndex, source: WireIndex) -> Result<NetIndex, StructuralError> {
        self.add_net(Op::Wire, &[source], dest)
    }

    // Create constructors for all operations with 2 operands.
    binary_ops!(add, sub, mul, and, or, xor, nand, eq, lt, gt);

    /// Returns a new wire holding the bitwise negation of `a`.
    pub fn not(&mut self, a: WireIndex) -> Result<WireIndex, StructuralError> {
        self.op_wire(Op::Not, &[a], None)
    }

    /// Returns a new wire holding `when_zero` if `selector` is 0 and `when_one` otherwise.
    pub fn mux(
        &mut self,
        selector: WireIndex,
        when_zero: WireIndex,
        when_one: WireIndex,
    ) -> Result<WireIndex, StructuralError> {
        self.op_wire(Op::Mux, &[selector, when_zero, when_one], None)
    }

    /// Returns a new wire made of the bits of `a` at `bits`, the first one becomes bit 0.
    pub fn select(&mut self, a: WireIndex, bits: &[usize]) -> Result<WireIndex, StructuralError> {
        self.op_wire(Op::Select(SmallVec::from_slice(bits)), &[a], None)
    }

    /// Returns a new wire made of the bits of `a` in `range`.
    pub fn slice(&mut self, a: WireIndex, range: Range<usize>) -> Result<WireIndex, StructuralError> {
        self.op_wire(Op::Select(range.collect()), &[a], None)
    }

    /// Returns a new wire of the concatenation of `parts`, the first one ends up in the
    /// most significant bits.
    pub fn concat(&mut self, parts: &[WireIndex]) -> Result<WireIndex, StructuralError> {
        self.op_wire(Op::Concat, parts, None)
    }

    /// Returns a new wire with the `width` lowest bits of `a`, dropping the rest.
    ///
    /// This is the only way to narrow a value.
    pub fn truncate(&mut self, a: WireIndex, width: usize) -> Result<WireIndex, StructuralError> {
        self.slice(a, 0..width)
    }

    /// Returns a new wire of `width` bits holding `a` zero extended.
    pub fn zero_extend(&mut self, a: WireIndex, width: usize) -> Result<WireIndex, StructuralError> {
        self.owns(a)?;
        let output = self.create_wire(width, WireKind::Intermediate, None, None, false)?;
        if let Err(e) = self.assign(output, a) {
            self.discard_wire(output);
            return Err(e);
        }
        Ok(output)
    }
}

impl Default for Block {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adder_block() -> (Block, WireIndex, WireIndex, WireIndex) {
        let mut b = Block::new();
        let in1 = b.input("in1", 8).unwrap();
        let in2 = b.input("in2", 8).unwrap();
        let sum = b.add_named(in1, in2, "sum").unwrap();
        (b, in1, in2, sum)
    }

    #[test]
    fn test_duplicate_name() {
        let (mut b, ..) = adder_block();
        let len = b.len();
        assert_eq!(
            b.input("in1", 3),
            Err(StructuralError::DuplicateName { name: "in1".into() })
        );
        assert_eq!(b.len(), len);
    }

    #[test]
    fn test_generated_names_are_unique() {
        let mut b = Block::new();
        b.add_wire(1, WireKind::Intermediate, Some("tmp0")).unwrap();
        let w = b.add_wire(1, WireKind::Intermediate, None).unwrap();
        assert_eq!(b.wire(w).unwrap().name(), "tmp1");
    }

    #[test]
    fn test_invalid_width() {
        let mut b = Block::new();
        assert!(matches!(
            b.input("a", 0),
            Err(StructuralError::InvalidWidth { width: 0, .. })
        ));
        assert!(b.input("a", 129).is_err());
        assert!(b.input("a", 128).is_ok());
        assert_eq!(
            b.constant(16, 4),
            Err(StructuralError::ConstantOverflow {
                value: 16,
                width: 4
            })
        );
    }

    #[test]
    fn test_width_law() {
        let (mut b, in1, _, sum) = adder_block();
        assert_eq!(b.wire(sum).unwrap().width(), 9);

        let narrow = b.input("narrow", 3).unwrap();
        let diff = b.sub(narrow, in1).unwrap();
        assert_eq!(b.wire(diff).unwrap().width(), 9);
        let product = b.mul(narrow, in1).unwrap();
        assert_eq!(b.wire(product).unwrap().width(), 11);
        let c = b.concat(&[narrow, in1, sum]).unwrap();
        assert_eq!(b.wire(c).unwrap().width(), 20);
        let s = b.slice(in1, 2..6).unwrap();
        assert_eq!(b.wire(s).unwrap().width(), 4);
    }

    #[test]
    fn test_add_net_width_mismatch_is_not_committed() {
        let (mut b, in1, in2, _) = adder_block();
        let out = b.add_wire(8, WireKind::Output, Some("out")).unwrap();
        let nets = b.net_count();
        assert_eq!(
            b.add_net(Op::Add, &[in1, in2], out),
            Err(StructuralError::WidthMismatch {
                op: Op::Add,
                wire: "out".into(),
                expected: 9,
                actual: 8
            })
        );
        assert_eq!(b.net_count(), nets);
        assert_eq!(b.producer(out), None);
        assert!(b.consumers(in1).len() == 1);
    }

    #[test]
    fn test_add_net_already_driven() {
        let (mut b, in1, in2, sum) = adder_block();
        assert!(matches!(
            b.add_net(Op::Add, &[in1, in2], sum),
            Err(StructuralError::AlreadyDriven { .. })
        ));
    }

    #[test]
    fn test_add_net_invalid_driver() {
        let (mut b, in1, in2, sum) = adder_block();
        assert!(matches!(
            b.add_net(Op::Wire, &[in2], in1),
            Err(StructuralError::InvalidDriver {
                kind: WireKind::Input,
                ..
            })
        ));
        let r = b.register("r", 9).unwrap();
        assert!(matches!(
            b.add_net(Op::Wire, &[sum], r),
            Err(StructuralError::InvalidDriver { .. })
        ));
        let w = b.add_wire(9, WireKind::Intermediate, None).unwrap();
        assert!(matches!(
            b.add_net(Op::Register, &[sum], w),
            Err(StructuralError::InvalidDriver { .. })
        ));
        assert!(b.set_next(r, sum).is_ok());
    }

    #[test]
    fn test_foreign_wire() {
        let (mut b, ..) = adder_block();
        let (_, foreign, ..) = adder_block();
        assert_eq!(
            b.not(foreign),
            Err(StructuralError::ForeignWire { wire: foreign })
        );
    }

    #[test]
    fn test_wire_zero_extends_but_never_narrows() {
        let (mut b, in1, _, sum) = adder_block();
        let wide = b.zero_extend(in1, 12).unwrap();
        assert_eq!(b.wire(wide).unwrap().width(), 12);

        let narrow = b.add_wire(8, WireKind::Output, Some("narrow")).unwrap();
        assert!(matches!(
            b.assign(narrow, sum),
            Err(StructuralError::WidthMismatch { .. })
        ));
        let truncated = b.truncate(sum, 8).unwrap();
        assert!(b.assign(narrow, truncated).is_ok());
    }

    #[test]
    fn test_remove_wire() {
        let (mut b, in1, _, sum) = adder_block();
        assert!(matches!(
            b.remove_wire(in1),
            Err(StructuralError::StillReferenced { .. })
        ));

        b.remove_wire(sum).unwrap();
        assert!(b.wire(sum).is_none());
        assert_eq!(b.wire_by_name("sum"), None);
        assert_eq!(b.net_count(), 0);
        assert!(b.consumers(in1).is_empty());
        assert!(b.remove_wire(in1).is_ok());
    }

    #[test]
    fn test_sanity_check_undriven() {
        let (mut b, ..) = adder_block();
        assert_eq!(b.sanity_check(), Ok(()));
        b.add_wire(4, WireKind::Output, Some("floating")).unwrap();
        assert_eq!(
            b.sanity_check(),
            Err(StructuralError::Undriven {
                wire: "floating".into(),
                kind: WireKind::Output
            })
        );
    }

    #[test]
    fn test_sanity_check_cycle() {
        let mut b = Block::new();
        let a = b.input("a", 4).unwrap();
        let loop_wire = b.add_wire(4, WireKind::Intermediate, Some("loop")).unwrap();
        let x = b.xor_named(a, loop_wire, "x").unwrap();
        b.assign(loop_wire, x).unwrap();

        let first = b.sanity_check();
        assert!(matches!(
            first,
            Err(StructuralError::CombinationalCycle { .. })
        ));
        assert_eq!(b.sanity_check(), first);
    }

    #[test]
    fn test_sanity_check_self_loop() {
        let mut b = Block::new();
        let w = b.add_wire(4, WireKind::Intermediate, Some("w")).unwrap();
        b.assign(w, w).unwrap();
        assert_eq!(
            b.sanity_check(),
            Err(StructuralError::CombinationalCycle { wire: "w".into() })
        );
    }

    #[test]
    fn test_register_breaks_cycles() {
        let mut b = Block::new();
        let r = b.register("r", 4).unwrap();
        let n = b.not(r).unwrap();
        b.set_next(r, n).unwrap();
        assert_eq!(b.sanity_check(), Ok(()));
        assert_eq!(b.combinational_order().unwrap().len(), 1);
    }

    #[test]
    fn test_combinational_order() {
        let (mut b, in1, _, sum) = adder_block();
        let late = b.add_wire(10, WireKind::Intermediate, Some("late")).unwrap();
        let out = b.output("out", late).unwrap();
        let ext = b.zero_extend(in1, 9).unwrap();
        b.add_net(Op::Add, &[sum, ext], late).unwrap();

        let order = b.combinational_order().unwrap();
        let pos = |w| order.iter().position(|n| Some(*n) == b.producer(w)).unwrap();
        assert!(pos(sum) < pos(late));
        assert!(pos(ext) < pos(late));
        assert!(pos(late) < pos(out));
    }

    #[test]
    fn test_combinational_order_repeated_inputs() {
        let mut b = Block::new();
        let a = b.input("a", 4).unwrap();
        let same = b.and_named(a, a, "same").unwrap();
        let twice = b.add_named(same, same, "twice").unwrap();
        let out = b.output("out", twice).unwrap();

        let order = b.combinational_order().unwrap();
        let expected: Vec<_> = [same, twice, out].iter().filter_map(|w| b.producer(*w)).collect();
        assert_eq!(order, expected);
        assert_eq!(b.sanity_check(), Ok(()));
    }

    #[test]
    fn test_metadata() {
        let (mut b, in1, ..) = adder_block();
        assert_eq!(b.metadata(in1), None);
        b.set_metadata(in1, "unit", "volts").unwrap();
        assert_eq!(b.metadata(in1).unwrap()["unit"], "volts");
        b.remove_wire(b.wire_by_name("sum").unwrap()).unwrap();
        b.remove_wire(in1).unwrap();
        assert_eq!(b.metadata(in1), None);
    }

    #[test]
    fn test_reset() {
        let (mut b, in1, ..) = adder_block();
        b.reset();
        assert!(b.is_empty());
        assert_eq!(b.net_count(), 0);
        assert!(b.wire(in1).is_none());
        assert!(b.input("in1", 8).is_ok());
        assert!(matches!(
            b.not(in1),
            Err(StructuralError::ForeignWire { .. })
        ));
    }

    struct Fixed;
    impl CaptureHook for Fixed {
        fn capture(&self) -> Vec<Frame> {
            vec![Frame::new("main"), Frame::new("build").at("design.rs", 4)]
        }
    }

    #[test]
    fn test_provenance() {
        let mut b = Block::new();
        b.set_capture_hook(Fixed);
        let before = b.input("before", 1).unwrap();
        b.enable_provenance();
        let after = b.input("after", 1).unwrap();

        assert!(b.provenance(before).is_empty());
        assert_eq!(
            b.provenance(after),
            &[Frame::new("main"), Frame::new("build").at("design.rs", 4)][..]
        );
    }
}
