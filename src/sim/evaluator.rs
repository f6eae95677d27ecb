use crate::data_structures::fits;
use crate::error::{SimulationError, StructuralError};
use crate::graph::{Block, Net, Op, WireIndex, WireKind};

use indexmap::IndexMap;
use smallvec::SmallVec;
use std::collections::HashMap;

/// Values of named wires, in creation order.
pub type Values = IndexMap<String, u128>;

/// Description of a simulated wire.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SlotInfo {
    pub name: String,
    pub width: usize,
    pub kind: WireKind,
}

/// A net with its wires replaced by slots.
#[derive(Debug, Clone)]
struct CompiledNet {
    op: Op,
    inputs: SmallVec<[usize; 2]>,
    widths: SmallVec<[usize; 2]>,
    output: usize,
    width: usize,
}

impl CompiledNet {
    #[inline(always)]
    fn eval(&self, values: &[u128]) -> u128 {
        let args: SmallVec<[u128; 3]> = self.inputs.iter().map(|i| values[*i]).collect();
        self.op.eval(&args, &self.widths, self.width)
    }
}

/// Cycle based simulator of a [Block].
///
/// Creating an evaluator compacts the block: every wire gets a contiguous slot and the
/// combinational nets are sorted once so every net is evaluated after its inputs.
/// The evaluator doesn't borrow the block, later changes to it are not seen.
///
/// Every [step](Evaluator::step) evaluates the combinational logic from the supplied
/// inputs and the current register values, then commits the next register values.
/// A failed step leaves the evaluator untouched.
#[derive(Debug, Clone)]
pub struct Evaluator {
    slots: Vec<SlotInfo>,
    names: HashMap<String, usize>,
    inputs: Vec<usize>,
    outputs: Vec<usize>,
    constants: Vec<(usize, u128)>,
    schedule: Vec<CompiledNet>,
    registers: Vec<CompiledNet>,
    register_state: Vec<u128>,
    values: Vec<u128>,
    cycle: usize,
}

impl Evaluator {
    /// Returns a new [Evaluator] for `block`, failing if the block doesn't pass its
    /// [sanity check](Block::sanity_check).
    pub fn new(block: &Block) -> Result<Self, StructuralError> {
        block.sanity_check()?;
        let order = block.combinational_order()?;

        let mut index_map = HashMap::<WireIndex, usize>::new();
        let mut slots = Vec::with_capacity(block.len());
        let mut names = HashMap::new();
        let mut inputs = Vec::new();
        let mut outputs = Vec::new();
        let mut constants = Vec::new();

        for (slot, (idx, wire)) in block.wires().enumerate() {
            index_map.insert(idx, slot);
            names.insert(wire.name().to_owned(), slot);
            match wire.kind() {
                WireKind::Input => inputs.push(slot),
                WireKind::Output => outputs.push(slot),
                WireKind::Constant => constants.push((slot, wire.value().unwrap_or(0))),
                WireKind::Register | WireKind::Intermediate => {}
            }
            slots.push(SlotInfo {
                name: wire.name().to_owned(),
                width: wire.width(),
                kind: wire.kind(),
            });
        }

        let compile = |net: &Net| CompiledNet {
            op: net.op().clone(),
            inputs: net.inputs().iter().map(|i| index_map[i]).collect(),
            widths: net.inputs().iter().map(|i| slots[index_map[i]].width).collect(),
            output: index_map[&net.output()],
            width: slots[index_map[&net.output()]].width,
        };

        let schedule: Vec<_> = order
            .iter()
            .filter_map(|net| block.net(*net))
            .map(compile)
            .collect();
        let registers: Vec<_> = block
            .nets()
            .filter(|(_, net)| net.op().is_register())
            .map(|(_, net)| compile(net))
            .collect();

        tracing::debug!(
            wires = slots.len(),
            combinational = schedule.len(),
            registers = registers.len(),
            "compiled evaluator"
        );

        let values = vec![0; slots.len()];
        Ok(Evaluator {
            register_state: vec![0; registers.len()],
            slots,
            names,
            inputs,
            outputs,
            constants,
            schedule,
            registers,
            values,
            cycle: 0,
        })
    }

    /// Simulates one cycle with the given input values and returns the outputs of this cycle.
    ///
    /// Every input wire needs a value that fits in its width. Registers show the value
    /// computed in the previous cycle, their next value is committed together with the
    /// outputs.
    pub fn step<'a, I>(&mut self, inputs: I) -> Result<Values, SimulationError>
    where
        I: IntoIterator<Item = (&'a str, u128)>,
    {
        let mut supplied: Vec<Option<u128>> = vec![None; self.slots.len()];
        for (name, value) in inputs {
            let slot = match self.names.get(name) {
                Some(&slot) if self.slots[slot].kind == WireKind::Input => slot,
                _ => return Err(SimulationError::UnknownInput { name: name.into() }),
            };
            let width = self.slots[slot].width;
            if !fits(value, width) {
                return Err(SimulationError::InputOutOfRange {
                    name: name.into(),
                    value,
                    width,
                });
            }
            supplied[slot] = Some(value);
        }

        let mut values = vec![0; self.slots.len()];
        for &slot in &self.inputs {
            values[slot] = supplied[slot].ok_or_else(|| SimulationError::MissingInput {
                name: self.slots[slot].name.clone(),
            })?;
        }
        for &(slot, value) in &self.constants {
            values[slot] = value;
        }
        for (register, state) in self.registers.iter().zip(&self.register_state) {
            values[register.output] = *state;
        }

        for net in &self.schedule {
            values[net.output] = net.eval(&values);
        }
        let next_state: Vec<u128> = self.registers.iter().map(|r| r.eval(&values)).collect();

        self.values = values;
        self.register_state = next_state;
        self.cycle += 1;
        tracing::trace!(cycle = self.cycle, "step");

        Ok(self.outputs())
    }

    /// Runs [Evaluator::step] once for every item of `inputs`, stopping at the first failure.
    pub fn run<'a, I, C>(&mut self, inputs: I) -> Result<Vec<Values>, SimulationError>
    where
        I: IntoIterator<Item = C>,
        C: IntoIterator<Item = (&'a str, u128)>,
    {
        inputs.into_iter().map(|cycle| self.step(cycle)).collect()
    }

    /// Returns the values of all output wires in the last completed cycle.
    pub fn outputs(&self) -> Values {
        self.outputs
            .iter()
            .map(|&slot| (self.slots[slot].name.clone(), self.values[slot]))
            .collect()
    }

    /// Returns the value `name` had in the last completed cycle, 0 before the first one.
    pub fn value(&self, name: &str) -> Result<u128, SimulationError> {
        self.slot(name).map(|slot| self.values[slot])
    }

    /// Sets the value `register` will show in the next cycle.
    pub fn set_register(&mut self, register: &str, value: u128) -> Result<(), SimulationError> {
        let slot = self.slot(register)?;
        let position = self
            .registers
            .iter()
            .position(|r| r.output == slot)
            .ok_or_else(|| SimulationError::NotARegister {
                name: register.into(),
            })?;
        let width = self.slots[slot].width;
        if !fits(value, width) {
            return Err(SimulationError::InputOutOfRange {
                name: register.into(),
                value,
                width,
            });
        }
        self.register_state[position] = value;
        Ok(())
    }

    /// Returns the number of completed cycles.
    pub fn cycle(&self) -> usize {
        self.cycle
    }

    /// Returns the simulated wires, indexed by slot.
    pub fn slots(&self) -> &[SlotInfo] {
        &self.slots
    }

    pub(crate) fn slot(&self, name: &str) -> Result<usize, SimulationError> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| SimulationError::UnknownWire { name: name.into() })
    }

    #[inline(always)]
    pub(crate) fn slot_value(&self, slot: usize) -> u128 {
        self.values[slot]
    }
}
