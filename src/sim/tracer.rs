use super::evaluator::{Evaluator, Values};
use crate::data_structures::{bit, hex_digits};
use crate::error::SimulationError;
use crate::graph::WireKind;

use indexmap::IndexMap;
use std::fmt::Write as FmtWrite;
use std::io::{self, Write};
use std::ops::Index;

/// Selects the wires a [Tracer] records.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum TraceConfig {
    /// Every input, output and register wire, probes included.
    Interface,
    /// Only the wires with these names, in this order.
    Wires(Vec<String>),
}

impl Default for TraceConfig {
    fn default() -> Self {
        TraceConfig::Interface
    }
}

/// Per cycle values of the watched wires.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct SimulationTrace {
    traces: IndexMap<String, Vec<u128>>,
    widths: IndexMap<String, usize>,
}

impl SimulationTrace {
    /// Returns the values `name` took, one per completed step.
    pub fn get(&self, name: &str) -> Option<&[u128]> {
        self.traces.get(name).map(|v| v.as_slice())
    }

    /// Returns the width of the watched wire `name`.
    pub fn width(&self, name: &str) -> Option<usize> {
        self.widths.get(name).copied()
    }

    /// Returns the names of the watched wires in recording order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.traces.keys().map(String::as_str)
    }

    /// Returns the number of recorded cycles.
    pub fn len(&self) -> usize {
        self.traces.values().next().map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Index<&str> for SimulationTrace {
    type Output = [u128];

    /// # Panics
    ///
    /// Will panic if `name` is not watched.
    fn index(&self, name: &str) -> &[u128] {
        &self.traces[name]
    }
}

/// Steps an [Evaluator] and records the values of the watched wires after every cycle.
///
/// # Example
/// ```
/// # use wirenet::{Block, Evaluator, Tracer};
/// # fn main() -> Result<(), wirenet::Error> {
/// let mut b = Block::new();
/// let a = b.input("a", 4)?;
/// let na = b.not(a)?;
/// b.output("na", na)?;
///
/// let mut tracer = Tracer::new(Evaluator::new(&b)?);
/// tracer.step(vec![("a", 0)])?;
/// tracer.step(vec![("a", 5)])?;
/// assert_eq!(tracer.trace()["na"], [15, 10]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Tracer {
    evaluator: Evaluator,
    watched: Vec<(String, usize)>,
    trace: SimulationTrace,
}

impl Tracer {
    /// Returns a [Tracer] watching the [TraceConfig::Interface] wires.
    pub fn new(evaluator: Evaluator) -> Self {
        let slots = evaluator
            .slots()
            .iter()
            .enumerate()
            .filter(|(_, s)| {
                matches!(
                    s.kind,
                    WireKind::Input | WireKind::Output | WireKind::Register
                )
            })
            .map(|(i, _)| i)
            .collect();
        Self::watching(evaluator, slots)
    }

    /// Returns a [Tracer] watching the wires selected by `config`.
    ///
    /// Fails if an explicitly listed wire doesn't exist. Repeated names are watched once.
    pub fn with_config(evaluator: Evaluator, config: TraceConfig) -> Result<Self, SimulationError> {
        match config {
            TraceConfig::Interface => Ok(Self::new(evaluator)),
            TraceConfig::Wires(names) => {
                let slots = names
                    .iter()
                    .map(|name| evaluator.slot(name))
                    .collect::<Result<_, _>>()?;
                Ok(Self::watching(evaluator, slots))
            }
        }
    }

    fn watching(evaluator: Evaluator, slots: Vec<usize>) -> Self {
        let mut trace = SimulationTrace::default();
        let mut watched = Vec::with_capacity(slots.len());
        for slot in slots {
            let info = &evaluator.slots()[slot];
            // A wire listed twice is recorded once.
            if trace.traces.contains_key(&info.name) {
                continue;
            }
            trace.traces.insert(info.name.clone(), Vec::new());
            trace.widths.insert(info.name.clone(), info.width);
            watched.push((info.name.clone(), slot));
        }
        Self {
            evaluator,
            watched,
            trace,
        }
    }

    /// Runs [Evaluator::step] and records the watched values if it succeeds.
    pub fn step<'a, I>(&mut self, inputs: I) -> Result<Values, SimulationError>
    where
        I: IntoIterator<Item = (&'a str, u128)>,
    {
        let outputs = self.evaluator.step(inputs)?;
        for (name, slot) in &self.watched {
            let value = self.evaluator.slot_value(*slot);
            if let Some(values) = self.trace.traces.get_mut(name) {
                values.push(value);
            }
        }
        Ok(outputs)
    }

    pub fn trace(&self) -> &SimulationTrace {
        &self.trace
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    /// Returns a text waveform of the trace, one line per watched wire.
    ///
    /// One bit wires are drawn as `‾` and `_`, wider wires as hex values, each
    /// change starting with `|`.
    pub fn render(&self) -> String {
        let label_width = self
            .trace
            .names()
            .map(|n| n.chars().count())
            .max()
            .unwrap_or(0);
        let mut out = String::new();
        for (name, values) in &self.trace.traces {
            let width = self.trace.widths[name];
            let _ = write!(out, "{:>w$} ", name, w = label_width);
            if width == 1 {
                for value in values {
                    out.push(if bit(*value, 0) { '‾' } else { '_' });
                }
            } else {
                let digits = hex_digits(width);
                let mut last = None;
                for value in values {
                    if last == Some(*value) {
                        out.push_str(&" ".repeat(digits + 1));
                    } else {
                        let _ = write!(out, "|{:0d$x}", value, d = digits);
                    }
                    last = Some(*value);
                }
            }
            out.push('\n');
        }
        out
    }

    /// Writes the trace as a Value Change Dump.
    pub fn print_vcd<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let ids: Vec<String> = (0..self.trace.traces.len()).map(vcd_id).collect();

        writeln!(writer, "$timescale 1ns $end")?;
        writeln!(writer, "$scope module top $end")?;
        for ((name, _), id) in self.trace.traces.iter().zip(&ids) {
            writeln!(
                writer,
                "$var wire {} {} {} $end",
                self.trace.widths[name],
                id,
                vcd_name(name)
            )?;
        }
        writeln!(writer, "$upscope $end")?;
        writeln!(writer, "$enddefinitions $end")?;

        for cycle in 0..self.trace.len() {
            writeln!(writer, "#{}", cycle * 10)?;
            for ((name, values), id) in self.trace.traces.iter().zip(&ids) {
                let value = values[cycle];
                if cycle > 0 && values[cycle - 1] == value {
                    continue;
                }
                if self.trace.widths[name] == 1 {
                    writeln!(writer, "{}{}", value, id)?;
                } else {
                    writeln!(writer, "b{:b} {}", value, id)?;
                }
            }
        }
        writeln!(writer, "#{}", self.trace.len() * 10)?;
        Ok(())
    }
}

/// Returns the short printable identifier of the `n`th VCD variable.
fn vcd_id(mut n: usize) -> String {
    let mut id = String::new();
    loop {
        id.push((b'!' + (n % 94) as u8) as char);
        n /= 94;
        if n == 0 {
            return id;
        }
        n -= 1;
    }
}

/// VCD identifiers can't contain whitespace.
fn vcd_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Block;

    fn blinker() -> Evaluator {
        let mut b = Block::new();
        let en = b.input("en", 1).unwrap();
        let led = b.register("led", 1).unwrap();
        let toggled = b.xor(led, en).unwrap();
        b.set_next(led, toggled).unwrap();
        let count = b.register("count", 8).unwrap();
        let wide = b.zero_extend(en, 8).unwrap();
        let next = b.add(count, wide).unwrap();
        let next = b.truncate(next, 8).unwrap();
        b.set_next(count, next).unwrap();
        b.output("out", led).unwrap();
        Evaluator::new(&b).unwrap()
    }

    #[test]
    fn test_trace_length_matches_steps() {
        let mut t = Tracer::new(blinker());
        assert!(t.trace().is_empty());
        for i in 0..5 {
            t.step(vec![("en", 1)]).unwrap();
            assert_eq!(t.trace().len(), i + 1);
        }
        assert!(t.step(vec![("en", 2)]).is_err());
        for name in t.trace().names() {
            assert_eq!(t.trace()[name].len(), 5);
        }
        assert_eq!(t.trace()["led"], [0, 1, 0, 1, 0]);
        assert_eq!(t.trace()["count"], [0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_default_config_watches_interface() {
        let t = Tracer::new(blinker());
        let names: Vec<_> = t.trace().names().collect();
        assert_eq!(names, vec!["en", "led", "count", "out"]);
    }

    #[test]
    fn test_explicit_config() {
        let t = Tracer::with_config(blinker(), TraceConfig::Wires(vec!["count".into()])).unwrap();
        assert_eq!(t.trace().names().collect::<Vec<_>>(), vec!["count"]);
        assert_eq!(t.trace().width("count"), Some(8));

        let e = Tracer::with_config(blinker(), TraceConfig::Wires(vec!["nope".into()]));
        assert!(matches!(e, Err(SimulationError::UnknownWire { .. })));
    }

    #[test]
    fn test_repeated_names_are_watched_once() {
        let mut t = Tracer::with_config(
            blinker(),
            TraceConfig::Wires(vec!["count".into(), "led".into(), "count".into()]),
        )
        .unwrap();
        for _ in 0..3 {
            t.step(vec![("en", 1)]).unwrap();
        }
        assert_eq!(t.trace().names().collect::<Vec<_>>(), vec!["count", "led"]);
        assert_eq!(t.trace().len(), 3);
        assert_eq!(t.trace()["count"], [0, 1, 2]);

        let mut out = Vec::new();
        t.print_vcd(&mut out).unwrap();
        let vcd = String::from_utf8(out).unwrap();
        assert_eq!(vcd.matches("$var").count(), 2);
        assert!(vcd.ends_with("#20\nb10 !\n0\"\n#30\n"));
    }

    #[test]
    fn test_render() {
        let mut t = Tracer::with_config(
            blinker(),
            TraceConfig::Wires(vec!["led".into(), "count".into()]),
        )
        .unwrap();
        for en in &[1, 1, 0, 1] {
            t.step(vec![("en", *en)]).unwrap();
        }
        assert_eq!(t.render(), "  led _‾__\ncount |00|01|02   \n");
    }

    #[test]
    fn test_vcd() {
        let mut t = Tracer::with_config(
            blinker(),
            TraceConfig::Wires(vec!["led".into(), "count".into()]),
        )
        .unwrap();
        t.step(vec![("en", 1)]).unwrap();
        t.step(vec![("en", 0)]).unwrap();

        let mut out = Vec::new();
        t.print_vcd(&mut out).unwrap();
        let vcd = String::from_utf8(out).unwrap();
        assert!(vcd.contains("$var wire 1 ! led $end"));
        assert!(vcd.contains("$var wire 8 \" count $end"));
        assert!(vcd.contains("#0\n0!\nb0 \"\n#10\n1!\nb1 \"\n#20\n"));
    }

    #[test]
    fn test_vcd_ids() {
        assert_eq!(vcd_id(0), "!");
        assert_eq!(vcd_id(93), "~");
        assert_eq!(vcd_id(94), "!!");
        assert_eq!(vcd_name("(Probe-0: tmp1)"), "(Probe-0:_tmp1)");
    }
}
