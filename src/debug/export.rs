use crate::error::ExportError;
use crate::graph::{Block, Wire};

use std::collections::HashMap;
use std::io::Write;

/// Returns the label of a node: the op producing the wire, or its kind if undriven,
/// followed by the wire name. Labels never contain whitespace.
fn label(block: &Block, wire: &Wire) -> String {
    let name: String = wire
        .name()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    match wire.driver().and_then(|net| block.net(net)) {
        Some(net) => format!("{}:{}", net.op(), name),
        None => format!("{}:{}", wire.kind(), name),
    }
}

fn eliminated(block: &Block) -> Result<(), ExportError> {
    if block.is_eliminated() {
        Ok(())
    } else {
        Err(ExportError::NotEliminated)
    }
}

/// Prunes `block` so it can be exported, see [Block::eliminate_dead_wires].
pub fn dead_wire_elimination(block: &mut Block) -> usize {
    block.eliminate_dead_wires()
}

/// Writes `block` in trivial graph format.
///
/// One node per wire (`id label width`) in creation order, a `#` line, then one edge per
/// net input (`producer consumer`) in net creation and input order.
/// [Dead wire elimination](Block::eliminate_dead_wires) must have run since the last change.
pub fn write_trivial_graph<W: Write>(block: &Block, writer: &mut W) -> Result<(), ExportError> {
    eliminated(block)?;
    for (idx, wire) in block.wires() {
        writeln!(writer, "{} {} {}", idx.id(), label(block, wire), wire.width())?;
    }
    writeln!(writer, "#")?;
    for (_, net) in block.nets() {
        for input in net.inputs() {
            writeln!(writer, "{} {}", input.id(), net.output().id())?;
        }
    }
    Ok(())
}

/// Same as [write_trivial_graph], returning the text.
pub fn export_trivial_graph(block: &Block) -> Result<String, ExportError> {
    let mut out = Vec::new();
    write_trivial_graph(block, &mut out)?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// Writes `block` in [dot](https://en.wikipedia.org/wiki/DOT_(graph_description_language)) format,
/// to be visualized by many supported tools.
pub fn export_dot<W: Write>(block: &Block, writer: &mut W) -> Result<(), ExportError> {
    use petgraph::dot::{Config, Dot};
    eliminated(block)?;
    let mut graph = petgraph::Graph::<_, ()>::new();
    let mut index = HashMap::new();
    for (idx, wire) in block.wires() {
        index.insert(idx, graph.add_node(label(block, wire)));
    }
    for (_, net) in block.nets() {
        graph.extend_with_edges(
            net.inputs()
                .iter()
                .map(|input| (index[input], index[&net.output()])),
        );
    }
    write!(writer, "{:?}", Dot::with_config(&graph, &[Config::EdgeNoLabel]))?;
    Ok(())
}
