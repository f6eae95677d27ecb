use super::super::{block::Block, wire::WireIndex};
use std::collections::HashSet;

// Traverses the graph backwards from observable wires, marking everything they depend on,
// then removes every net and wire that wasn't marked.
pub fn dead_wire_elimination_pass(g: &mut Block) {
    let mut work: Vec<WireIndex> = g
        .wires()
        .map(|(idx, _)| idx)
        .filter(|idx| g.is_observable(*idx))
        .collect();
    let mut live = HashSet::<WireIndex>::with_capacity(g.len());

    while let Some(idx) = work.pop() {
        if !live.insert(idx) {
            continue;
        }
        if let Some(net) = g.get(idx).driver {
            work.extend_from_slice(&g.get_net(net).inputs);
        }
    }

    let dead_nets: Vec<_> = g
        .nets()
        .filter(|(_, net)| !live.contains(&net.output))
        .map(|(idx, _)| idx)
        .collect();
    let dead_wires: Vec<_> = g
        .wires()
        .map(|(idx, _)| idx)
        .filter(|idx| !live.contains(idx))
        .collect();

    for net in dead_nets {
        g.discard_net(net);
    }
    for wire in dead_wires {
        g.discard_wire(wire);
    }
    g.eliminated = true;
}
