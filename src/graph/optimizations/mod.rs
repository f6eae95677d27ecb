mod dead_wire_elimination;
pub(super) use dead_wire_elimination::*;
