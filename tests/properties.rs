use proptest::prelude::*;
use wirenet::*;

/// A small datapath mixing every kind of operation, with a register feeding back.
fn datapath(width: usize) -> (Block, Vec<WireIndex>) {
    let mut b = Block::new();
    let x = b.input("x", width).unwrap();
    let y = b.input("y", width).unwrap();
    let acc = b.register("acc", width).unwrap();
    let sum = b.add(x, y).unwrap();
    let diff = b.sub(sum, acc).unwrap();
    let low = b.truncate(diff, width).unwrap();
    let mixed = b.xor(low, y).unwrap();
    let lt = b.lt(x, y).unwrap();
    let picked = b.mux(lt, mixed, x).unwrap();
    b.set_next(acc, picked).unwrap();
    let prod = b.mul(picked, y).unwrap();
    b.output("prod", prod).unwrap();
    b.output("acc_out", acc).unwrap();
    (b, vec![sum, diff, low, mixed, lt, picked, prod])
}

proptest! {
    #[test]
    fn add_width_is_max_plus_one(m in 1usize..=64, n in 1usize..=64) {
        let mut b = Block::new();
        let a = b.input("a", m).unwrap();
        let c = b.input("c", n).unwrap();
        let s = b.add(a, c).unwrap();
        prop_assert_eq!(b.wire(s).unwrap().width(), m.max(n) + 1);
    }

    #[test]
    fn add_never_wraps(m in 1usize..=64, n in 1usize..=64, a in any::<u64>(), c in any::<u64>()) {
        let a = (a as u128) & ((1u128 << m) - 1);
        let c = (c as u128) & ((1u128 << n) - 1);
        let mut b = Block::new();
        let wa = b.input("a", m).unwrap();
        let wc = b.input("c", n).unwrap();
        let s = b.add(wa, wc).unwrap();
        b.output("s", s).unwrap();
        let mut sim = Evaluator::new(&b).unwrap();
        prop_assert_eq!(sim.step(vec![("a", a), ("c", c)]).unwrap()["s"], a + c);
    }

    #[test]
    fn probes_are_transparent(
        width in 1usize..=16,
        probed in proptest::collection::vec(0usize..7, 0..5),
        cycles in proptest::collection::vec((any::<u16>(), any::<u16>()), 1..10),
    ) {
        let (plain, _) = datapath(width);
        let (mut observed, wires) = datapath(width);
        let mut probes = ProbeRegistry::new();
        for i in probed {
            let wire = wires[i];
            prop_assert_eq!(probes.probe(&mut observed, wire, None), Ok(wire));
        }

        let mut plain = Evaluator::new(&plain).unwrap();
        let mut observed = Tracer::new(Evaluator::new(&observed).unwrap());
        let limit = (1u128 << width) - 1;
        for (x, y) in cycles {
            let inputs = vec![("x", x as u128 & limit), ("y", y as u128 & limit)];
            let expected = plain.step(inputs.clone()).unwrap();
            let actual = observed.step(inputs).unwrap();
            for (name, value) in &expected {
                prop_assert_eq!(actual[name], *value);
            }
        }
        for probe in probes.probes() {
            let target = plain.slots()[probe.target().id()].name.clone();
            prop_assert_eq!(
                observed.trace()[probe.name()].last().copied(),
                plain.value(&target).ok()
            );
        }
    }

    #[test]
    fn probe_keys_are_unique(names in proptest::collection::vec("[a-c]{1,2}", 1..8)) {
        let (mut b, wires) = datapath(4);
        let mut probes = ProbeRegistry::new();
        for (i, name) in names.iter().enumerate() {
            probes.probe(&mut b, wires[i % wires.len()], Some(name)).unwrap();
        }
        let mut keys: Vec<_> = probes.probes().iter().map(|p| p.name().to_owned()).collect();
        keys.sort();
        keys.dedup();
        prop_assert_eq!(keys.len(), names.len());
    }
}
