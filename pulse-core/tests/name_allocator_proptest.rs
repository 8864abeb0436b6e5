use std::collections::HashSet;

use proptest::prelude::*;
use pulse_core::Session;

const RESERVED: [&str; 10] = [
    "Quantity",
    "delay",
    "at",
    "now",
    "syscall",
    "range",
    "base_s_unit",
    "base_Hz_unit",
    "sequential",
    "parallel",
];

fn base_names() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-zA-Z_][a-zA-Z0-9_]{0,7}", 1..128)
}

proptest! {
    #[test]
    fn allocated_names_never_collide(bases in base_names()) {
        let mut session = Session::new();
        let mut seen = HashSet::new();
        for base in &bases {
            let name = session.new_name(base);
            prop_assert!(seen.insert(name.clone()), "duplicate name `{name}`");
        }
    }

    #[test]
    fn allocated_names_avoid_the_reserved_set(bases in base_names()) {
        let mut session = Session::new();
        for base in &bases {
            let name = session.new_name(base);
            prop_assert!(!RESERVED.contains(&name.as_str()), "reserved name `{name}` leaked");
        }
    }
}
