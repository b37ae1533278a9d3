use lexlr::{
    grammar::Grammar,
    lr1::{ParseTable, TableError},
};
use std::{env, path::PathBuf};

fn load(name: &str) -> Grammar {
    let path = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap())
        .join(format!("tests/{}.lll", name));
    Grammar::from_file(path).unwrap()
}

macro_rules! define_tests {
    ($($name:ident),*$(,)?) => {$(
        #[test]
        fn $name() {
            let grammar = load(stringify!($name));
            eprintln!("grammar:\n{}", grammar);
            let table = ParseTable::generate(&grammar).unwrap();
            eprintln!("parse table:\n---\n{}", table.display(&grammar));
        }
    )*};
}

define_tests! {
    arithmetic,
    g1,
    g2,
    g3,
    json,
    lists,
}

#[test]
fn ambiguous() {
    let grammar = load("ambiguous");
    let err = ParseTable::generate(&grammar).unwrap_err();
    assert!(matches!(err, TableError::ActionConflict { .. }), "{}", err);
}

#[test]
fn canonical_state_count() {
    // Ten canonical LR(1) states, minus the one reached by `S' := S .` since no augmented
    // production is added.
    let grammar = load("g3");
    let table = ParseTable::generate(&grammar).unwrap();
    assert_eq!(table.num_states(), 9);
}
