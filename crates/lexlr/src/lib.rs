//! A toolkit for building lexers and LR(1) parsers.
//!
//! * [`automaton`] models finite automata over input classes and
//!   converts an NFA into a DFA, resolving colliding outputs by precedence.
//! * [`grammar`] defines context-free grammars, either programmatically or
//!   from a grammar definition file.
//! * [`first_sets`] and [`lr1`] compute the canonical LR(1) parse table.
//! * [`parser`] drives the table with user-supplied semantic actions.

pub mod automaton;
pub mod first_sets;
pub mod grammar;
pub mod lr1;
pub mod parser;
pub mod scanner;
pub mod syntax;
pub mod types;

mod util;
