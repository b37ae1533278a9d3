//! Runtime implementation for `lexlr` parse tables.

pub mod definition;
pub mod engine;

pub use crate::{
    definition::{ParseAction, ParseTable},
    engine::{ParseEngine, ParseError, Semantics, Step, Token},
};
