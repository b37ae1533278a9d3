//! Abstract syntax of grammar definition files.

#[derive(Debug, Default, PartialEq)]
pub struct Grammar {
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, PartialEq)]
pub enum Stmt {
    /// `@terminal A, B;`
    Terminals(Vec<String>),
    /// `@nonterminal S, T;`
    Nonterminals(Vec<String>),
    /// `@start S;`
    Start(String),
    /// `@rule S := A B | @empty;`
    Rule(RuleDesc),
}

#[derive(Debug, PartialEq)]
pub struct RuleDesc {
    pub left: String,
    /// An empty alternative stands for `@empty`.
    pub alternatives: Vec<Vec<String>>,
}
