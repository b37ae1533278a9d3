//! Parser definition binding semantic actions to a grammar.

use crate::{
    grammar::{Grammar, ProductionID, TerminalID},
    lr1::ParseTable,
    types::Map,
};
use lexlr_runtime::engine::{ParseEngine, ParseError, Semantics};
use std::fmt;

/// The typed payload carried by a token.
pub trait Payload {
    /// Return the terminal symbol of this token.
    fn terminal(&self) -> TerminalID;
}

impl Payload for TerminalID {
    fn terminal(&self) -> TerminalID {
        *self
    }
}

/// A pair of lexeme and payload fed into the parser.
#[derive(Debug, Clone, PartialEq)]
pub struct Token<'s, P> {
    pub lexeme: &'s str,
    pub payload: P,
}

impl<'s, P> Token<'s, P> {
    pub fn new(lexeme: &'s str, payload: P) -> Self {
        Self { lexeme, payload }
    }
}

impl<P> lexlr_runtime::Token<TerminalID> for Token<'_, P>
where
    P: Payload,
{
    fn to_index(&self) -> TerminalID {
        self.payload.terminal()
    }
}

type TerminalAction<'a, P, R, E> = Box<dyn Fn(&str, &P) -> Result<R, E> + 'a>;
type ProductionAction<'a, R, E> = Box<dyn Fn(Vec<R>) -> Result<R, E> + 'a>;
type UnexpectedToken<'a, P, E> = Box<dyn Fn(&str, &P) -> E + 'a>;
type UnexpectedEoi<'a, E> = Box<dyn Fn() -> E + 'a>;

#[derive(Debug, thiserror::Error)]
pub enum ParserDefError {
    #[error("the terminal `{}' is used in the grammar but has no action", name)]
    MissingTerminalAction { name: String },

    #[error("the production `{}' has no action", production)]
    MissingProductionAction { production: String },

    #[error("the `{}' callback is not specified", callback)]
    MissingErrorCallback { callback: &'static str },

    #[error("the parse table was not generated from this grammar")]
    TableMismatch,
}

/// The builder of [`Parser`].
pub struct ParserDef<'a, P, R, E> {
    grammar: &'a Grammar,
    table: &'a ParseTable,
    terminal_actions: Map<TerminalID, TerminalAction<'a, P, R, E>>,
    production_actions: Map<ProductionID, ProductionAction<'a, R, E>>,
    unexpected_token: Option<UnexpectedToken<'a, P, E>>,
    unexpected_eoi: Option<UnexpectedEoi<'a, E>>,
}

impl<'a, P, R, E> ParserDef<'a, P, R, E> {
    /// Set the function building the semantic value of a terminal.
    pub fn terminal<F>(mut self, terminal: TerminalID, f: F) -> Self
    where
        F: Fn(&str, &P) -> Result<R, E> + 'a,
    {
        self.terminal_actions.insert(terminal, Box::new(f));
        self
    }

    /// Set the function combining the values matched by a production.
    pub fn production<F>(mut self, production: ProductionID, f: F) -> Self
    where
        F: Fn(Vec<R>) -> Result<R, E> + 'a,
    {
        self.production_actions.insert(production, Box::new(f));
        self
    }

    pub fn on_unexpected_token<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &P) -> E + 'a,
    {
        self.unexpected_token = Some(Box::new(f));
        self
    }

    pub fn on_unexpected_eoi<F>(mut self, f: F) -> Self
    where
        F: Fn() -> E + 'a,
    {
        self.unexpected_eoi = Some(Box::new(f));
        self
    }

    pub fn build(self) -> Result<Parser<'a, P, R, E>, ParserDefError> {
        let g = self.grammar;
        let table = self.table;
        let matches_table = table.start_symbol() == g.start_symbol()
            && table.num_productions() == g.productions().count()
            && g
                .productions()
                .all(|p| table.production(p.id()) == Some((p.left(), p.right().len())));
        if !matches_table {
            return Err(ParserDefError::TableMismatch);
        }

        for t in g.used_terminals().iter() {
            if !self.terminal_actions.contains_key(&t) {
                return Err(ParserDefError::MissingTerminalAction {
                    name: g.terminal(t).name().to_owned(),
                });
            }
        }

        let mut production_actions = Vec::with_capacity(self.production_actions.len());
        let mut actions = self.production_actions;
        for production in g.productions() {
            match actions.swap_remove(&production.id()) {
                Some(action) => production_actions.push(action),
                None => {
                    return Err(ParserDefError::MissingProductionAction {
                        production: production.display(g).to_string(),
                    })
                }
            }
        }

        let unexpected_token = self
            .unexpected_token
            .ok_or(ParserDefError::MissingErrorCallback {
                callback: "unexpected token",
            })?;
        let unexpected_eoi = self
            .unexpected_eoi
            .ok_or(ParserDefError::MissingErrorCallback {
                callback: "unexpected end of input",
            })?;

        Ok(Parser {
            table: self.table,
            terminal_actions: self.terminal_actions,
            production_actions,
            unexpected_token,
            unexpected_eoi,
        })
    }
}

/// A parser for a specific grammar, with semantic actions producing `R`.
pub struct Parser<'a, P, R, E> {
    table: &'a ParseTable,
    terminal_actions: Map<TerminalID, TerminalAction<'a, P, R, E>>,
    // indexed by production ID, one entry per production of the table.
    production_actions: Vec<ProductionAction<'a, R, E>>,
    unexpected_token: UnexpectedToken<'a, P, E>,
    unexpected_eoi: UnexpectedEoi<'a, E>,
}

impl<P, R, E> fmt::Debug for Parser<'_, P, R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser")
            .field("num_states", &self.table.num_states())
            .field("terminal_actions", &self.terminal_actions.len())
            .field("production_actions", &self.production_actions.len())
            .finish()
    }
}

impl<'a, P, R, E> Parser<'a, P, R, E> {
    /// Start defining a parser driven by `table`, which must be generated from `grammar`.
    pub fn builder(grammar: &'a Grammar, table: &'a ParseTable) -> ParserDef<'a, P, R, E> {
        ParserDef {
            grammar,
            table,
            terminal_actions: Map::default(),
            production_actions: Map::default(),
            unexpected_token: None,
            unexpected_eoi: None,
        }
    }

    /// Parse a token stream and return the semantic value of the start symbol.
    pub fn parse<'s, I>(&self, tokens: I) -> Result<R, ParseError<E>>
    where
        I: IntoIterator<Item = Token<'s, P>>,
        P: Payload,
        E: fmt::Display,
    {
        let engine = ParseEngine::new(self.table);
        engine.parse(tokens, &mut Actions { parser: self })
    }
}

struct Actions<'p, 'a, P, R, E> {
    parser: &'p Parser<'a, P, R, E>,
}

impl<'s, 'a, P, R, E> Semantics<&'a ParseTable, Token<'s, P>> for Actions<'_, 'a, P, R, E>
where
    P: Payload,
    E: fmt::Display,
{
    type Value = R;
    type Error = E;

    fn shift(&mut self, token: Token<'s, P>) -> Result<R, E> {
        match self.parser.terminal_actions.get(&token.payload.terminal()) {
            Some(action) => action(token.lexeme, &token.payload),
            None => Err((self.parser.unexpected_token)(token.lexeme, &token.payload)),
        }
    }

    fn reduce(&mut self, production: ProductionID, args: Vec<R>) -> Result<R, E> {
        let action = &self.parser.production_actions[usize::from(production.into_raw())];
        action(args)
    }

    fn unexpected_token(&mut self, token: &Token<'s, P>) -> E {
        (self.parser.unexpected_token)(token.lexeme, &token.payload)
    }

    fn unexpected_eoi(&mut self) -> E {
        (self.parser.unexpected_eoi)()
    }
}
