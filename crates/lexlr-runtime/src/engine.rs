//! The implementation of LR(1) parser engine.

use crate::definition::{ParseAction, ParseTable};
use std::fmt;

/// A trait for abstracting token symbols.
pub trait Token<TIdx> {
    /// Return the index value corresponding to this token.
    fn to_index(&self) -> TIdx;
}

/// The callbacks invoked by the parser engine to build semantic values.
pub trait Semantics<TDef, TTok>
where
    TDef: ParseTable,
{
    /// The type of semantic values stored in the value stack.
    type Value;

    /// The error type produced by the callbacks.
    type Error: fmt::Display;

    /// Build the semantic value of a shifted token.
    fn shift(&mut self, token: TTok) -> Result<Self::Value, Self::Error>;

    /// Combine the values matched by a production rule into one value.
    ///
    /// `args` is ordered from left to right.
    fn reduce(
        &mut self,
        production: TDef::Production,
        args: Vec<Self::Value>,
    ) -> Result<Self::Value, Self::Error>;

    /// Produce the diagnostic for a token that has no legal action.
    fn unexpected_token(&mut self, token: &TTok) -> Self::Error;

    /// Produce the diagnostic for a premature end of input.
    fn unexpected_eoi(&mut self) -> Self::Error;
}

/// The instance of LR(1) parser engine, based on a parse table.
pub struct ParseEngine<TDef, TTok, TValue>
where
    TDef: ParseTable,
{
    definition: TDef,
    states_stack: Vec<TDef::State>,
    values_stack: Vec<TValue>,
    // `Some(None)` means that the end of input has been peeked.
    lookahead: Option<Option<TTok>>,
    accepted: bool,
    failed: bool,
}

impl<TDef, TTok, TValue> fmt::Debug for ParseEngine<TDef, TTok, TValue>
where
    TDef: ParseTable + fmt::Debug,
    TDef::State: fmt::Debug,
    TTok: fmt::Debug,
    TValue: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseEngine")
            .field("definition", &self.definition)
            .field("states_stack", &self.states_stack)
            .field("values_stack", &self.values_stack)
            .field("lookahead", &self.lookahead)
            .field("accepted", &self.accepted)
            .field("failed", &self.failed)
            .finish()
    }
}

/// The outcome of a single transition of the parser engine.
#[derive(Debug)]
pub enum Step<TValue> {
    /// A token has been consumed.
    Shifted,
    /// A production rule has been reduced and its value pushed.
    Reduced,
    /// The start symbol has been reduced at the end of input.
    Accepted(TValue),
}

impl<TDef, TTok, TValue> ParseEngine<TDef, TTok, TValue>
where
    TDef: ParseTable,
    TTok: Token<TDef::Terminal>,
{
    /// Create a parser engine using the specified parse table.
    pub fn new(definition: TDef) -> Self {
        let initial_state = definition.initial_state();
        Self {
            definition,
            states_stack: vec![initial_state],
            values_stack: vec![],
            lookahead: None,
            accepted: false,
            failed: false,
        }
    }

    /// Return the depth of the state stack.
    pub fn states_len(&self) -> usize {
        self.states_stack.len()
    }

    /// Return the depth of the semantic value stack.
    pub fn values_len(&self) -> usize {
        self.values_stack.len()
    }

    /// Drive the automaton until the input is accepted or rejected.
    pub fn parse<I, S>(
        mut self,
        tokens: I,
        semantics: &mut S,
    ) -> Result<TValue, ParseError<S::Error>>
    where
        I: IntoIterator<Item = TTok>,
        S: Semantics<TDef, TTok, Value = TValue>,
    {
        let span = tracing::trace_span!("parse");
        let _entered = span.enter();

        let mut tokens = tokens.into_iter();
        loop {
            if let Step::Accepted(value) = self.step(&mut tokens, semantics)? {
                return Ok(value);
            }
        }
    }

    /// Perform exactly one shift or reduce action.
    ///
    /// At most one token is pulled from `tokens`, and only when no
    /// lookahead token has been peeked yet. Once a step has failed, every
    /// later step returns [`ParseError::AlreadyFailed`].
    pub fn step<I, S>(
        &mut self,
        tokens: &mut I,
        semantics: &mut S,
    ) -> Result<Step<TValue>, ParseError<S::Error>>
    where
        I: Iterator<Item = TTok>,
        S: Semantics<TDef, TTok, Value = TValue>,
    {
        if self.accepted {
            return Err(ParseError::AlreadyAccepted);
        }
        if self.failed {
            return Err(ParseError::AlreadyFailed);
        }

        let result = self.transition(tokens, semantics);
        if result.is_err() {
            self.failed = true;
        }
        result
    }

    fn transition<I, S>(
        &mut self,
        tokens: &mut I,
        semantics: &mut S,
    ) -> Result<Step<TValue>, ParseError<S::Error>>
    where
        I: Iterator<Item = TTok>,
        S: Semantics<TDef, TTok, Value = TValue>,
    {
        let current = *self
            .states_stack
            .last()
            .ok_or(ParseError::EmptyStateStack)?;

        if self.lookahead.is_none() {
            self.lookahead = Some(tokens.next());
        }
        let lookahead = match self.lookahead {
            Some(Some(ref token)) => Some(token.to_index()),
            _ => None,
        };

        match self.definition.action(current, lookahead) {
            ParseAction::Shift(next) => {
                let token = match self.lookahead.take() {
                    Some(Some(token)) => token,
                    _ => {
                        // The end of input can never be shifted.
                        return Err(ParseError::Syntax(semantics.unexpected_eoi()));
                    }
                };
                tracing::trace!("shift");
                let value = semantics.shift(token).map_err(ParseError::Action)?;
                self.values_stack.push(value);
                self.states_stack.push(next);
                Ok(Step::Shifted)
            }

            ParseAction::Reduce(production, lhs, n) => {
                tracing::trace!(arity = n, "reduce");
                if self.values_stack.len() < n {
                    return Err(ParseError::EmptyValueStack);
                }
                if self.states_stack.len() <= n {
                    return Err(ParseError::EmptyStateStack);
                }
                let args = self.values_stack.split_off(self.values_stack.len() - n);
                self.states_stack.truncate(self.states_stack.len() - n);

                let value = semantics
                    .reduce(production, args)
                    .map_err(ParseError::Action)?;

                if lookahead.is_none() && lhs == self.definition.start_symbol() {
                    tracing::trace!("accept");
                    self.accepted = true;
                    return Ok(Step::Accepted(value));
                }

                let current = *self
                    .states_stack
                    .last()
                    .ok_or(ParseError::EmptyStateStack)?;
                match self.definition.goto(current, lhs) {
                    Some(next) => {
                        self.values_stack.push(value);
                        self.states_stack.push(next);
                        Ok(Step::Reduced)
                    }
                    None => Err(self.reject(semantics)),
                }
            }

            _ => Err(self.reject(semantics)),
        }
    }

    fn reject<S>(&self, semantics: &mut S) -> ParseError<S::Error>
    where
        S: Semantics<TDef, TTok, Value = TValue>,
    {
        tracing::trace!("reject");
        match self.lookahead {
            Some(Some(ref token)) => ParseError::Syntax(semantics.unexpected_token(token)),
            _ => ParseError::Syntax(semantics.unexpected_eoi()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError<E: fmt::Display> {
    /// The input was rejected; carries the diagnostic from the error callbacks.
    #[error("syntax error: {}", _0)]
    Syntax(E),

    /// A semantic action failed.
    #[error("from semantic action: {}", _0)]
    Action(E),

    #[error("empty state stack")]
    EmptyStateStack,

    #[error("empty value stack")]
    EmptyValueStack,

    #[error("already accepted")]
    AlreadyAccepted,

    #[error("already failed")]
    AlreadyFailed,
}

impl<E: fmt::Display> ParseError<E> {
    /// Return `true` if this error is a rejection of the input.
    pub fn is_syntax_error(&self) -> bool {
        matches!(self, Self::Syntax(..))
    }
}
