//! Parser definition.

/// The trait for abstracting the LR(1) parse table.
pub trait ParseTable {
    /// The number to identify the state of LR(1) automaton.
    type State: Copy;

    /// The number to identify the terminal symbols.
    type Terminal: Copy;

    /// The number to identify the nonterminal symbols.
    type Nonterminal: Copy + PartialEq;

    /// The handle of production rules passed to the semantic actions.
    type Production: Copy;

    /// Return the initial state number.
    fn initial_state(&self) -> Self::State;

    /// Return the goal symbol of this table.
    fn start_symbol(&self) -> Self::Nonterminal;

    /// Return the action corresponding to the specified state number and
    /// lookahead symbol.
    ///
    /// If there is no lookahead symbol, a `None` is passsed as the end of input.
    fn action(
        &self,
        current: Self::State,
        lookahead: Option<Self::Terminal>,
    ) -> ParseAction<Self::State, Self::Production, Self::Nonterminal>;

    /// Return the destination state after reducing to `symbol` in the state `current`.
    fn goto(&self, current: Self::State, symbol: Self::Nonterminal) -> Option<Self::State>;
}

macro_rules! impl_parse_table_for_pointer {
    ($($ptr:ty),*) => {$(
        impl<T: ?Sized> ParseTable for $ptr
        where
            T: ParseTable,
        {
            type State = T::State;
            type Terminal = T::Terminal;
            type Nonterminal = T::Nonterminal;
            type Production = T::Production;

            fn initial_state(&self) -> Self::State {
                (**self).initial_state()
            }

            fn start_symbol(&self) -> Self::Nonterminal {
                (**self).start_symbol()
            }

            fn action(
                &self,
                current: Self::State,
                lookahead: Option<Self::Terminal>,
            ) -> ParseAction<Self::State, Self::Production, Self::Nonterminal> {
                (**self).action(current, lookahead)
            }

            fn goto(&self, current: Self::State, symbol: Self::Nonterminal) -> Option<Self::State> {
                (**self).goto(current, symbol)
            }
        }
    )*};
}

impl_parse_table_for_pointer!(&T, std::rc::Rc<T>, std::sync::Arc<T>);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseAction<TState, TProduction, TSymbol> {
    /// Consume the lookahead token and push the specified state.
    Shift(TState),

    /// Reduce by a production, together with its left-hand side and
    /// the length of its right-hand side.
    Reduce(TProduction, TSymbol, usize),

    /// No action is defined for the lookahead symbol.
    Error,
}
