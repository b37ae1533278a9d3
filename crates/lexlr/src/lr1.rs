//! The implementation of canonical LR(1) parse table generation.

use crate::{
    first_sets::FirstSets,
    grammar::{Grammar, NonterminalID, ProductionID, SymbolID, TerminalID},
    types::{Map, Queue},
    util::display_fn,
};
use lexlr_runtime::definition::ParseAction;
use std::{collections::BTreeSet, fmt};

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("the start symbol `{}' appears on the right-hand side of `{}'", symbol, production)]
    StartSymbolOnRight { symbol: String, production: String },

    #[error("the grammar is not LR(1): state {}: {}", state, description)]
    ActionConflict {
        state: StateID,
        lookahead: Option<TerminalID>,
        existing: Action,
        incoming: Action,
        description: String,
    },

    #[error("state {} has conflicting gotos on `{}': {} and {}", state, symbol, existing, incoming)]
    GotoConflict {
        state: StateID,
        symbol: String,
        existing: StateID,
        incoming: StateID,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct StateID {
    raw: u32,
}

impl StateID {
    pub const START: Self = Self::new(0);

    const fn new(raw: u32) -> Self {
        Self { raw }
    }

    fn from_index(index: usize) -> Self {
        Self::new(u32::try_from(index).expect("too many LR(1) states"))
    }

    pub fn index(self) -> usize {
        self.raw as usize
    }
}

impl fmt::Debug for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S#{:02}", self.raw)
    }
}

impl fmt::Display for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.raw)
    }
}

/// LR(1) item.
///
/// A production with a cursor marking how many symbols of its right-hand
/// side have been matched, and the terminal expected after it (`None` for
/// the end of input).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Item {
    pub production: ProductionID,
    pub cursor: usize,
    pub lookahead: Option<TerminalID>,
}

impl Item {
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            let production = g.production(self.production);
            write!(f, "[{} :=", g.nonterminal(production.left()))?;
            for (i, symbol) in production.right().iter().enumerate() {
                if i == self.cursor {
                    f.write_str(" .")?;
                }
                write!(f, " {}", g.symbol_name(*symbol))?;
            }
            if self.cursor == production.right().len() {
                f.write_str(" .")?;
            }
            match self.lookahead {
                Some(t) => write!(f, ", {}]", g.terminal(t)),
                None => f.write_str(", $eoi]"),
            }
        })
    }
}

pub type ItemSet = BTreeSet<Item>;

/// The content of a cell in the ACTION table.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Action {
    /// Read the lookahead symbol and transition to the specified state.
    Shift(StateID),
    /// Reduce to the specified production rule.
    Reduce(ProductionID),
    /// No legal action.
    Error,
}

impl Action {
    fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| match self {
            Action::Shift(next) => write!(f, "shift({})", next),
            Action::Reduce(p) => write!(f, "reduce({})", g.production(*p).display(g)),
            Action::Error => f.write_str("error"),
        })
    }
}

/// The ACTION and GOTO tables derived from a grammar.
#[derive(Debug)]
pub struct ParseTable {
    states: Vec<ItemSet>,
    // column 0 is the end of input, column `t` is `TerminalID::from_raw(t)`.
    actions: Vec<Vec<Action>>,
    gotos: Vec<Vec<Option<StateID>>>,
    // (left-hand side, length of right-hand side) per production.
    productions: Vec<(NonterminalID, usize)>,
    start_symbol: NonterminalID,
}

impl ParseTable {
    /// Build the canonical LR(1) tables of `grammar`.
    ///
    /// Fails when some ACTION or GOTO cell would receive two different
    /// entries, that is, when the grammar is not LR(1).
    #[tracing::instrument(skip_all)]
    pub fn generate(grammar: &Grammar) -> Result<Self, TableError> {
        let first_sets = FirstSets::new(grammar);
        let mut gen = TableGenerator::new(grammar, &first_sets)?;
        gen.populate_states()?;
        Ok(gen.finish())
    }

    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    /// Return the LR(1) items of the specified state.
    pub fn items(&self, state: StateID) -> Option<&ItemSet> {
        self.states.get(state.index())
    }

    pub fn start_symbol(&self) -> NonterminalID {
        self.start_symbol
    }

    pub fn num_productions(&self) -> usize {
        self.productions.len()
    }

    /// Return the left-hand side and the length of the right-hand side of a production.
    pub fn production(&self, id: ProductionID) -> Option<(NonterminalID, usize)> {
        self.productions.get(usize::from(id.into_raw())).copied()
    }

    pub fn action(&self, state: StateID, lookahead: Option<TerminalID>) -> Action {
        self.action_cell(state, lookahead)
    }

    pub fn goto(&self, state: StateID, symbol: NonterminalID) -> Option<StateID> {
        self.goto_cell(state, symbol)
    }

    fn action_cell(&self, state: StateID, lookahead: Option<TerminalID>) -> Action {
        let column = lookahead.map_or(0, |t| usize::from(t.into_raw()));
        self.actions
            .get(state.index())
            .and_then(|row| row.get(column))
            .copied()
            .unwrap_or(Action::Error)
    }

    fn goto_cell(&self, state: StateID, symbol: NonterminalID) -> Option<StateID> {
        self.gotos
            .get(state.index())
            .and_then(|row| row.get(usize::from(symbol.into_raw())))
            .copied()
            .flatten()
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            for (i, items) in self.states.iter().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }
                let state = StateID::from_index(i);

                writeln!(f, "#### State {}", state)?;
                writeln!(f, "## items")?;
                for item in items {
                    writeln!(f, "- {}", item.display(g))?;
                }

                writeln!(f, "## actions")?;
                for (column, action) in self.actions[i].iter().enumerate() {
                    if let Action::Error = action {
                        continue;
                    }
                    if column == 0 {
                        write!(f, "- $eoi")?;
                    } else {
                        let t = TerminalID::from_raw(column as u16);
                        write!(f, "- {}", g.terminal(t))?;
                    }
                    writeln!(f, " => {}", action.display(g))?;
                }

                writeln!(f, "## gotos")?;
                for n in g.nonterminals() {
                    if let Some(next) = self.goto_cell(state, n.id()) {
                        writeln!(f, "- {} => goto({})", n, next)?;
                    }
                }
            }
            Ok(())
        })
    }
}

impl lexlr_runtime::ParseTable for ParseTable {
    type State = StateID;
    type Terminal = TerminalID;
    type Nonterminal = NonterminalID;
    type Production = ProductionID;

    fn initial_state(&self) -> StateID {
        StateID::START
    }

    fn start_symbol(&self) -> NonterminalID {
        self.start_symbol
    }

    fn action(
        &self,
        current: StateID,
        lookahead: Option<TerminalID>,
    ) -> ParseAction<StateID, ProductionID, NonterminalID> {
        match self.action_cell(current, lookahead) {
            Action::Shift(next) => ParseAction::Shift(next),
            Action::Reduce(p) => match self.production(p) {
                Some((left, n)) => ParseAction::Reduce(p, left, n),
                None => ParseAction::Error,
            },
            Action::Error => ParseAction::Error,
        }
    }

    fn goto(&self, current: StateID, symbol: NonterminalID) -> Option<StateID> {
        self.goto_cell(current, symbol)
    }
}

// === TableGenerator ===

#[derive(Debug)]
struct TableGenerator<'g> {
    grammar: &'g Grammar,
    first_sets: &'g FirstSets,
    states: Vec<ItemSet>,
    state_ids: Map<ItemSet, StateID>,
    pending: Queue<StateID>,
    actions: Vec<Vec<Action>>,
    gotos: Vec<Vec<Option<StateID>>>,
    num_terminal_columns: usize,
    num_nonterminals: usize,
}

impl<'g> TableGenerator<'g> {
    fn new(grammar: &'g Grammar, first_sets: &'g FirstSets) -> Result<Self, TableError> {
        let start = grammar.start_symbol();
        for production in grammar.productions() {
            if production.right().contains(&SymbolID::N(start)) {
                return Err(TableError::StartSymbolOnRight {
                    symbol: grammar.nonterminal(start).to_string(),
                    production: production.display(grammar).to_string(),
                });
            }
        }

        let num_terminal_columns = 1 + grammar
            .terminals()
            .map(|t| usize::from(t.id().into_raw()))
            .max()
            .unwrap_or(0);
        let num_nonterminals = grammar
            .nonterminals()
            .map(|n| usize::from(n.id().into_raw()) + 1)
            .max()
            .unwrap_or(0);

        let mut gen = Self {
            grammar,
            first_sets,
            states: vec![],
            state_ids: Map::default(),
            pending: Queue::default(),
            actions: vec![],
            gotos: vec![],
            num_terminal_columns,
            num_nonterminals,
        };

        let seeds = grammar.productions_of(start).map(|p| Item {
            production: p.id(),
            cursor: 0,
            lookahead: None,
        });
        let initial = gen.closure(seeds);
        gen.intern(initial);
        Ok(gen)
    }

    /// Expand the item set until every nonterminal after a cursor has its productions.
    fn closure<I>(&self, seeds: I) -> ItemSet
    where
        I: IntoIterator<Item = Item>,
    {
        let mut items = ItemSet::new();
        let mut stack = vec![];
        for item in seeds {
            if items.insert(item) {
                stack.push(item);
            }
        }

        while let Some(item) = stack.pop() {
            let production = self.grammar.production(item.production);

            // [A := ... . B beta, a]
            let (b, beta) = match &production.right()[item.cursor..] {
                [SymbolID::N(b), beta @ ..] => (*b, beta),
                _ => continue,
            };

            // lookaheads = First(beta a)
            let (first, nullable) = self.first_sets.first_of(beta);
            let mut lookaheads: Vec<Option<TerminalID>> = first.iter().map(Some).collect();
            if nullable && !lookaheads.contains(&item.lookahead) {
                lookaheads.push(item.lookahead);
            }

            for production in self.grammar.productions_of(b) {
                for &lookahead in &lookaheads {
                    let new_item = Item {
                        production: production.id(),
                        cursor: 0,
                        lookahead,
                    };
                    if items.insert(new_item) {
                        stack.push(new_item);
                    }
                }
            }
        }

        items
    }

    /// Return the ID of the state with the specified items, registering it if not seen yet.
    fn intern(&mut self, items: ItemSet) -> StateID {
        if let Some(&id) = self.state_ids.get(&items) {
            return id;
        }
        let id = StateID::from_index(self.states.len());
        tracing::trace!(state = %id, items = items.len(), "new LR(1) state");
        self.state_ids.insert(items.clone(), id);
        self.states.push(items);
        self.actions
            .push(vec![Action::Error; self.num_terminal_columns]);
        self.gotos.push(vec![None; self.num_nonterminals]);
        self.pending.push(id);
        id
    }

    fn populate_states(&mut self) -> Result<(), TableError> {
        while let Some(current) = self.pending.pop() {
            let items = self.states[current.index()].clone();

            // reduce
            for item in &items {
                let production = self.grammar.production(item.production);
                if item.cursor == production.right().len() {
                    self.set_action(current, item.lookahead, Action::Reduce(item.production))?;
                }
            }

            // shift, goto
            let mut kernels: Map<SymbolID, Vec<Item>> = Map::default();
            for item in &items {
                let production = self.grammar.production(item.production);
                if let Some(symbol) = production.right().get(item.cursor) {
                    kernels.entry(*symbol).or_default().push(Item {
                        cursor: item.cursor + 1,
                        ..*item
                    });
                }
            }
            for (symbol, kernel) in kernels {
                let next_items = self.closure(kernel);
                let next = self.intern(next_items);
                match symbol {
                    SymbolID::T(t) => self.set_action(current, Some(t), Action::Shift(next))?,
                    SymbolID::N(n) => self.set_goto(current, n, next)?,
                }
            }
        }
        Ok(())
    }

    fn set_action(
        &mut self,
        state: StateID,
        lookahead: Option<TerminalID>,
        action: Action,
    ) -> Result<(), TableError> {
        let column = lookahead.map_or(0, |t| usize::from(t.into_raw()));
        let cell = &mut self.actions[state.index()][column];
        match *cell {
            Action::Error => {
                *cell = action;
                Ok(())
            }
            existing if existing == action => Ok(()),
            existing => {
                let g = self.grammar;
                let lookahead_name = match lookahead {
                    Some(t) => g.terminal(t).to_string(),
                    None => "$eoi".into(),
                };
                Err(TableError::ActionConflict {
                    state,
                    lookahead,
                    existing,
                    incoming: action,
                    description: format!(
                        "{} and {} on `{}'",
                        existing.display(g),
                        action.display(g),
                        lookahead_name
                    ),
                })
            }
        }
    }

    fn set_goto(
        &mut self,
        state: StateID,
        symbol: NonterminalID,
        next: StateID,
    ) -> Result<(), TableError> {
        let cell = &mut self.gotos[state.index()][usize::from(symbol.into_raw())];
        match *cell {
            None => {
                *cell = Some(next);
                Ok(())
            }
            Some(existing) if existing == next => Ok(()),
            Some(existing) => Err(TableError::GotoConflict {
                state,
                symbol: self.grammar.nonterminal(symbol).to_string(),
                existing,
                incoming: next,
            }),
        }
    }

    fn finish(self) -> ParseTable {
        tracing::debug!(num_states = self.states.len(), "generated LR(1) table");
        let productions = self
            .grammar
            .productions()
            .map(|p| (p.left(), p.right().len()))
            .collect();
        ParseTable {
            states: self.states,
            actions: self.actions,
            gotos: self.gotos,
            productions,
            start_symbol: self.grammar.start_symbol(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum_grammar() -> Grammar {
        // S := E
        // E := E PLUS NUM | NUM
        Grammar::define(|g| {
            let num = g.terminal("NUM")?;
            let plus = g.terminal("PLUS")?;
            let s = g.nonterminal("S")?;
            let e = g.nonterminal("E")?;
            g.rule(s, [SymbolID::N(e)])?;
            g.rule(e, [SymbolID::N(e), SymbolID::T(plus), SymbolID::T(num)])?;
            g.rule(e, [SymbolID::T(num)])?;
            g.start_symbol(s)?;
            Ok(())
        })
        .unwrap()
    }

    #[test]
    fn sum_table() {
        let grammar = sum_grammar();
        let table = ParseTable::generate(&grammar).unwrap();
        let num = grammar.terminal_by_name("NUM").unwrap();
        let plus = grammar.terminal_by_name("PLUS").unwrap();
        let e = grammar.nonterminal_by_name("E").unwrap();

        // 0: initial, 1: goto E, 2: shift NUM, then E PLUS . NUM and E PLUS NUM .
        assert_eq!(table.num_states(), 5);
        assert!(matches!(table.action(StateID::START, Some(num)), Action::Shift(_)));
        assert_eq!(table.action(StateID::START, Some(plus)), Action::Error);
        assert_eq!(table.action(StateID::START, None), Action::Error);

        let after_e = table.goto(StateID::START, e).unwrap();
        assert!(matches!(table.action(after_e, None), Action::Reduce(_)));
        assert!(matches!(table.action(after_e, Some(plus)), Action::Shift(_)));
    }

    #[test]
    fn closure_propagates_lookaheads() {
        // S := C C
        // C := c C | d
        let grammar = Grammar::define(|g| {
            let c = g.terminal("c")?;
            let d = g.terminal("d")?;
            let s = g.nonterminal("S")?;
            let n_c = g.nonterminal("C")?;
            g.rule(s, [SymbolID::N(n_c), SymbolID::N(n_c)])?;
            g.rule(n_c, [SymbolID::T(c), SymbolID::N(n_c)])?;
            g.rule(n_c, [SymbolID::T(d)])?;
            Ok(())
        })
        .unwrap();
        let table = ParseTable::generate(&grammar).unwrap();
        assert_eq!(table.num_states(), 9);

        let d = grammar.terminal_by_name("d").unwrap();
        let initial = table.items(StateID::START).unwrap();
        // [S := . C C, $], and [C := . c C, c/d], [C := . d, c/d]
        assert_eq!(initial.len(), 5);
        assert_eq!(
            initial.iter().filter(|item| item.lookahead == Some(d)).count(),
            2
        );
        assert!(matches!(table.action(StateID::START, Some(d)), Action::Shift(_)));
    }

    #[test]
    fn nullable_rules_reduce_on_follow() {
        // S := L
        // L := @empty | L NUM
        let grammar = Grammar::define(|g| {
            let num = g.terminal("NUM")?;
            let s = g.nonterminal("S")?;
            let l = g.nonterminal("L")?;
            g.rule(s, [SymbolID::N(l)])?;
            g.rule(l, [])?;
            g.rule(l, [SymbolID::N(l), SymbolID::T(num)])?;
            Ok(())
        })
        .unwrap();
        let num = grammar.terminal_by_name("NUM").unwrap();
        let l = grammar.nonterminal_by_name("L").unwrap();
        let empty = grammar
            .productions_of(l)
            .find(|p| p.right().is_empty())
            .unwrap()
            .id();

        let table = ParseTable::generate(&grammar).unwrap();
        assert_eq!(table.action(StateID::START, None), Action::Reduce(empty));
        assert_eq!(table.action(StateID::START, Some(num)), Action::Reduce(empty));
    }

    #[test]
    fn ambiguous_grammar_is_rejected() {
        // S := E
        // E := E PLUS E | NUM
        let grammar = Grammar::define(|g| {
            let num = g.terminal("NUM")?;
            let plus = g.terminal("PLUS")?;
            let s = g.nonterminal("S")?;
            let e = g.nonterminal("E")?;
            g.rule(s, [SymbolID::N(e)])?;
            g.rule(e, [SymbolID::N(e), SymbolID::T(plus), SymbolID::N(e)])?;
            g.rule(e, [SymbolID::T(num)])?;
            Ok(())
        })
        .unwrap();
        let plus = grammar.terminal_by_name("PLUS").unwrap();

        match ParseTable::generate(&grammar) {
            Err(TableError::ActionConflict {
                lookahead,
                existing,
                incoming,
                ..
            }) => {
                assert_eq!(lookahead, Some(plus));
                let kinds = [existing, incoming];
                assert!(kinds.iter().any(|a| matches!(a, Action::Shift(_))));
                assert!(kinds.iter().any(|a| matches!(a, Action::Reduce(_))));
            }
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn indistinguishable_productions_are_rejected() {
        // S := A | B
        // A := a
        // B := a
        let grammar = Grammar::define(|g| {
            let a = g.terminal("a")?;
            let s = g.nonterminal("S")?;
            let n_a = g.nonterminal("A")?;
            let n_b = g.nonterminal("B")?;
            g.rule(s, [SymbolID::N(n_a)])?;
            g.rule(s, [SymbolID::N(n_b)])?;
            g.rule(n_a, [SymbolID::T(a)])?;
            g.rule(n_b, [SymbolID::T(a)])?;
            Ok(())
        })
        .unwrap();

        let err = ParseTable::generate(&grammar).unwrap_err();
        assert!(matches!(
            err,
            TableError::ActionConflict {
                lookahead: None,
                existing: Action::Reduce(_),
                incoming: Action::Reduce(_),
                ..
            }
        ));
        assert!(err.to_string().contains("reduce(A := a)"));
    }

    #[test]
    fn start_symbol_on_right_is_rejected() {
        // S := S a | a
        let grammar = Grammar::define(|g| {
            let a = g.terminal("a")?;
            let s = g.nonterminal("S")?;
            g.rule(s, [SymbolID::N(s), SymbolID::T(a)])?;
            g.rule(s, [SymbolID::T(a)])?;
            Ok(())
        })
        .unwrap();
        assert!(matches!(
            ParseTable::generate(&grammar),
            Err(TableError::StartSymbolOnRight { .. })
        ));
    }

    #[test]
    fn display_table() {
        let grammar = sum_grammar();
        let table = ParseTable::generate(&grammar).unwrap();
        let dump = table.display(&grammar).to_string();
        assert!(dump.starts_with("#### State 00\n## items\n"));
        assert!(dump.contains("- [S := . E, $eoi]"));
        assert!(dump.contains("- NUM => shift("));
        assert!(dump.contains("- E => goto(01)"));
    }
}
