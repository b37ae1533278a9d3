//! Calculation of first set function.

use crate::{
    grammar::{Grammar, NonterminalID, SymbolID, TerminalSet},
    types::{Map, Set},
    util::display_fn,
};
use std::fmt;

#[derive(Debug)]
pub struct FirstSets {
    first_sets: Map<NonterminalID, TerminalSet>,
    nulls: Set<NonterminalID>,
}

impl FirstSets {
    #[tracing::instrument(skip_all)]
    pub fn new(grammar: &Grammar) -> Self {
        let mut this = Self {
            first_sets: grammar
                .nonterminals()
                .map(|n| (n.id(), TerminalSet::default()))
                .collect(),
            nulls: Set::default(),
        };

        // Rescan every production until no FIRST set or nullability grows.
        let mut total = 0;
        let mut passes = 0;
        loop {
            passes += 1;
            for production in grammar.productions() {
                let (first, nullable) = this.first_of(production.right());
                let left = production.left();
                if let Some(set) = this.first_sets.get_mut(&left) {
                    set.union_with(&first);
                }
                if nullable {
                    this.nulls.insert(left);
                }
            }

            let new_total = this.nulls.len()
                + this
                    .first_sets
                    .values()
                    .map(TerminalSet::len)
                    .sum::<usize>();
            if new_total == total {
                break;
            }
            total = new_total;
        }
        tracing::debug!(passes, "FIRST sets converged");

        this
    }

    /// Return `FIRST(n)`.
    pub fn first(&self, n: NonterminalID) -> Option<&TerminalSet> {
        self.first_sets.get(&n)
    }

    pub fn is_nullable(&self, n: NonterminalID) -> bool {
        self.nulls.contains(&n)
    }

    /// Return the FIRST set of a symbol sequence and whether the whole sequence is nullable.
    pub fn first_of(&self, symbols: &[SymbolID]) -> (TerminalSet, bool) {
        let mut first = TerminalSet::default();
        for symbol in symbols {
            match symbol {
                SymbolID::T(t) => {
                    first.insert(*t);
                    return (first, false);
                }
                SymbolID::N(n) => {
                    if let Some(set) = self.first_sets.get(n) {
                        first.union_with(set);
                    }
                    if !self.nulls.contains(n) {
                        return (first, false);
                    }
                }
            }
        }
        (first, true)
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for (n, set) in &self.first_sets {
                write!(f, "{}: {{", g.nonterminal(*n))?;
                for (i, t) in set.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", g.terminal(t))?;
                }
                f.write_str("}")?;
                if self.is_nullable(*n) {
                    f.write_str(" (nullable)")?;
                }
                writeln!(f)?;
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::TerminalID;

    fn set(ids: &[TerminalID]) -> TerminalSet {
        ids.iter().copied().collect()
    }

    #[test]
    fn left_recursion() {
        // S := a | S b
        let mut ids = None;
        let grammar = Grammar::define(|g| {
            let a = g.terminal("a")?;
            let b = g.terminal("b")?;
            let s = g.nonterminal("S")?;
            g.rule(s, [SymbolID::T(a)])?;
            g.rule(s, [SymbolID::N(s), SymbolID::T(b)])?;
            ids = Some((a, s));
            Ok(())
        })
        .unwrap();
        let (a, s) = ids.unwrap();

        let first_sets = FirstSets::new(&grammar);
        assert_eq!(first_sets.first(s), Some(&set(&[a])));
        assert!(!first_sets.is_nullable(s));
    }

    #[test]
    fn nullable_alternative() {
        // S := @empty | a
        let mut ids = None;
        let grammar = Grammar::define(|g| {
            let a = g.terminal("a")?;
            let s = g.nonterminal("S")?;
            g.rule(s, [])?;
            g.rule(s, [SymbolID::T(a)])?;
            ids = Some((a, s));
            Ok(())
        })
        .unwrap();
        let (a, s) = ids.unwrap();

        let first_sets = FirstSets::new(&grammar);
        assert_eq!(first_sets.first(s), Some(&set(&[a])));
        assert!(first_sets.is_nullable(s));
    }

    #[test]
    fn sequences_through_nullable_prefixes() {
        // S := A B c
        // A := @empty | a
        // B := @empty | b
        let mut ids = None;
        let grammar = Grammar::define(|g| {
            let a = g.terminal("a")?;
            let b = g.terminal("b")?;
            let c = g.terminal("c")?;
            let s = g.nonterminal("S")?;
            let n_a = g.nonterminal("A")?;
            let n_b = g.nonterminal("B")?;
            g.rule(s, [SymbolID::N(n_a), SymbolID::N(n_b), SymbolID::T(c)])?;
            g.rule(n_a, [])?;
            g.rule(n_a, [SymbolID::T(a)])?;
            g.rule(n_b, [])?;
            g.rule(n_b, [SymbolID::T(b)])?;
            ids = Some((a, b, c, s, n_a, n_b));
            Ok(())
        })
        .unwrap();
        let (a, b, c, s, n_a, n_b) = ids.unwrap();

        let first_sets = FirstSets::new(&grammar);
        assert_eq!(first_sets.first(s), Some(&set(&[a, b, c])));
        assert!(!first_sets.is_nullable(s));

        let (first, nullable) = first_sets.first_of(&[SymbolID::N(n_a), SymbolID::N(n_b)]);
        assert_eq!(first, set(&[a, b]));
        assert!(nullable);

        let (first, nullable) = first_sets.first_of(&[]);
        assert!(first.is_empty());
        assert!(nullable);
    }
}
