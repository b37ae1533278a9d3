//! Grammar types.

use crate::{
    syntax::{self, ast as s},
    types::Map,
    util::display_fn,
};
use std::{fmt, fs, io, path::Path};

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TerminalID {
    raw: u16,
}
impl TerminalID {
    // raw value 0 is the column of the end of input in the parse table.
    const OFFSET: u16 = 1;

    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }

    pub const fn from_raw(raw: u16) -> Self {
        debug_assert!(raw >= Self::OFFSET);
        Self::new(raw)
    }

    pub const fn into_raw(self) -> u16 {
        self.raw
    }
}
impl fmt::Debug for TerminalID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T#{:03}", self.raw)
    }
}

/// A set of terminal symbols.
#[derive(Debug, Default, Clone)]
pub struct TerminalSet {
    inner: bit_set::BitSet,
}
impl TerminalSet {
    pub fn contains(&self, id: TerminalID) -> bool {
        self.inner.contains(id.raw.into())
    }
    pub fn insert(&mut self, id: TerminalID) -> bool {
        self.inner.insert(id.raw.into())
    }
    pub fn union_with(&mut self, other: &Self) {
        self.inner.union_with(&other.inner)
    }
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
    pub fn len(&self) -> usize {
        self.inner.len()
    }
    pub fn iter(&self) -> impl Iterator<Item = TerminalID> + '_ {
        // only values converted from `u16` are ever inserted.
        self.inner.iter().map(|raw| TerminalID::new(raw as u16))
    }
}
impl PartialEq for TerminalSet {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}
impl Eq for TerminalSet {}
impl FromIterator<TerminalID> for TerminalSet {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = TerminalID>,
    {
        Self {
            inner: iter.into_iter().map(|t| t.raw.into()).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Terminal {
    id: TerminalID,
    name: String,
}
impl Terminal {
    pub fn id(&self) -> TerminalID {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
}
impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NonterminalID {
    raw: u16,
}
impl NonterminalID {
    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }

    pub const fn from_raw(raw: u16) -> Self {
        Self::new(raw)
    }

    pub const fn into_raw(self) -> u16 {
        self.raw
    }
}
impl fmt::Debug for NonterminalID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N#{:03}", self.raw)
    }
}

#[derive(Debug, Clone)]
pub struct Nonterminal {
    id: NonterminalID,
    name: String,
}
impl Nonterminal {
    pub fn id(&self) -> NonterminalID {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
}
impl fmt::Display for Nonterminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SymbolID {
    T(TerminalID),
    N(NonterminalID),
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ProductionID {
    raw: u16,
}
impl ProductionID {
    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }

    pub const fn into_raw(self) -> u16 {
        self.raw
    }
}
impl fmt::Debug for ProductionID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P#{:03}", self.raw)
    }
}

/// The type that represents a production rule in grammar.
#[derive(Debug, Clone)]
pub struct Production {
    id: ProductionID,
    left: NonterminalID,
    right: Vec<SymbolID>,
}
impl Production {
    pub fn id(&self) -> ProductionID {
        self.id
    }

    /// Return the left-hand side of this production.
    pub fn left(&self) -> NonterminalID {
        self.left
    }

    /// Return the right-hand side of this production.
    pub fn right(&self) -> &[SymbolID] {
        &self.right[..]
    }

    // `"LHS := R1 R2 R3"`
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            write!(f, "{} := ", g.nonterminals[&self.left])?;
            if self.right.is_empty() {
                return f.write_str("@empty");
            }
            for (i, symbol) in self.right.iter().enumerate() {
                if i > 0 {
                    f.write_str(" ")?;
                }
                write!(f, "{}", g.symbol_name(*symbol))?;
            }
            Ok(())
        })
    }
}

/// The grammar definition used to derive the parser tables.
///
/// A grammar cannot be modified once defined. [`Grammar::with_production`]
/// consumes the grammar and returns an extended one.
#[derive(Debug, Clone)]
pub struct Grammar {
    terminals: Map<TerminalID, Terminal>,
    nonterminals: Map<NonterminalID, Nonterminal>,
    productions: Map<ProductionID, Production>,
    productions_by_left: Map<NonterminalID, Vec<ProductionID>>,
    used_terminals: TerminalSet,
    start_symbol: NonterminalID,
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## terminals:")?;
        for terminal in self.terminals.values() {
            write!(f, "{}", terminal)?;
            if !self.used_terminals.contains(terminal.id) {
                write!(f, " (unused)")?;
            }
            writeln!(f)?;
        }

        writeln!(f, "\n## nonterminals:")?;
        for nonterminal in self.nonterminals.values() {
            write!(f, "{}", nonterminal)?;
            if nonterminal.id == self.start_symbol {
                write!(f, " (start)")?;
            }
            writeln!(f)?;
        }

        writeln!(f, "\n## productions:")?;
        for production in self.productions.values() {
            writeln!(f, "{}", production.display(self))?;
        }

        Ok(())
    }
}

impl Grammar {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Grammar, GrammarDefError> {
        let source = fs::read_to_string(path).map_err(GrammarDefError::IO)?;
        Self::from_str(&source)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(source: &str) -> Result<Grammar, GrammarDefError> {
        let grammar = syntax::parse(source).map_err(GrammarDefError::Syntax)?;
        Grammar::define(|g| define_grammar_from_syntax(g, grammar))
    }

    /// Define a grammar using the specified function.
    pub fn define<F>(f: F) -> Result<Self, GrammarDefError>
    where
        F: FnOnce(&mut GrammarDef) -> Result<(), GrammarDefError>,
    {
        let mut def = GrammarDef {
            terminals: Map::default(),
            nonterminals: Map::default(),
            productions: Map::default(),
            start: None,
            next_terminal_id: TerminalID::OFFSET,
            next_nonterminal_id: 0,
            next_production_id: 0,
        };
        f(&mut def)?;
        def.end()
    }

    pub fn terminals(&self) -> impl Iterator<Item = &Terminal> + '_ {
        self.terminals.values()
    }

    pub fn nonterminals(&self) -> impl Iterator<Item = &Nonterminal> + '_ {
        self.nonterminals.values()
    }

    pub fn productions(&self) -> impl Iterator<Item = &Production> + '_ {
        self.productions.values()
    }

    pub fn terminal(&self, id: TerminalID) -> &Terminal {
        &self.terminals[&id]
    }

    pub fn nonterminal(&self, id: NonterminalID) -> &Nonterminal {
        &self.nonterminals[&id]
    }

    pub fn production(&self, id: ProductionID) -> &Production {
        &self.productions[&id]
    }

    /// Return the productions whose left-hand side is `n`, in definition order.
    pub fn productions_of(&self, n: NonterminalID) -> impl Iterator<Item = &Production> + '_ {
        self.productions_by_left
            .get(&n)
            .into_iter()
            .flatten()
            .map(|id| &self.productions[id])
    }

    pub fn start_symbol(&self) -> NonterminalID {
        self.start_symbol
    }

    /// Return the set of terminals appearing in the right-hand side of some production.
    pub fn used_terminals(&self) -> &TerminalSet {
        &self.used_terminals
    }

    pub fn terminal_by_name(&self, name: &str) -> Option<TerminalID> {
        self.terminals
            .values()
            .find(|t| t.name == name)
            .map(|t| t.id)
    }

    pub fn nonterminal_by_name(&self, name: &str) -> Option<NonterminalID> {
        self.nonterminals
            .values()
            .find(|n| n.name == name)
            .map(|n| n.id)
    }

    pub fn symbol_name(&self, symbol: SymbolID) -> &str {
        match symbol {
            SymbolID::T(t) => &self.terminals[&t].name,
            SymbolID::N(n) => &self.nonterminals[&n].name,
        }
    }

    /// Return a new grammar with an additional production.
    ///
    /// Only the added production is checked: its symbols must be declared
    /// and every nonterminal on its right-hand side must already own a
    /// production (or be its own left-hand side).
    pub fn with_production<I>(
        mut self,
        left: NonterminalID,
        right: I,
    ) -> Result<(Self, ProductionID), GrammarDefError>
    where
        I: IntoIterator<Item = SymbolID>,
    {
        let right: Vec<SymbolID> = right.into_iter().collect();
        check_production(&self.terminals, &self.nonterminals, &self.productions, left, &right)?;
        for symbol in &right {
            if let SymbolID::N(n) = symbol {
                if *n != left && !self.productions_by_left.contains_key(n) {
                    return Err(GrammarDefError::UndefinedNonterminal {
                        name: self.nonterminals[n].name.clone(),
                    });
                }
            }
        }

        let id = ProductionID::new(next_raw(self.productions.len())?);
        for symbol in &right {
            if let SymbolID::T(t) = symbol {
                self.used_terminals.insert(*t);
            }
        }
        self.productions_by_left.entry(left).or_default().push(id);
        self.productions.insert(id, Production { id, left, right });
        Ok((self, id))
    }
}

fn define_grammar_from_syntax(g: &mut GrammarDef, grammar: s::Grammar) -> Result<(), GrammarDefError> {
    // Declarations are processed before the rules regardless of their order in the source.
    let mut symbols: Map<String, SymbolID> = Map::default();
    for stmt in &grammar.stmts {
        match stmt {
            s::Stmt::Terminals(names) => {
                for name in names {
                    let id = g.terminal(name)?;
                    symbols.insert(name.clone(), SymbolID::T(id));
                }
            }
            s::Stmt::Nonterminals(names) => {
                for name in names {
                    let id = g.nonterminal(name)?;
                    symbols.insert(name.clone(), SymbolID::N(id));
                }
            }
            _ => (),
        }
    }

    for stmt in &grammar.stmts {
        match stmt {
            s::Stmt::Start(name) => {
                let start = lookup_nonterminal(g, &mut symbols, name)?;
                g.start_symbol(start)?;
            }
            s::Stmt::Rule(s::RuleDesc { left, alternatives }) => {
                let left = lookup_nonterminal(g, &mut symbols, left)?;
                for alternative in alternatives {
                    let mut right = vec![];
                    for name in alternative {
                        let symbol = match symbols.get(name) {
                            Some(SymbolID::T(t)) => SymbolID::T(*t),
                            _ => SymbolID::N(lookup_nonterminal(g, &mut symbols, name)?),
                        };
                        right.push(symbol);
                    }
                    g.rule(left, right)?;
                }
            }
            _ => (),
        }
    }

    Ok(())
}

fn lookup_nonterminal(
    g: &mut GrammarDef,
    symbols: &mut Map<String, SymbolID>,
    name: &str,
) -> Result<NonterminalID, GrammarDefError> {
    match symbols.get(name) {
        Some(SymbolID::N(n)) => Ok(*n),
        Some(SymbolID::T(..)) => Err(format!("`{}' is declared as a terminal", name).into()),
        None => {
            // Undeclared symbols are treated as nonterminals.
            let id = g.nonterminal(name)?;
            symbols.insert(name.to_owned(), SymbolID::N(id));
            Ok(id)
        }
    }
}

/// The contextural values for building a `Grammar`.
#[derive(Debug)]
pub struct GrammarDef {
    terminals: Map<TerminalID, Terminal>,
    nonterminals: Map<NonterminalID, Nonterminal>,
    productions: Map<ProductionID, Production>,
    start: Option<NonterminalID>,
    next_terminal_id: u16,
    next_nonterminal_id: u16,
    next_production_id: u16,
}

impl GrammarDef {
    /// Declare a terminal symbol used in this grammar.
    pub fn terminal(&mut self, name: &str) -> Result<TerminalID, GrammarDefError> {
        self.check_new_name(name)?;
        let id = TerminalID::new(self.next_terminal_id);
        self.next_terminal_id = self
            .next_terminal_id
            .checked_add(1)
            .ok_or("too many terminal symbols")?;
        self.terminals.insert(
            id,
            Terminal {
                id,
                name: name.to_owned(),
            },
        );
        Ok(id)
    }

    /// Declare a nonterminal symbol used in this grammar.
    pub fn nonterminal(&mut self, name: &str) -> Result<NonterminalID, GrammarDefError> {
        self.check_new_name(name)?;
        let id = NonterminalID::new(self.next_nonterminal_id);
        self.next_nonterminal_id = self
            .next_nonterminal_id
            .checked_add(1)
            .ok_or("too many nonterminal symbols")?;
        self.nonterminals.insert(
            id,
            Nonterminal {
                id,
                name: name.to_owned(),
            },
        );
        Ok(id)
    }

    /// Specify a production rule into this grammer.
    pub fn rule<I>(&mut self, left: NonterminalID, right: I) -> Result<ProductionID, GrammarDefError>
    where
        I: IntoIterator<Item = SymbolID>,
    {
        let right: Vec<SymbolID> = right.into_iter().collect();
        check_production(&self.terminals, &self.nonterminals, &self.productions, left, &right)?;

        let id = ProductionID::new(self.next_production_id);
        self.next_production_id = self
            .next_production_id
            .checked_add(1)
            .ok_or("too many production rules")?;
        self.productions.insert(id, Production { id, left, right });
        Ok(id)
    }

    /// Specify the start symbol for this grammar.
    ///
    /// If omitted, the first declared nonterminal is used.
    pub fn start_symbol(&mut self, symbol: NonterminalID) -> Result<(), GrammarDefError> {
        if !self.nonterminals.contains_key(&symbol) {
            return Err(GrammarDefError::UnknownSymbol {
                symbol: SymbolID::N(symbol),
            });
        }
        self.start.replace(symbol);
        Ok(())
    }

    fn check_new_name(&self, name: &str) -> Result<(), GrammarDefError> {
        if !verify_ident(name) {
            return Err(GrammarDefError::InvalidName {
                name: name.to_owned(),
            });
        }
        let exists = self.terminals.values().any(|t| t.name == name)
            || self.nonterminals.values().any(|n| n.name == name);
        if exists {
            return Err(GrammarDefError::DuplicateSymbol {
                name: name.to_owned(),
            });
        }
        Ok(())
    }

    fn end(mut self) -> Result<Grammar, GrammarDefError> {
        let start = match self.start.take() {
            Some(start) => start,
            None => self
                .nonterminals
                .keys()
                .next()
                .copied()
                .ok_or(GrammarDefError::NoStartSymbol)?,
        };

        let mut productions_by_left: Map<NonterminalID, Vec<ProductionID>> = Map::default();
        let mut used_terminals = TerminalSet::default();
        for production in self.productions.values() {
            productions_by_left
                .entry(production.left)
                .or_default()
                .push(production.id);
            for symbol in &production.right {
                if let SymbolID::T(t) = symbol {
                    used_terminals.insert(*t);
                }
            }
        }

        // Every nonterminal reachable by name must be derivable into something.
        let required = Some(start).into_iter().chain(
            self.productions
                .values()
                .flat_map(|p| p.right.iter())
                .filter_map(|s| match s {
                    SymbolID::N(n) => Some(*n),
                    SymbolID::T(..) => None,
                }),
        );
        for n in required {
            if !productions_by_left.contains_key(&n) {
                return Err(GrammarDefError::UndefinedNonterminal {
                    name: self.nonterminals[&n].name.clone(),
                });
            }
        }

        Ok(Grammar {
            terminals: self.terminals,
            nonterminals: self.nonterminals,
            productions: self.productions,
            productions_by_left,
            used_terminals,
            start_symbol: start,
        })
    }
}

fn check_production(
    terminals: &Map<TerminalID, Terminal>,
    nonterminals: &Map<NonterminalID, Nonterminal>,
    productions: &Map<ProductionID, Production>,
    left: NonterminalID,
    right: &[SymbolID],
) -> Result<(), GrammarDefError> {
    let declared = |symbol: &SymbolID| match symbol {
        SymbolID::T(t) => terminals.contains_key(t),
        SymbolID::N(n) => nonterminals.contains_key(n),
    };
    if let Some(symbol) = Some(SymbolID::N(left)).iter().chain(right).find(|s| !declared(*s)) {
        return Err(GrammarDefError::UnknownSymbol { symbol: *symbol });
    }

    if productions
        .values()
        .any(|p| p.left == left && p.right == right)
    {
        let names: Vec<&str> = right
            .iter()
            .map(|s| match s {
                SymbolID::T(t) => terminals[t].name.as_str(),
                SymbolID::N(n) => nonterminals[n].name.as_str(),
            })
            .collect();
        return Err(GrammarDefError::DuplicateProduction {
            production: format!(
                "{} := {}",
                nonterminals[&left].name,
                names.join(" ")
            ),
        });
    }
    Ok(())
}

fn next_raw(len: usize) -> Result<u16, GrammarDefError> {
    u16::try_from(len).map_err(|_| "too many production rules".into())
}

#[derive(Debug, thiserror::Error)]
pub enum GrammarDefError {
    #[error("IO error: {}", _0)]
    IO(io::Error),

    #[error("invalid grammar file: {}", _0)]
    Syntax(anyhow::Error),

    #[error("incorrect symbol name: `{}'", name)]
    InvalidName { name: String },

    #[error("the symbol `{}' has already been declared", name)]
    DuplicateSymbol { name: String },

    #[error("duplicate production rule: `{}'", production)]
    DuplicateProduction { production: String },

    #[error("the symbol {:?} is not declared in this grammar", symbol)]
    UnknownSymbol { symbol: SymbolID },

    #[error("the nonterminal `{}' has no production rules", name)]
    UndefinedNonterminal { name: String },

    #[error("the grammar has no nonterminal symbols")]
    NoStartSymbol,

    #[error("Other error: {}", msg)]
    Other { msg: String },
}
impl From<&str> for GrammarDefError {
    fn from(msg: &str) -> Self {
        Self::Other { msg: msg.into() }
    }
}
impl From<String> for GrammarDefError {
    fn from(msg: String) -> Self {
        Self::Other { msg }
    }
}

fn verify_ident(s: &str) -> bool {
    let mut chars = s.chars();
    let first = match chars.next() {
        Some(ch) => ch,
        // The identifier must not be empty.
        None => return false,
    };
    if !is_ident_start(first) {
        // The identifier must be started with XID-Start.
        return false;
    }
    // The idenfier must be continued with XID-Continue.
    chars.all(is_ident_continue)
}

pub(crate) fn is_ident_start(ch: char) -> bool {
    ch == '_' || unicode_ident::is_xid_start(ch)
}

pub(crate) fn is_ident_continue(ch: char) -> bool {
    unicode_ident::is_xid_continue(ch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_simple_grammar() {
        let grammar = Grammar::define(|g| {
            let num = g.terminal("NUM")?;
            let plus = g.terminal("PLUS")?;
            let expr = g.nonterminal("EXPR")?;
            g.rule(expr, [SymbolID::N(expr), SymbolID::T(plus), SymbolID::T(num)])?;
            g.rule(expr, [SymbolID::T(num)])?;
            Ok(())
        })
        .unwrap();

        let expr = grammar.nonterminal_by_name("EXPR").unwrap();
        assert_eq!(grammar.start_symbol(), expr);
        assert_eq!(grammar.productions_of(expr).count(), 2);
        assert_eq!(grammar.used_terminals().len(), 2);
        let rendered: Vec<_> = grammar
            .productions()
            .map(|p| p.display(&grammar).to_string())
            .collect();
        assert_eq!(rendered, ["EXPR := EXPR PLUS NUM", "EXPR := NUM"]);
    }

    #[test]
    fn undefined_nonterminal_on_right() {
        let err = Grammar::define(|g| {
            let a = g.terminal("A")?;
            let s = g.nonterminal("S")?;
            let t = g.nonterminal("T")?;
            g.rule(s, [SymbolID::T(a), SymbolID::N(t)])?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarDefError::UndefinedNonterminal { ref name } if name == "T"));
    }

    #[test]
    fn undefined_start_symbol() {
        let err = Grammar::define(|g| {
            let a = g.terminal("A")?;
            let s = g.nonterminal("S")?;
            let t = g.nonterminal("T")?;
            g.rule(t, [SymbolID::T(a)])?;
            g.start_symbol(s)?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarDefError::UndefinedNonterminal { ref name } if name == "S"));
    }

    #[test]
    fn reject_bad_declarations() {
        let err = Grammar::define(|g| {
            g.terminal("A")?;
            g.nonterminal("A")?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarDefError::DuplicateSymbol { .. }));

        let err = Grammar::define(|g| {
            g.terminal("1A")?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarDefError::InvalidName { .. }));

        let err = Grammar::define(|g| {
            let a = g.terminal("A")?;
            let s = g.nonterminal("S")?;
            g.rule(s, [SymbolID::T(a)])?;
            g.rule(s, [SymbolID::T(a)])?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarDefError::DuplicateProduction { .. }));

        let err = Grammar::define(|_| Ok(())).unwrap_err();
        assert!(matches!(err, GrammarDefError::NoStartSymbol));
    }

    #[test]
    fn with_production_validates_only_the_new_rule() {
        let mut ids = None;
        let grammar = Grammar::define(|g| {
            let a = g.terminal("A")?;
            let b = g.terminal("B")?;
            let s = g.nonterminal("S")?;
            let t = g.nonterminal("T")?;
            g.rule(s, [SymbolID::T(a)])?;
            ids = Some((a, b, s, t));
            Ok(())
        })
        .unwrap();
        let (a, b, s, t) = ids.unwrap();

        // `T` owns no production yet.
        assert!(matches!(
            grammar.clone().with_production(s, [SymbolID::N(t)]),
            Err(GrammarDefError::UndefinedNonterminal { .. })
        ));

        let (grammar, _) = grammar.with_production(t, [SymbolID::T(b)]).unwrap();
        let (grammar, p) = grammar
            .with_production(s, [SymbolID::N(t), SymbolID::T(a)])
            .unwrap();
        assert_eq!(grammar.production(p).left(), s);
        assert_eq!(grammar.productions_of(s).count(), 2);
        assert!(grammar.used_terminals().contains(b));

        // left recursion refers to the left-hand side itself.
        let (grammar, _) = grammar
            .with_production(t, [SymbolID::N(t), SymbolID::T(b)])
            .unwrap();
        assert_eq!(grammar.productions().count(), 4);
    }
}
