//! Syntax support for grammar definition files.
//!
//! ```text
//! // comment
//! @terminal NUM, PLUS;
//! @nonterminal S, E;
//! @start S;
//! @rule S := E;
//! @rule E := NUM | E PLUS NUM;
//! @rule L := @empty | L NUM;
//! ```
//!
//! The file is tokenized by [`lexer::Lexer`] and parsed by the LR(1) parser
//! generated from the grammar below, using this crate's own machinery.

pub mod ast;
pub mod lexer;

use self::lexer::{Lexer, TokenKind};
use crate::{
    grammar::{Grammar, GrammarDef, GrammarDefError, ProductionID, SymbolID, TerminalID},
    lr1::ParseTable,
    parser::{Parser, ParserDefError, Token},
    types::Map,
};
use std::sync::OnceLock;

enum StackItem {
    Token(String),
    Grammar(ast::Grammar),
    Stmts(Vec<ast::Stmt>),
    Stmt(ast::Stmt),
    Idents(Vec<String>),
    Alts(Vec<Vec<String>>),
    Alt(Vec<String>),
}

#[derive(Debug, Copy, Clone)]
enum Reduce {
    Grammar,
    StmtsEmpty,
    StmtsPush,
    Terminals,
    Nonterminals,
    Start,
    Rule,
    RuleLeadingBar,
    IdentsFirst,
    IdentsPush,
    AltsFirst,
    AltsPush,
    AltEmpty,
    AltElems,
    ElemsFirst,
    ElemsPush,
}

/// Parse the source text of a grammar definition file.
pub fn parse(source: &str) -> anyhow::Result<ast::Grammar> {
    let span = tracing::trace_span!("parse");
    let _entered = span.enter();

    let syntax = syntax_def()?;

    let mut tokens = vec![];
    for token in syntax.lexer.tokenize(source)? {
        match syntax.terminals.get(&token.payload) {
            Some(&terminal) => tokens.push(Token::new(token.lexeme, terminal)),
            None => anyhow::bail!("unknown directive: `{}'", token.lexeme),
        }
    }
    tracing::trace!(num_tokens = tokens.len(), "tokenized");

    let parser = syntax.parser()?;
    match parser.parse(tokens)? {
        StackItem::Grammar(grammar) => Ok(grammar),
        _ => anyhow::bail!("unexpected stack item, expecting Grammar"),
    }
}

// The lexer and the parse table of the format are built once per process.
fn syntax_def() -> anyhow::Result<&'static SyntaxDef> {
    static SYNTAX: OnceLock<Result<SyntaxDef, String>> = OnceLock::new();
    SYNTAX
        .get_or_init(|| SyntaxDef::new().map_err(|err| format!("{:#}", err)))
        .as_ref()
        .map_err(|msg| anyhow::anyhow!("failed to set up the grammar file parser: {}", msg))
}

struct SyntaxDef {
    lexer: Lexer,
    grammar: Grammar,
    table: ParseTable,
    terminals: Map<TokenKind, TerminalID>,
    reductions: Vec<(ProductionID, Reduce)>,
}

impl SyntaxDef {
    fn new() -> anyhow::Result<Self> {
        let lexer = Lexer::new()?;
        let mut terminals = Map::default();
        let mut reductions = vec![];
        let grammar = Grammar::define(|g| define_syntax(g, &mut terminals, &mut reductions))?;
        let table = ParseTable::generate(&grammar)?;
        Ok(Self {
            lexer,
            grammar,
            table,
            terminals,
            reductions,
        })
    }

    fn parser(&self) -> Result<Parser<'_, TerminalID, StackItem, String>, ParserDefError> {
        let mut def = Parser::builder(&self.grammar, &self.table)
            .on_unexpected_token(|lexeme, _| format!("unexpected token `{}'", lexeme))
            .on_unexpected_eoi(|| "unexpected end of input".to_owned());
        for &terminal in self.terminals.values() {
            def = def.terminal(terminal, |lexeme, _| Ok(StackItem::Token(lexeme.to_owned())));
        }
        for &(production, reduce) in &self.reductions {
            def = def.production(production, move |args| reduce_stack(reduce, args));
        }
        def.build()
    }
}

fn define_syntax(
    g: &mut GrammarDef,
    terminals: &mut Map<TokenKind, TerminalID>,
    reductions: &mut Vec<(ProductionID, Reduce)>,
) -> Result<(), GrammarDefError> {
    use SymbolID::{N, T};

    let mut terminal = |g: &mut GrammarDef, name: &str, kind: TokenKind| {
        let id = g.terminal(name)?;
        terminals.insert(kind, id);
        Ok::<_, GrammarDefError>(id)
    };
    let kw_terminal = terminal(g, "TERMINAL", TokenKind::KwTerminal)?;
    let kw_nonterminal = terminal(g, "NONTERMINAL", TokenKind::KwNonterminal)?;
    let kw_start = terminal(g, "START", TokenKind::KwStart)?;
    let kw_rule = terminal(g, "RULE", TokenKind::KwRule)?;
    let kw_empty = terminal(g, "EMPTY", TokenKind::KwEmpty)?;
    let ident = terminal(g, "IDENT", TokenKind::Ident)?;
    let colon_eq = terminal(g, "COLON_EQ", TokenKind::ColonEq)?;
    let comma = terminal(g, "COMMA", TokenKind::Comma)?;
    let semicolon = terminal(g, "SEMICOLON", TokenKind::Semicolon)?;
    let vert_bar = terminal(g, "VERT_BAR", TokenKind::VertBar)?;

    let grammar = g.nonterminal("Grammar")?;
    let stmts = g.nonterminal("Stmts")?;
    let stmt = g.nonterminal("Stmt")?;
    let idents = g.nonterminal("Idents")?;
    let alts = g.nonterminal("Alts")?;
    let alt = g.nonterminal("Alt")?;
    let elems = g.nonterminal("Elems")?;

    let mut rule = |g: &mut GrammarDef, left, right: &[SymbolID], reduce| {
        let id = g.rule(left, right.iter().copied())?;
        reductions.push((id, reduce));
        Ok::<_, GrammarDefError>(())
    };

    rule(g, grammar, &[N(stmts)], Reduce::Grammar)?;

    rule(g, stmts, &[], Reduce::StmtsEmpty)?;
    rule(g, stmts, &[N(stmts), N(stmt)], Reduce::StmtsPush)?;

    rule(g, stmt, &[T(kw_terminal), N(idents), T(semicolon)], Reduce::Terminals)?;
    rule(g, stmt, &[T(kw_nonterminal), N(idents), T(semicolon)], Reduce::Nonterminals)?;
    rule(g, stmt, &[T(kw_start), T(ident), T(semicolon)], Reduce::Start)?;
    rule(
        g,
        stmt,
        &[T(kw_rule), T(ident), T(colon_eq), N(alts), T(semicolon)],
        Reduce::Rule,
    )?;
    rule(
        g,
        stmt,
        &[T(kw_rule), T(ident), T(colon_eq), T(vert_bar), N(alts), T(semicolon)],
        Reduce::RuleLeadingBar,
    )?;

    rule(g, idents, &[T(ident)], Reduce::IdentsFirst)?;
    rule(g, idents, &[N(idents), T(comma), T(ident)], Reduce::IdentsPush)?;

    rule(g, alts, &[N(alt)], Reduce::AltsFirst)?;
    rule(g, alts, &[N(alts), T(vert_bar), N(alt)], Reduce::AltsPush)?;

    rule(g, alt, &[T(kw_empty)], Reduce::AltEmpty)?;
    rule(g, alt, &[N(elems)], Reduce::AltElems)?;

    rule(g, elems, &[T(ident)], Reduce::ElemsFirst)?;
    rule(g, elems, &[N(elems), T(ident)], Reduce::ElemsPush)?;

    g.start_symbol(grammar)?;

    Ok(())
}

fn reduce_stack(reduce: Reduce, args: Vec<StackItem>) -> Result<StackItem, String> {
    tracing::trace!("reducing: {:?}", reduce);
    let mut args = args.into_iter();
    macro_rules! take {
        ($Variant:ident) => {
            match args.next() {
                Some(StackItem::$Variant(item)) => item,
                _ => {
                    return Err(concat!(
                        "unexpected stack item, expecting ",
                        stringify!($Variant)
                    )
                    .to_owned())
                }
            }
        };
    }

    let item = match reduce {
        Reduce::Grammar => StackItem::Grammar(ast::Grammar {
            stmts: take!(Stmts),
        }),

        Reduce::StmtsEmpty => StackItem::Stmts(vec![]),
        Reduce::StmtsPush => {
            let mut stmts = take!(Stmts);
            stmts.push(take!(Stmt));
            StackItem::Stmts(stmts)
        }

        Reduce::Terminals => {
            take!(Token);
            StackItem::Stmt(ast::Stmt::Terminals(take!(Idents)))
        }
        Reduce::Nonterminals => {
            take!(Token);
            StackItem::Stmt(ast::Stmt::Nonterminals(take!(Idents)))
        }
        Reduce::Start => {
            take!(Token);
            StackItem::Stmt(ast::Stmt::Start(take!(Token)))
        }
        Reduce::Rule | Reduce::RuleLeadingBar => {
            take!(Token);
            let left = take!(Token);
            take!(Token);
            if let Reduce::RuleLeadingBar = reduce {
                take!(Token);
            }
            let alternatives = take!(Alts);
            StackItem::Stmt(ast::Stmt::Rule(ast::RuleDesc { left, alternatives }))
        }

        Reduce::IdentsFirst => StackItem::Idents(vec![take!(Token)]),
        Reduce::IdentsPush => {
            let mut idents = take!(Idents);
            take!(Token);
            idents.push(take!(Token));
            StackItem::Idents(idents)
        }

        Reduce::AltsFirst => StackItem::Alts(vec![take!(Alt)]),
        Reduce::AltsPush => {
            let mut alts = take!(Alts);
            take!(Token);
            alts.push(take!(Alt));
            StackItem::Alts(alts)
        }

        Reduce::AltEmpty => {
            take!(Token);
            StackItem::Alt(vec![])
        }
        Reduce::AltElems => StackItem::Alt(take!(Alt)),

        Reduce::ElemsFirst => StackItem::Alt(vec![take!(Token)]),
        Reduce::ElemsPush => {
            let mut elems = take!(Alt);
            elems.push(take!(Token));
            StackItem::Alt(elems)
        }
    };

    Ok(item)
}
