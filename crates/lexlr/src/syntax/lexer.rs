//! Lexer implementation.
//!
//! The token automaton is assembled from small NFA fragments, one per
//! token kind, and determinized by subset construction.

use crate::{
    automaton::{to_dfa, AutomatonError, Dfa, Nfa, Precedence, StateID, SubsetError},
    grammar::{is_ident_continue, is_ident_start},
    parser::Token,
    scanner::{ScanError, Scanner},
};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TokenKind {
    KwTerminal,
    KwNonterminal,
    KwStart,
    KwRule,
    KwEmpty,
    /// `@` followed by an identifier that is not a keyword.
    Directive,
    Ident,
    ColonEq,
    Comma,
    Semicolon,
    VertBar,
    Whitespace,
    Comment,
}

const KEYWORDS: [(&str, TokenKind); 5] = [
    ("@terminal", TokenKind::KwTerminal),
    ("@nonterminal", TokenKind::KwNonterminal),
    ("@start", TokenKind::KwStart),
    ("@rule", TokenKind::KwRule),
    ("@empty", TokenKind::KwEmpty),
];

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CharClass {
    Ascii(u8),
    NonAsciiIdentStart,
    NonAsciiIdentContinue,
    NonAsciiOther,
}

pub fn classify(ch: char) -> CharClass {
    if ch.is_ascii() {
        CharClass::Ascii(ch as u8)
    } else if is_ident_start(ch) {
        CharClass::NonAsciiIdentStart
    } else if is_ident_continue(ch) {
        CharClass::NonAsciiIdentContinue
    } else {
        CharClass::NonAsciiOther
    }
}

fn alphabet() -> impl Iterator<Item = CharClass> {
    (0..0x80u8).map(CharClass::Ascii).chain([
        CharClass::NonAsciiIdentStart,
        CharClass::NonAsciiIdentContinue,
        CharClass::NonAsciiOther,
    ])
}

fn ident_start_classes() -> Vec<CharClass> {
    alphabet()
        .filter(|class| match class {
            CharClass::Ascii(b) => is_ident_start(*b as char),
            CharClass::NonAsciiIdentStart => true,
            _ => false,
        })
        .collect()
}

fn ident_continue_classes() -> Vec<CharClass> {
    alphabet()
        .filter(|class| match class {
            CharClass::Ascii(b) => is_ident_continue(*b as char),
            CharClass::NonAsciiIdentStart | CharClass::NonAsciiIdentContinue => true,
            CharClass::NonAsciiOther => false,
        })
        .collect()
}

type Fragment = Nfa<CharClass, TokenKind>;

fn literal(text: &str, kind: TokenKind) -> Result<Fragment, AutomatonError> {
    let bytes = text.as_bytes();
    let mut nfa = Nfa::new(bytes.len() + 1, alphabet())?;
    for (i, b) in bytes.iter().enumerate() {
        nfa = nfa.with_transition(
            StateID::from_index(i),
            CharClass::Ascii(*b),
            StateID::from_index(i + 1),
        )?;
    }
    nfa.with_output(StateID::from_index(bytes.len()), kind)
}

// `prefix? first rest*`
fn repeated(
    prefix: Option<u8>,
    first: &[CharClass],
    rest: &[CharClass],
    kind: TokenKind,
) -> Result<Fragment, AutomatonError> {
    let nfa = Nfa::new(3, alphabet())?;
    let (start, head) = match prefix {
        Some(b) => (
            StateID::from_raw(1),
            nfa.with_transition(StateID::START, CharClass::Ascii(b), StateID::from_raw(1))?,
        ),
        None => (StateID::START, nfa),
    };
    let last = StateID::from_raw(2);
    head.with_transitions([start], [last], first.iter().copied())?
        .with_transitions([last], [last], rest.iter().copied())?
        .with_output(last, kind)
}

// `// ...` up to the end of line.
fn line_comment() -> Result<Fragment, AutomatonError> {
    let body = StateID::from_raw(2);
    literal("//", TokenKind::Comment)?
        .with_transitions(
            [body],
            [body],
            alphabet().filter(|class| *class != CharClass::Ascii(b'\n')),
        )
}

fn token_nfa() -> Result<Fragment, AutomatonError> {
    let ident_start = ident_start_classes();
    let ident_continue = ident_continue_classes();
    let spaces: Vec<_> = b" \t\r\n".iter().map(|b| CharClass::Ascii(*b)).collect();

    let mut fragments = vec![
        repeated(None, &ident_start, &ident_continue, TokenKind::Ident)?,
        repeated(Some(b'@'), &ident_start, &ident_continue, TokenKind::Directive)?,
        repeated(None, &spaces, &spaces, TokenKind::Whitespace)?,
        line_comment()?,
        literal(":=", TokenKind::ColonEq)?,
        literal(",", TokenKind::Comma)?,
        literal(";", TokenKind::Semicolon)?,
        literal("|", TokenKind::VertBar)?,
    ];
    for (text, kind) in KEYWORDS {
        fragments.push(literal(text, kind)?);
    }

    // state 0 branches into every fragment through epsilon moves.
    let mut nfa = Nfa::new(1, alphabet())?;
    for fragment in fragments {
        let entry = StateID::from_index(nfa.num_states());
        nfa = nfa.merge(fragment).with_epsilon(StateID::START, entry)?;
    }
    Ok(nfa)
}

#[derive(Debug)]
pub struct Lexer {
    dfa: Dfa<CharClass, TokenKind>,
}

impl Lexer {
    #[tracing::instrument(skip_all)]
    pub fn new() -> Result<Self, SubsetError> {
        let nfa = token_nfa()?;
        // keywords take priority over the generic directive token.
        let precedence = Precedence::new().level(KEYWORDS.map(|(_, kind)| kind))?;
        let dfa = to_dfa(&nfa, &precedence)?;
        tracing::debug!(
            nfa_states = nfa.num_states(),
            dfa_states = dfa.num_states(),
            "built the token automaton"
        );
        Ok(Self { dfa })
    }

    /// Split the source into tokens, dropping whitespace and comments.
    pub fn tokenize<'s>(&self, source: &'s str) -> Result<Vec<Token<'s, TokenKind>>, ScanError> {
        Scanner::new(&self.dfa, classify)
            .with_trivia([TokenKind::Whitespace, TokenKind::Comment])
            .scan(source)
    }
}
