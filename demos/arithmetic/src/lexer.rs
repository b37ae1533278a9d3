use anyhow::Context as _;
use lexlr::{
    grammar::{Grammar, TerminalID},
    parser::{self, Payload},
};
use logos::Logos;

#[derive(Debug, Copy, Clone, Logos, PartialEq)]
#[logos(skip r"[ \t\n\f]+")]
pub enum Token {
    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    #[regex(r"[0-9]+", |lex| lex.slice().parse().ok())]
    Num(i64),
}

impl Token {
    /// The name of the terminal symbol in `arithmetic.lll`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::LParen => "LPAREN",
            Self::RParen => "RPAREN",
            Self::Plus => "PLUS",
            Self::Minus => "MINUS",
            Self::Star => "STAR",
            Self::Slash => "SLASH",
            Self::Num(..) => "NUM",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme {
    pub terminal: TerminalID,
    pub token: Token,
}

impl Payload for Lexeme {
    fn terminal(&self) -> TerminalID {
        self.terminal
    }
}

pub fn lexer<'source>(
    input: &'source str,
    grammar: &Grammar,
) -> anyhow::Result<Vec<parser::Token<'source, Lexeme>>> {
    let mut lexer = Token::lexer(input);
    let mut tokens = vec![];
    while let Some(token) = lexer.next() {
        let token = token.map_err(|_| anyhow::anyhow!("lexer error at {:?}", lexer.span()))?;
        let terminal = grammar
            .terminal_by_name(token.name())
            .with_context(|| format!("undeclared terminal `{}'", token.name()))?;
        tokens.push(parser::Token::new(lexer.slice(), Lexeme { terminal, token }));
    }
    Ok(tokens)
}
