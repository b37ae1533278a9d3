use crate::{
    lexer::{self, Lexeme, Token},
    syntax::{BinOp, Expr},
};
use anyhow::Context as _;
use lexlr::{grammar::Grammar, lr1::ParseTable, parser::Parser};

const GRAMMAR: &str = include_str!("../arithmetic.lll");

#[derive(Debug, Copy, Clone)]
enum Reduce {
    // forward the n-th operand.
    Forward(usize),
    Neg,
    Binary(BinOp),
}

impl Reduce {
    fn from_shape(right: &[&str]) -> Option<Self> {
        match right {
            [_] => Some(Self::Forward(0)),
            ["LPAREN", _, "RPAREN"] => Some(Self::Forward(1)),
            ["MINUS", _] => Some(Self::Neg),
            [_, op, _] => BinOp::from_terminal(op).map(Self::Binary),
            _ => None,
        }
    }

    fn apply(self, args: Vec<Option<Expr>>) -> Result<Option<Expr>, String> {
        let mut args = args.into_iter();
        let mut operand = |n: usize| {
            args.nth(n)
                .flatten()
                .ok_or_else(|| "missing operand".to_owned())
        };
        let expr = match self {
            Self::Forward(n) => operand(n)?,
            Self::Neg => Expr::Neg(Box::new(operand(1)?)),
            Self::Binary(op) => {
                let lhs = operand(0)?;
                let rhs = operand(1)?;
                Expr::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                }
            }
        };
        Ok(Some(expr))
    }
}

/// The parser of arithmetic expressions, generated at runtime from `arithmetic.lll`.
#[derive(Debug)]
pub struct Calculator {
    grammar: Grammar,
    table: ParseTable,
}

impl Calculator {
    pub fn new() -> anyhow::Result<Self> {
        let grammar = Grammar::from_str(GRAMMAR).context("invalid grammar definition")?;
        let table = ParseTable::generate(&grammar)?;
        tracing::debug!(num_states = table.num_states(), "generated the parse table");
        Ok(Self { grammar, table })
    }

    pub fn parse(&self, input: &str) -> anyhow::Result<Expr> {
        let span = tracing::trace_span!("parse");
        let _entered = span.enter();

        let g = &self.grammar;
        let mut def = Parser::<Lexeme, Option<Expr>, String>::builder(g, &self.table)
            .on_unexpected_token(|lexeme, _| format!("unexpected token `{}'", lexeme))
            .on_unexpected_eoi(|| "unexpected end of input".to_owned());
        for terminal in g.terminals() {
            def = def.terminal(terminal.id(), |_, lexeme| match lexeme.token {
                Token::Num(n) => Ok(Some(Expr::Num(n))),
                _ => Ok(None),
            });
        }
        for production in g.productions() {
            let right: Vec<&str> = production
                .right()
                .iter()
                .map(|symbol| g.symbol_name(*symbol))
                .collect();
            let reduce = Reduce::from_shape(&right)
                .with_context(|| format!("no semantic action for `{}'", production.display(g)))?;
            tracing::trace!("{} => {:?}", production.display(g), reduce);
            def = def.production(production.id(), move |args| reduce.apply(args));
        }
        let parser = def.build()?;

        let tokens = lexer::lexer(input, g)?;
        parser
            .parse(tokens)?
            .context("the start symbol has no expression")
    }
}
