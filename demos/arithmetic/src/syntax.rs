//! Syntax definition.

use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinOp {
    pub fn from_terminal(name: &str) -> Option<Self> {
        match name {
            "PLUS" => Some(Self::Add),
            "MINUS" => Some(Self::Sub),
            "STAR" => Some(Self::Mul),
            "SLASH" => Some(Self::Div),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum Expr {
    Num(i64),
    Neg(Box<Expr>),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

impl Expr {
    pub fn eval(&self) -> anyhow::Result<i64> {
        let value = match self {
            Self::Num(n) => Some(*n),
            Self::Neg(expr) => expr.eval()?.checked_neg(),
            Self::Binary { op, lhs, rhs } => {
                let (lhs, rhs) = (lhs.eval()?, rhs.eval()?);
                match op {
                    BinOp::Add => lhs.checked_add(rhs),
                    BinOp::Sub => lhs.checked_sub(rhs),
                    BinOp::Mul => lhs.checked_mul(rhs),
                    BinOp::Div if rhs == 0 => anyhow::bail!("division by zero"),
                    BinOp::Div => lhs.checked_div(rhs),
                }
            }
        };
        value.ok_or_else(|| anyhow::anyhow!("arithmetic overflow"))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num(n) => write!(f, "{}", n),
            Self::Neg(expr) => write!(f, "(neg {})", expr),
            Self::Binary { op, lhs, rhs } => {
                let op = match op {
                    BinOp::Add => "+",
                    BinOp::Sub => "-",
                    BinOp::Mul => "*",
                    BinOp::Div => "/",
                };
                write!(f, "({} {} {})", op, lhs, rhs)
            }
        }
    }
}
