//! Expression tree produced by the parser.
//!
//! The tree is deliberately wider than what the evaluator accepts: names,
//! calls, comparisons and the like are parsed so that they can be rejected
//! with a precise message instead of a generic syntax error.

use std::fmt;

use crate::number::Number;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(Number),
    Literal(Literal),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Construct(Construct),
}

/// Non-numeric constants.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Bool(bool),
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Mod,
    FloorDiv,
    MatMul,
    LShift,
    RShift,
    BitAnd,
    BitOr,
    BitXor,
}

impl BinaryOp {
    /// Operators the evaluator will apply.
    pub fn is_allowed(self) -> bool {
        matches!(
            self,
            BinaryOp::Add
                | BinaryOp::Sub
                | BinaryOp::Mul
                | BinaryOp::Div
                | BinaryOp::Pow
                | BinaryOp::Mod
        )
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "**",
            BinaryOp::Mod => "%",
            BinaryOp::FloorDiv => "//",
            BinaryOp::MatMul => "@",
            BinaryOp::LShift => "<<",
            BinaryOp::RShift => ">>",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Pos,
    Invert,
    Not,
}

impl UnaryOp {
    pub fn is_allowed(self) -> bool {
        self == UnaryOp::Neg
    }

    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "unary -",
            UnaryOp::Pos => "unary +",
            UnaryOp::Invert => "~",
            UnaryOp::Not => "not",
        }
    }
}

/// Constructs that parse but never evaluate.
#[derive(Debug, Clone, PartialEq)]
pub enum Construct {
    Name(String),
    Call,
    Attribute(String),
    Subscript,
    Compare,
    BoolOp,
    Tuple,
    List,
}

impl fmt::Display for Construct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Construct::Name(name) => write!(f, "name '{}'", name),
            Construct::Call => f.write_str("function call"),
            Construct::Attribute(attr) => write!(f, "attribute access '.{}'", attr),
            Construct::Subscript => f.write_str("subscript"),
            Construct::Compare => f.write_str("comparison"),
            Construct::BoolOp => f.write_str("boolean operation"),
            Construct::Tuple => f.write_str("tuple"),
            Construct::List => f.write_str("list"),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Str(_) => f.write_str("string literal"),
            Literal::Bool(b) => write!(f, "boolean literal {}", if *b { "True" } else { "False" }),
            Literal::None => f.write_str("None"),
        }
    }
}
