//! Whitelist interpreter over [`Expr`].
//!
//! Only numeric leaves and the operators `+ - * / % **` and unary `-` are
//! evaluated. The operator of a node is checked before its operands are
//! visited, so a rejected operator is reported even when its operands would
//! also be rejected.
//!
//! Left-nested chains such as `1 + 2 + ... + n` are walked in a loop, so only
//! right operands, unary operands and brackets cost stack depth.

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::error::CalcError;
use crate::number::Number;

/// Evaluate an already-parsed expression tree.
pub fn eval(expr: &Expr) -> Result<Number, CalcError> {
    match expr {
        Expr::Number(n) => Ok(n.clone()),
        Expr::Literal(lit) => Err(CalcError::NonNumericLiteral(lit.to_string())),
        Expr::Binary { .. } => eval_left_chain(expr),
        Expr::Unary { op, operand } => {
            if !op.is_allowed() {
                return Err(CalcError::OperatorNotAllowed(op.symbol().to_string()));
            }
            let value = eval(operand)?;
            match op {
                UnaryOp::Neg => value.neg(),
                _ => Err(CalcError::OperatorNotAllowed(op.symbol().to_string())),
            }
        }
        Expr::Construct(construct) => Err(CalcError::ExpressionNotAllowed(construct.to_string())),
    }
}

/// Evaluate a run of left-nested binary nodes, innermost first.
fn eval_left_chain(expr: &Expr) -> Result<Number, CalcError> {
    let mut pending = Vec::new();
    let mut node = expr;
    while let Expr::Binary { op, lhs, rhs } = node {
        if !op.is_allowed() {
            return Err(CalcError::OperatorNotAllowed(op.symbol().to_string()));
        }
        pending.push((*op, rhs.as_ref()));
        node = lhs.as_ref();
    }

    let mut acc = eval(node)?;
    for (op, rhs) in pending.into_iter().rev() {
        let rhs = eval(rhs)?;
        acc = apply_binary(op, acc, rhs)?;
    }
    Ok(acc)
}

fn apply_binary(op: BinaryOp, lhs: Number, rhs: Number) -> Result<Number, CalcError> {
    match op {
        BinaryOp::Add => lhs.add(rhs),
        BinaryOp::Sub => lhs.sub(rhs),
        BinaryOp::Mul => lhs.mul(rhs),
        BinaryOp::Div => lhs.div(rhs),
        BinaryOp::Pow => lhs.pow(rhs),
        BinaryOp::Mod => lhs.rem(rhs),
        other => Err(CalcError::OperatorNotAllowed(other.symbol().to_string())),
    }
}
