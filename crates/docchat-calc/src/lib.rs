//! Grammar-restricted arithmetic evaluator.
//!
//! Parses calculator input with a dedicated lexer and Pratt parser and
//! evaluates it with a whitelist interpreter. Nothing is ever resolved by
//! name or executed: identifiers, calls, attribute access and other
//! non-arithmetic constructs are parsed only so they can be rejected.

pub mod ast;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod number;
pub mod parser;

pub use ast::Expr;
pub use error::CalcError;
pub use number::Number;
pub use parser::{parse, MAX_DEPTH, MAX_OPERATORS};

/// Parse and evaluate `expression`.
pub fn evaluate(expression: &str) -> Result<Number, CalcError> {
    let expr = parser::parse(expression)?;
    let value = eval::eval(&expr)?;
    tracing::trace!(expression, %value, "Expression evaluated");
    Ok(value)
}
