//! Error types for parsing and evaluating arithmetic expressions.

/// Errors from the expression evaluator.
///
/// Parse failures carry the byte offset of the offending token. Rejections
/// (`NonNumericLiteral`, `OperatorNotAllowed`, `ExpressionNotAllowed`) are
/// raised before any arithmetic happens on the rejected node.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CalcError {
    #[error("invalid syntax: {message} (at position {position})")]
    Syntax { message: String, position: usize },
    #[error("expression nested too deeply (limit {0})")]
    TooDeep(usize),
    #[error("expression has too many operators (limit {0})")]
    TooManyOperators(usize),
    #[error("Only numbers allowed, found {0}")]
    NonNumericLiteral(String),
    #[error("Operator not allowed: {0}")]
    OperatorNotAllowed(String),
    #[error("Expression not allowed: {0}")]
    ExpressionNotAllowed(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("modulo by zero")]
    ModuloByZero,
    #[error("0.0 cannot be raised to a negative power")]
    ZeroToNegativePower,
    #[error("negative number cannot be raised to a fractional power")]
    ComplexResult,
    #[error("numeric result out of range")]
    Overflow,
}

impl CalcError {
    pub(crate) fn syntax(message: impl Into<String>, position: usize) -> Self {
        CalcError::Syntax {
            message: message.into(),
            position,
        }
    }

    /// True for errors raised because the input is outside the allowed grammar,
    /// as opposed to arithmetic failures on allowed input.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            CalcError::Syntax { .. }
                | CalcError::TooDeep(_)
                | CalcError::TooManyOperators(_)
                | CalcError::NonNumericLiteral(_)
                | CalcError::OperatorNotAllowed(_)
                | CalcError::ExpressionNotAllowed(_)
        )
    }
}
