//! Arithmetic-vs-conversational message classification.
//!
//! A message is arithmetic when its lower-cased form contains `calculate`
//! anywhere, or when the whole message consists only of digits,
//! whitespace, `+ - * / . %` and parentheses. The keyword test is a plain
//! substring check, so "miscalculated" also counts.

use std::sync::LazyLock;

use regex::Regex;

/// Keyword that routes a message to the calculator.
pub const CALCULATE_KEYWORD: &str = "calculate";

static ARITHMETIC_ONLY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\d\s+\-*/.%()]+$").expect("Invalid arithmetic regex")
});

// `.` stops at a newline, so only the rest of that line is captured.
static KEYWORD_EXPRESSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"calculate\s*(.+)").expect("Invalid keyword regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    /// Route to the calculator. `None` when the keyword had nothing after it.
    Arithmetic { expression: Option<String> },
    /// Route to document retrieval.
    Conversational,
}

/// Classify an already-trimmed message.
pub fn classify(message: &str) -> MessageKind {
    let lowered = message.to_lowercase();
    if lowered.contains(CALCULATE_KEYWORD) {
        let expression = KEYWORD_EXPRESSION
            .captures(&lowered)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|expr| !expr.is_empty());
        return MessageKind::Arithmetic { expression };
    }

    if ARITHMETIC_ONLY.is_match(message) {
        let expression = Some(message.to_string()).filter(|expr| !expr.is_empty());
        return MessageKind::Arithmetic { expression };
    }

    MessageKind::Conversational
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arithmetic(expr: &str) -> MessageKind {
        MessageKind::Arithmetic {
            expression: Some(expr.to_string()),
        }
    }

    #[test]
    fn test_pattern_without_keyword() {
        assert_eq!(classify("7+3"), arithmetic("7+3"));
        assert_eq!(classify("12 * (3 + 4)"), arithmetic("12 * (3 + 4)"));
        assert_eq!(classify("2024"), arithmetic("2024"));
    }

    #[test]
    fn test_keyword_extracts_rest_of_line() {
        assert_eq!(classify("calculate 2 ** 10"), arithmetic("2 ** 10"));
        assert_eq!(classify("Please CALCULATE 5 % 3"), arithmetic("5 % 3"));
        assert_eq!(classify("calculate\n\n 1+1"), arithmetic("1+1"));
        assert_eq!(classify("calculate 1+1\nthanks"), arithmetic("1+1"));
    }

    #[test]
    fn test_keyword_expression_is_lowercased() {
        assert_eq!(classify("Calculate ABS(-3)"), arithmetic("abs(-3)"));
    }

    #[test]
    fn test_keyword_without_expression() {
        assert_eq!(
            classify("please calculate"),
            MessageKind::Arithmetic { expression: None }
        );
        assert_eq!(
            classify("calculate"),
            MessageKind::Arithmetic { expression: None }
        );
    }

    #[test]
    fn test_keyword_is_a_substring_match() {
        assert_eq!(classify("I miscalculated"), arithmetic("d"));
    }

    #[test]
    fn test_conversational_messages() {
        assert_eq!(classify("What is this document about?"), MessageKind::Conversational);
        assert_eq!(classify("2 + x"), MessageKind::Conversational);
        assert_eq!(classify("summarize page 3"), MessageKind::Conversational);
        assert_eq!(classify(""), MessageKind::Conversational);
    }
}
