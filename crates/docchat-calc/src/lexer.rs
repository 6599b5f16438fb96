//! Tokenizer for calculator input.
//!
//! Line breaks are only allowed inside `(...)` or `[...]`, after a trailing
//! backslash, or after the last token. Integer literals may be written in
//! decimal, `0x`, `0o` or `0b` form with single underscores between digits.

use num_bigint::BigInt;

use crate::error::CalcError;
use crate::number::MAX_INT_BITS;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Int(BigInt),
    Float(f64),
    Ident(String),
    Str(String),
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    DoubleSlash,
    Percent,
    At,
    LShift,
    RShift,
    Amp,
    Pipe,
    Caret,
    Tilde,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    End,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the first character.
    pub position: usize,
}

/// Split `input` into tokens, ending with a single [`TokenKind::End`].
pub fn tokenize(input: &str) -> Result<Vec<Token>, CalcError> {
    let chars: Vec<(usize, char)> = input.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    let mut bracket_depth = 0usize;
    let mut line_break = None;

    while i < chars.len() {
        let (pos, c) = chars[i];

        if c == '\\' {
            match chars.get(i + 1).map(|(_, c)| *c) {
                Some('\n') => {
                    i += 2;
                    continue;
                }
                Some('\r') => {
                    i += if matches!(chars.get(i + 2), Some((_, '\n'))) { 3 } else { 2 };
                    continue;
                }
                _ => {}
            }
        }

        if c == '\n' || c == '\r' {
            if bracket_depth == 0 && !tokens.is_empty() {
                line_break.get_or_insert(pos);
            }
            i += 1;
            continue;
        }

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        // A token after a top-level line break starts a second statement.
        if let Some(at) = line_break {
            return Err(CalcError::syntax("unexpected line break", at));
        }

        if c.is_ascii_digit() || (c == '.' && next_is_digit(&chars, i + 1)) {
            let (kind, next) = lex_number(input, &chars, i)?;
            tokens.push(Token { kind, position: pos });
            i = next;
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].1.is_alphanumeric() || chars[i].1 == '_') {
                i += 1;
            }
            let end = byte_end(input, &chars, i);
            tokens.push(Token {
                kind: TokenKind::Ident(input[chars[start].0..end].to_string()),
                position: pos,
            });
            continue;
        }

        if c == '\'' || c == '"' {
            let (text, next) = lex_string(&chars, i)?;
            tokens.push(Token {
                kind: TokenKind::Str(text),
                position: pos,
            });
            i = next;
            continue;
        }

        let next = chars.get(i + 1).map(|(_, c)| *c);
        let (kind, width) = match (c, next) {
            ('*', Some('*')) => (TokenKind::DoubleStar, 2),
            ('/', Some('/')) => (TokenKind::DoubleSlash, 2),
            ('<', Some('<')) => (TokenKind::LShift, 2),
            ('>', Some('>')) => (TokenKind::RShift, 2),
            ('=', Some('=')) => (TokenKind::EqEq, 2),
            ('!', Some('=')) => (TokenKind::NotEq, 2),
            ('<', Some('=')) => (TokenKind::Le, 2),
            ('>', Some('=')) => (TokenKind::Ge, 2),
            ('+', _) => (TokenKind::Plus, 1),
            ('-', _) => (TokenKind::Minus, 1),
            ('*', _) => (TokenKind::Star, 1),
            ('/', _) => (TokenKind::Slash, 1),
            ('%', _) => (TokenKind::Percent, 1),
            ('@', _) => (TokenKind::At, 1),
            ('&', _) => (TokenKind::Amp, 1),
            ('|', _) => (TokenKind::Pipe, 1),
            ('^', _) => (TokenKind::Caret, 1),
            ('~', _) => (TokenKind::Tilde, 1),
            ('(', _) => (TokenKind::LParen, 1),
            (')', _) => (TokenKind::RParen, 1),
            ('[', _) => (TokenKind::LBracket, 1),
            (']', _) => (TokenKind::RBracket, 1),
            (',', _) => (TokenKind::Comma, 1),
            ('.', _) => (TokenKind::Dot, 1),
            ('<', _) => (TokenKind::Lt, 1),
            ('>', _) => (TokenKind::Gt, 1),
            _ => {
                return Err(CalcError::syntax(
                    format!("unexpected character '{}'", c),
                    pos,
                ))
            }
        };
        match kind {
            TokenKind::LParen | TokenKind::LBracket => bracket_depth += 1,
            TokenKind::RParen | TokenKind::RBracket => {
                bracket_depth = bracket_depth.saturating_sub(1)
            }
            _ => {}
        }
        tokens.push(Token { kind, position: pos });
        i += width;
    }

    tokens.push(Token {
        kind: TokenKind::End,
        position: input.len(),
    });
    Ok(tokens)
}

fn next_is_digit(chars: &[(usize, char)], i: usize) -> bool {
    chars.get(i).is_some_and(|(_, c)| c.is_ascii_digit())
}

fn byte_end(input: &str, chars: &[(usize, char)], i: usize) -> usize {
    chars.get(i).map(|(p, _)| *p).unwrap_or(input.len())
}

/// Lex an integer or float literal starting at `start`.
fn lex_number(
    input: &str,
    chars: &[(usize, char)],
    start: usize,
) -> Result<(TokenKind, usize), CalcError> {
    let position = chars[start].0;
    if chars[start].1 == '0' {
        if let Some(radix) = chars.get(start + 1).and_then(|(_, c)| prefix_radix(*c)) {
            return lex_prefixed_int(input, chars, start, radix);
        }
    }

    let mut i = scan_digits(chars, start, 10, position)?;
    let mut is_float = false;
    if chars.get(i).is_some_and(|(_, c)| *c == '.') {
        is_float = true;
        i = scan_digits(chars, i + 1, 10, position)?;
    }
    if chars.get(i).is_some_and(|(_, c)| *c == 'e' || *c == 'E') {
        let mut j = i + 1;
        if chars.get(j).is_some_and(|(_, c)| *c == '+' || *c == '-') {
            j += 1;
        }
        if next_is_digit(chars, j) {
            is_float = true;
            i = scan_digits(chars, j, 10, position)?;
        }
    }
    if chars
        .get(i)
        .is_some_and(|(_, c)| c.is_alphanumeric() || *c == '_')
    {
        return Err(CalcError::syntax("invalid decimal literal", position));
    }

    let text: String = input[position..byte_end(input, chars, i)]
        .chars()
        .filter(|c| *c != '_')
        .collect();
    let kind = if is_float {
        let value: f64 = text
            .parse()
            .map_err(|_| CalcError::syntax(format!("invalid number '{}'", text), position))?;
        TokenKind::Float(value)
    } else {
        if text.len() > 1 && text.starts_with('0') && text.bytes().any(|b| b != b'0') {
            return Err(CalcError::syntax(
                "leading zeros in decimal integer literals are not permitted",
                position,
            ));
        }
        TokenKind::Int(parse_int(&text, 10, position)?)
    };
    Ok((kind, i))
}

fn prefix_radix(c: char) -> Option<u32> {
    match c {
        'x' | 'X' => Some(16),
        'o' | 'O' => Some(8),
        'b' | 'B' => Some(2),
        _ => None,
    }
}

fn radix_name(radix: u32) -> &'static str {
    match radix {
        16 => "hexadecimal",
        8 => "octal",
        2 => "binary",
        _ => "decimal",
    }
}

/// Lex `0x..`, `0o..` or `0b..`; `start` points at the leading zero.
fn lex_prefixed_int(
    input: &str,
    chars: &[(usize, char)],
    start: usize,
    radix: u32,
) -> Result<(TokenKind, usize), CalcError> {
    let position = chars[start].0;
    let invalid = || CalcError::syntax(format!("invalid {} literal", radix_name(radix)), position);

    let mut i = start + 2;
    if chars.get(i).is_some_and(|(_, c)| *c == '_') {
        i += 1;
    }
    if !chars.get(i).is_some_and(|(_, c)| c.is_digit(radix)) {
        return Err(invalid());
    }
    let digits_start = chars[i].0;
    i = scan_digits(chars, i, radix, position)?;
    if chars
        .get(i)
        .is_some_and(|(_, c)| c.is_alphanumeric() || *c == '_')
    {
        return Err(invalid());
    }

    let digits: String = input[digits_start..byte_end(input, chars, i)]
        .chars()
        .filter(|c| *c != '_')
        .collect();
    Ok((TokenKind::Int(parse_int(&digits, radix, position)?), i))
}

/// Consume a run of `radix` digits with single underscores between them.
fn scan_digits(
    chars: &[(usize, char)],
    mut i: usize,
    radix: u32,
    position: usize,
) -> Result<usize, CalcError> {
    while chars.get(i).is_some_and(|(_, c)| c.is_digit(radix)) {
        i += 1;
        if chars.get(i).is_some_and(|(_, c)| *c == '_') {
            if !chars.get(i + 1).is_some_and(|(_, c)| c.is_digit(radix)) {
                return Err(CalcError::syntax(
                    format!("invalid {} literal", radix_name(radix)),
                    position,
                ));
            }
            i += 1;
        }
    }
    Ok(i)
}

fn parse_int(digits: &str, radix: u32, position: usize) -> Result<BigInt, CalcError> {
    let value = BigInt::parse_bytes(digits.as_bytes(), radix).ok_or_else(|| {
        CalcError::syntax(format!("invalid {} literal", radix_name(radix)), position)
    })?;
    if value.bits() > MAX_INT_BITS {
        return Err(CalcError::Overflow);
    }
    Ok(value)
}

/// Lex a quoted string starting at the opening quote.
fn lex_string(chars: &[(usize, char)], start: usize) -> Result<(String, usize), CalcError> {
    let (position, quote) = chars[start];
    let mut text = String::new();
    let mut i = start + 1;
    while let Some(&(_, c)) = chars.get(i) {
        if c == quote {
            return Ok((text, i + 1));
        }
        if c == '\\' {
            if let Some(&(_, escaped)) = chars.get(i + 1) {
                text.push(escaped);
                i += 2;
                continue;
            }
        }
        text.push(c);
        i += 1;
    }
    Err(CalcError::syntax("unterminated string literal", position))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(i: i64) -> TokenKind {
        TokenKind::Int(BigInt::from(i))
    }

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_arithmetic_tokens() {
        assert_eq!(
            kinds("12 * (3 + 4)"),
            vec![
                int(12),
                TokenKind::Star,
                TokenKind::LParen,
                int(3),
                TokenKind::Plus,
                int(4),
                TokenKind::RParen,
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn test_two_char_operators() {
        assert_eq!(
            kinds("2**3//4"),
            vec![
                int(2),
                TokenKind::DoubleStar,
                int(3),
                TokenKind::DoubleSlash,
                int(4),
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn test_float_forms() {
        assert_eq!(kinds("1.5")[0], TokenKind::Float(1.5));
        assert_eq!(kinds(".5")[0], TokenKind::Float(0.5));
        assert_eq!(kinds("5.")[0], TokenKind::Float(5.0));
        assert_eq!(kinds("1e3")[0], TokenKind::Float(1000.0));
        assert_eq!(kinds("2.5E-1")[0], TokenKind::Float(0.25));
    }

    #[test]
    fn test_identifiers_and_strings() {
        assert_eq!(
            kinds("abs('x')"),
            vec![
                TokenKind::Ident("abs".to_string()),
                TokenKind::LParen,
                TokenKind::Str("x".to_string()),
                TokenKind::RParen,
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn test_positions_are_byte_offsets() {
        let tokens = tokenize("1 +  2").unwrap();
        assert_eq!(tokens[1].position, 2);
        assert_eq!(tokens[2].position, 5);
        assert_eq!(tokens[3].position, 6);
    }

    #[test]
    fn test_lexer_errors() {
        assert!(matches!(tokenize("1 $ 2"), Err(CalcError::Syntax { position: 2, .. })));
        assert!(matches!(tokenize("'open"), Err(CalcError::Syntax { .. })));
        assert!(matches!(tokenize("012"), Err(CalcError::Syntax { .. })));
        assert!(matches!(tokenize("3abc"), Err(CalcError::Syntax { .. })));
        assert_eq!(tokenize(&"9".repeat(6000)), Err(CalcError::Overflow));
    }

    #[test]
    fn test_zero_literals() {
        assert_eq!(kinds("0")[0], int(0));
        assert_eq!(kinds("000")[0], int(0));
        assert_eq!(kinds("0_0")[0], int(0));
        assert_eq!(kinds("0.5")[0], TokenKind::Float(0.5));
    }

    #[test]
    fn test_integers_beyond_64_bits() {
        let big: BigInt = "99999999999999999999".parse().unwrap();
        assert_eq!(kinds("99999999999999999999")[0], TokenKind::Int(big));
    }

    #[test]
    fn test_underscores_and_prefixed_literals() {
        assert_eq!(kinds("1_000")[0], int(1000));
        assert_eq!(kinds("1_000.5")[0], TokenKind::Float(1000.5));
        assert_eq!(kinds("1e1_0")[0], TokenKind::Float(1e10));
        assert_eq!(kinds("0x10")[0], int(16));
        assert_eq!(kinds("0XfF")[0], int(255));
        assert_eq!(kinds("0o17")[0], int(15));
        assert_eq!(kinds("0b1010")[0], int(10));
        assert_eq!(kinds("0x_ff_ff")[0], int(0xffff));

        for bad in ["1__000", "1_", "1_.5", "0x", "0xg", "0b102", "0o8", "0x1__2"] {
            assert!(
                matches!(tokenize(bad), Err(CalcError::Syntax { .. })),
                "{} should not lex",
                bad
            );
        }
    }

    #[test]
    fn test_top_level_line_break_is_rejected() {
        assert_eq!(
            tokenize("1\n+2"),
            Err(CalcError::syntax("unexpected line break", 1))
        );
        assert!(matches!(tokenize("12\r\n*3"), Err(CalcError::Syntax { .. })));
    }

    #[test]
    fn test_line_breaks_inside_brackets_and_at_the_edges() {
        assert_eq!(
            kinds("(1\n+ 2)"),
            vec![
                TokenKind::LParen,
                int(1),
                TokenKind::Plus,
                int(2),
                TokenKind::RParen,
                TokenKind::End,
            ]
        );
        assert_eq!(kinds("[1,\n2]").len(), 6);
        assert_eq!(kinds("\n1 + 2\n\n"), vec![int(1), TokenKind::Plus, int(2), TokenKind::End]);
        assert_eq!(kinds("1 + \\\n2"), vec![int(1), TokenKind::Plus, int(2), TokenKind::End]);
        // Closing the bracket restores the top-level rule.
        assert!(tokenize("(1)\n+ 2").is_err());
    }

    #[test]
    fn test_empty_input_is_just_end() {
        assert_eq!(kinds("   "), vec![TokenKind::End]);
    }
}
