//! Pratt parser from tokens to [`Expr`].
//!
//! Precedence, lowest to highest: `or`, `and`, `not`, comparisons, `|`, `^`,
//! `&`, shifts, `+ -`, `* / // % @`, unary `- + ~`, `**` (right
//! associative, and binding tighter than a unary operator on its left, so
//! `-2 ** 2` is `-(2 ** 2)`), then calls, attribute access and subscripts.
//!
//! Nesting is counted per bracket, unary operand and right operand. A flat
//! left-associative chain such as `1 + 2 + 3` stays at one level however
//! long it is; its length is bounded by [`MAX_OPERATORS`] instead.

use crate::ast::{BinaryOp, Construct, Expr, Literal, UnaryOp};
use crate::error::CalcError;
use crate::lexer::{tokenize, Token, TokenKind};
use crate::number::Number;

/// Maximum nesting of sub-expressions before parsing gives up.
pub const MAX_DEPTH: usize = 200;

/// Maximum number of binary operators in one expression.
pub const MAX_OPERATORS: usize = 1000;

// Binding powers. Left-associative operators use (bp, bp + 1).
const OR_BP: u8 = 2;
const AND_BP: u8 = 4;
const NOT_BP: u8 = 6;
const COMPARE_BP: u8 = 8;
const BIT_OR_BP: u8 = 10;
const BIT_XOR_BP: u8 = 12;
const BIT_AND_BP: u8 = 14;
const SHIFT_BP: u8 = 16;
const SUM_BP: u8 = 18;
const PRODUCT_BP: u8 = 20;
const UNARY_BP: u8 = 22;
const POWER_BP: u8 = 24;

enum Infix {
    Binary(BinaryOp),
    Compare,
    BoolOp,
}

/// Parse a complete expression. Trailing tokens are a syntax error.
pub fn parse(input: &str) -> Result<Expr, CalcError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        operators: 0,
    };
    let expr = parser.parse_top()?;
    parser.expect_end()?;
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    operators: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        // tokenize always terminates the stream with End.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn at(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<(), CalcError> {
        if self.at(&kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn expect_end(&self) -> Result<(), CalcError> {
        if self.at(&TokenKind::End) {
            Ok(())
        } else {
            Err(self.unexpected("end of input"))
        }
    }

    fn unexpected(&self, expected: &str) -> CalcError {
        let token = self.peek();
        let found = match &token.kind {
            TokenKind::End => "end of input".to_string(),
            TokenKind::Int(i) => format!("'{}'", i),
            TokenKind::Float(f) => format!("'{}'", f),
            TokenKind::Ident(name) => format!("'{}'", name),
            TokenKind::Str(_) => "string literal".to_string(),
            other => format!("{:?}", other),
        };
        CalcError::syntax(format!("expected {}, found {}", expected, found), token.position)
    }

    fn enter(&mut self) -> Result<(), CalcError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(CalcError::TooDeep(MAX_DEPTH));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Parse one nested level, counted against [`MAX_DEPTH`].
    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, CalcError>,
    ) -> Result<T, CalcError> {
        self.enter()?;
        let result = f(self);
        self.leave();
        result
    }

    /// Top level: a bare comma-separated sequence is a tuple.
    fn parse_top(&mut self) -> Result<Expr, CalcError> {
        let first = self.parse_expr(0)?;
        if self.at(&TokenKind::Comma) {
            while self.at(&TokenKind::Comma) {
                self.advance();
                if self.at(&TokenKind::End) {
                    break;
                }
                self.parse_expr(0)?;
            }
            return Ok(Expr::Construct(Construct::Tuple));
        }
        Ok(first)
    }

    fn parse_expr(&mut self, min_bp: u8) -> Result<Expr, CalcError> {
        let mut lhs = self.parse_prefix()?;

        loop {
            let (infix, l_bp, r_bp) = match self.peek_infix() {
                Some(found) => found,
                None => break,
            };
            if l_bp < min_bp {
                break;
            }
            self.advance();
            self.operators += 1;
            if self.operators > MAX_OPERATORS {
                return Err(CalcError::TooManyOperators(MAX_OPERATORS));
            }
            let rhs = self.nested(|p| p.parse_expr(r_bp))?;
            lhs = match infix {
                Infix::Binary(op) => Expr::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                Infix::Compare => Expr::Construct(Construct::Compare),
                Infix::BoolOp => Expr::Construct(Construct::BoolOp),
            };
        }

        Ok(lhs)
    }

    fn peek_infix(&self) -> Option<(Infix, u8, u8)> {
        let left = |op, bp| Some((Infix::Binary(op), bp, bp + 1));
        match &self.peek().kind {
            TokenKind::Plus => left(BinaryOp::Add, SUM_BP),
            TokenKind::Minus => left(BinaryOp::Sub, SUM_BP),
            TokenKind::Star => left(BinaryOp::Mul, PRODUCT_BP),
            TokenKind::Slash => left(BinaryOp::Div, PRODUCT_BP),
            TokenKind::DoubleSlash => left(BinaryOp::FloorDiv, PRODUCT_BP),
            TokenKind::Percent => left(BinaryOp::Mod, PRODUCT_BP),
            TokenKind::At => left(BinaryOp::MatMul, PRODUCT_BP),
            TokenKind::LShift => left(BinaryOp::LShift, SHIFT_BP),
            TokenKind::RShift => left(BinaryOp::RShift, SHIFT_BP),
            TokenKind::Amp => left(BinaryOp::BitAnd, BIT_AND_BP),
            TokenKind::Caret => left(BinaryOp::BitXor, BIT_XOR_BP),
            TokenKind::Pipe => left(BinaryOp::BitOr, BIT_OR_BP),
            // Right-associative; the exponent may itself carry a unary sign.
            TokenKind::DoubleStar => Some((Infix::Binary(BinaryOp::Pow), POWER_BP, UNARY_BP)),
            TokenKind::EqEq
            | TokenKind::NotEq
            | TokenKind::Lt
            | TokenKind::Le
            | TokenKind::Gt
            | TokenKind::Ge => Some((Infix::Compare, COMPARE_BP, COMPARE_BP + 1)),
            TokenKind::Ident(name) => match name.as_str() {
                "in" | "is" => Some((Infix::Compare, COMPARE_BP, COMPARE_BP + 1)),
                "and" => Some((Infix::BoolOp, AND_BP, AND_BP + 1)),
                "or" => Some((Infix::BoolOp, OR_BP, OR_BP + 1)),
                _ => None,
            },
            _ => None,
        }
    }

    fn parse_prefix(&mut self) -> Result<Expr, CalcError> {
        let op = match &self.peek().kind {
            TokenKind::Minus => Some((UnaryOp::Neg, UNARY_BP)),
            TokenKind::Plus => Some((UnaryOp::Pos, UNARY_BP)),
            TokenKind::Tilde => Some((UnaryOp::Invert, UNARY_BP)),
            TokenKind::Ident(name) if name == "not" => Some((UnaryOp::Not, NOT_BP)),
            _ => None,
        };
        match op {
            Some((op, bp)) => {
                self.advance();
                let operand = self.nested(|p| p.parse_expr(bp))?;
                Ok(Expr::Unary {
                    op,
                    operand: Box::new(operand),
                })
            }
            None => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<Expr, CalcError> {
        let mut expr = self.parse_atom()?;
        loop {
            match &self.peek().kind {
                TokenKind::LParen => {
                    self.advance();
                    self.nested(|p| p.parse_sequence(TokenKind::RParen, "')'"))?;
                    expr = Expr::Construct(Construct::Call);
                }
                TokenKind::Dot => {
                    self.advance();
                    let token = self.advance();
                    match token.kind {
                        TokenKind::Ident(attr) => {
                            expr = Expr::Construct(Construct::Attribute(attr));
                        }
                        _ => {
                            return Err(CalcError::syntax(
                                "expected attribute name after '.'",
                                token.position,
                            ))
                        }
                    }
                }
                TokenKind::LBracket => {
                    self.advance();
                    self.nested(|p| {
                        p.parse_expr(0)?;
                        p.expect(TokenKind::RBracket, "']'")
                    })?;
                    expr = Expr::Construct(Construct::Subscript);
                }
                _ => return Ok(expr),
            }
        }
    }

    /// Comma-separated expressions up to and including `close`.
    fn parse_sequence(&mut self, close: TokenKind, what: &str) -> Result<(), CalcError> {
        while !self.at(&close) {
            self.parse_expr(0)?;
            if self.at(&TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(close, what)
    }

    /// Group or tuple; the opening parenthesis is already consumed.
    fn parse_parenthesized(&mut self) -> Result<Expr, CalcError> {
        if self.at(&TokenKind::RParen) {
            self.advance();
            return Ok(Expr::Construct(Construct::Tuple));
        }
        let inner = self.parse_expr(0)?;
        if self.at(&TokenKind::Comma) {
            self.advance();
            self.parse_sequence(TokenKind::RParen, "')'")?;
            return Ok(Expr::Construct(Construct::Tuple));
        }
        self.expect(TokenKind::RParen, "')'")?;
        Ok(inner)
    }

    fn parse_atom(&mut self) -> Result<Expr, CalcError> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Int(i) => {
                self.advance();
                Ok(Expr::Number(Number::Int(i)))
            }
            TokenKind::Float(f) => {
                self.advance();
                Ok(Expr::Number(Number::Float(f)))
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(Expr::Literal(Literal::Str(s)))
            }
            TokenKind::Ident(name) => match name.as_str() {
                "True" => {
                    self.advance();
                    Ok(Expr::Literal(Literal::Bool(true)))
                }
                "False" => {
                    self.advance();
                    Ok(Expr::Literal(Literal::Bool(false)))
                }
                "None" => {
                    self.advance();
                    Ok(Expr::Literal(Literal::None))
                }
                "and" | "or" | "not" | "in" | "is" => Err(self.unexpected("an operand")),
                _ => {
                    self.advance();
                    Ok(Expr::Construct(Construct::Name(name)))
                }
            },
            TokenKind::LParen => {
                self.advance();
                self.nested(Self::parse_parenthesized)
            }
            TokenKind::LBracket => {
                self.advance();
                self.nested(|p| p.parse_sequence(TokenKind::RBracket, "']'"))?;
                Ok(Expr::Construct(Construct::List))
            }
            _ => Err(self.unexpected("an operand")),
        }
    }
}
