//! Numeric values and the arithmetic applied to them.
//!
//! Integers are arbitrary precision and stay integral through `+ - * % **`;
//! `/` always produces a float; mixing an integer with a float promotes to
//! float. `%` is a floored modulo: the result takes the sign of the divisor.
//! Integer results wider than [`MAX_INT_BITS`] are reported as overflow.

use std::fmt;

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Signed, ToPrimitive, Zero};

use crate::error::CalcError;

/// Widest integer, in bits, a literal or result may have (about 4900 decimal digits).
pub const MAX_INT_BITS: u64 = 16_384;

/// Result of evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Number {
    Int(BigInt),
    Float(f64),
}

impl From<i64> for Number {
    fn from(i: i64) -> Self {
        Number::Int(BigInt::from(i))
    }
}

impl Number {
    /// Convert to a float. Integers too large for `f64` overflow.
    pub fn to_f64(&self) -> Result<f64, CalcError> {
        match self {
            Number::Int(i) => i
                .to_f64()
                .filter(|f| f.is_finite())
                .ok_or(CalcError::Overflow),
            Number::Float(f) => Ok(*f),
        }
    }

    fn is_zero(&self) -> bool {
        match self {
            Number::Int(i) => i.is_zero(),
            Number::Float(f) => *f == 0.0,
        }
    }

    pub fn add(self, rhs: Number) -> Result<Number, CalcError> {
        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) => checked_int(a + b),
            (a, b) => Ok(Number::Float(a.to_f64()? + b.to_f64()?)),
        }
    }

    pub fn sub(self, rhs: Number) -> Result<Number, CalcError> {
        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) => checked_int(a - b),
            (a, b) => Ok(Number::Float(a.to_f64()? - b.to_f64()?)),
        }
    }

    pub fn mul(self, rhs: Number) -> Result<Number, CalcError> {
        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) => {
                if a.bits() + b.bits() > MAX_INT_BITS + 1 {
                    return Err(CalcError::Overflow);
                }
                checked_int(a * b)
            }
            (a, b) => Ok(Number::Float(a.to_f64()? * b.to_f64()?)),
        }
    }

    /// True division.
    pub fn div(self, rhs: Number) -> Result<Number, CalcError> {
        if rhs.is_zero() {
            return Err(CalcError::DivisionByZero);
        }
        Ok(Number::Float(self.to_f64()? / rhs.to_f64()?))
    }

    /// Floored modulo.
    pub fn rem(self, rhs: Number) -> Result<Number, CalcError> {
        if rhs.is_zero() {
            return Err(CalcError::ModuloByZero);
        }
        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) => Ok(Number::Int(a.mod_floor(&b))),
            (a, b) => {
                let (a, b) = (a.to_f64()?, b.to_f64()?);
                let mut r = a % b;
                if r != 0.0 {
                    if (r < 0.0) != (b < 0.0) {
                        r += b;
                    }
                } else {
                    r = 0.0_f64.copysign(b);
                }
                Ok(Number::Float(r))
            }
        }
    }

    pub fn pow(self, rhs: Number) -> Result<Number, CalcError> {
        match (self, rhs) {
            (Number::Int(base), Number::Int(exp)) if !exp.is_negative() => int_pow(base, exp),
            (base, exp) => {
                let (b, e) = (base.to_f64()?, exp.to_f64()?);
                if b == 0.0 && e < 0.0 {
                    return Err(CalcError::ZeroToNegativePower);
                }
                if b < 0.0 && e.is_finite() && e.fract() != 0.0 {
                    return Err(CalcError::ComplexResult);
                }
                let r = b.powf(e);
                if r.is_infinite() && b.is_finite() && e.is_finite() {
                    return Err(CalcError::Overflow);
                }
                Ok(Number::Float(r))
            }
        }
    }

    pub fn neg(self) -> Result<Number, CalcError> {
        match self {
            Number::Int(i) => Ok(Number::Int(-i)),
            Number::Float(f) => Ok(Number::Float(-f)),
        }
    }
}

fn checked_int(value: BigInt) -> Result<Number, CalcError> {
    if value.bits() > MAX_INT_BITS {
        return Err(CalcError::Overflow);
    }
    Ok(Number::Int(value))
}

fn int_pow(base: BigInt, exp: BigInt) -> Result<Number, CalcError> {
    if base.is_zero() {
        return Ok(Number::Int(if exp.is_zero() { BigInt::one() } else { BigInt::zero() }));
    }
    if base.is_one() {
        return Ok(Number::Int(base));
    }
    if base == -BigInt::one() {
        return Ok(Number::Int(if exp.is_even() { BigInt::one() } else { base }));
    }
    // |base| >= 2, so the result has at least (bits - 1) * exp + 1 bits.
    let exp = exp
        .to_u32()
        .filter(|e| (base.bits() - 1) * u64::from(*e) < MAX_INT_BITS)
        .ok_or(CalcError::Overflow)?;
    checked_int(base.pow(exp))
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{}", i),
            Number::Float(x) => f.write_str(&format_float(*x)),
        }
    }
}

/// Render a float the way a calculator user expects to read it back:
/// always with a fractional part or an exponent, exponent form outside
/// `[1e-4, 1e16)`.
fn format_float(x: f64) -> String {
    if x.is_nan() {
        return "nan".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let abs = x.abs();
    if abs != 0.0 && !(1e-4..1e16).contains(&abs) {
        let sci = format!("{:e}", x);
        return match sci.split_once('e') {
            Some((mantissa, exp)) => {
                let (sign, digits) = match exp.strip_prefix('-') {
                    Some(d) => ('-', d),
                    None => ('+', exp),
                };
                format!("{}e{}{:0>2}", mantissa, sign, digits)
            }
            None => sci,
        };
    }
    let plain = format!("{}", x);
    if plain.contains('.') {
        plain
    } else {
        format!("{}.0", plain)
    }
}
