//! Fixed-point math implementation
//!
//! Signed 64.64 arithmetic used throughout the pricing engine. Prices,
//! z-scores and order sizes are all signed quantities, so the kernel keeps
//! the sign in the raw representation and routes magnitudes through
//! unsigned cross-product multiplication and a 256-bit division
//! intermediate.

use borsh::{BorshDeserialize, BorshSerialize};
use num_traits::{One, Zero};
use solana_program::program_error::ProgramError;
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

use crate::constants::{FRACTION_BITS, ONE_RAW};
use crate::error::QuantumMarketError;
use crate::math::u256;

/// 64.64 signed fixed-point number (64 bits integer, 64 bits fraction)
#[derive(
    BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default,
)]
pub struct I64F64 {
    pub raw: i128,
}

impl I64F64 {
    /// The number 0.0
    pub const ZERO: Self = Self { raw: 0 };

    /// The number 1.0
    pub const ONE: Self = Self { raw: ONE_RAW };

    /// Create from raw value
    pub const fn from_raw(raw: i128) -> Self {
        Self { raw }
    }

    /// Create from integer
    pub fn from_num(num: i64) -> Self {
        Self {
            raw: (num as i128) << FRACTION_BITS,
        }
    }

    /// Create from numerator and denominator
    pub fn from_fraction(numerator: i64, denominator: i64) -> Result<Self, ProgramError> {
        if denominator == 0 {
            return Err(QuantumMarketError::DivisionByZero.into());
        }

        let raw = (numerator as i128)
            .checked_mul(ONE_RAW)
            .and_then(|n| n.checked_div(denominator as i128))
            .ok_or::<ProgramError>(QuantumMarketError::ArithmeticOverflow.into())?;

        Ok(Self { raw })
    }

    /// Convert to integer (truncating toward negative infinity)
    pub fn to_num(&self) -> i64 {
        (self.raw >> FRACTION_BITS) as i64
    }

    /// Check if value is zero
    pub fn is_zero(&self) -> bool {
        self.raw == 0
    }

    /// Check if value is negative
    pub fn is_negative(&self) -> bool {
        self.raw < 0
    }

    /// Absolute value
    pub fn abs(&self) -> Self {
        if self.raw == i128::MIN {
            Self { raw: i128::MAX }
        } else {
            Self {
                raw: self.raw.abs(),
            }
        }
    }

    /// Checked negation
    pub fn checked_neg(&self) -> Result<Self, ProgramError> {
        self.raw
            .checked_neg()
            .map(Self::from_raw)
            .ok_or(QuantumMarketError::ArithmeticOverflow.into())
    }

    /// Checked addition
    pub fn checked_add(&self, other: I64F64) -> Result<I64F64, ProgramError> {
        self.raw
            .checked_add(other.raw)
            .map(I64F64::from_raw)
            .ok_or(QuantumMarketError::ArithmeticOverflow.into())
    }

    /// Checked subtraction
    pub fn checked_sub(&self, other: I64F64) -> Result<I64F64, ProgramError> {
        self.raw
            .checked_sub(other.raw)
            .map(I64F64::from_raw)
            .ok_or(QuantumMarketError::ArithmeticOverflow.into())
    }

    /// Checked multiplication
    pub fn checked_mul(&self, other: I64F64) -> Result<I64F64, ProgramError> {
        let negative = self.is_negative() != other.is_negative();
        let magnitude = mul_magnitudes(self.raw.unsigned_abs(), other.raw.unsigned_abs())?;

        if magnitude > i128::MAX as u128 {
            return Err(QuantumMarketError::ArithmeticOverflow.into());
        }

        let raw = if negative {
            -(magnitude as i128)
        } else {
            magnitude as i128
        };

        Ok(I64F64::from_raw(raw))
    }

    /// Checked division
    pub fn checked_div(&self, other: I64F64) -> Result<I64F64, ProgramError> {
        if other.is_zero() {
            return Err(QuantumMarketError::DivisionByZero.into());
        }

        let negative = self.is_negative() != other.is_negative();

        // Widen the numerator so the fractional bits survive the divide
        let quotient = u256::widen_numerator(self.raw.unsigned_abs())
            .div_u128(other.raw.unsigned_abs())
            .ok_or::<ProgramError>(QuantumMarketError::DivisionByZero.into())?;

        if quotient.hi != 0 || quotient.lo > i128::MAX as u128 {
            return Err(QuantumMarketError::ArithmeticOverflow.into());
        }

        let raw = if negative {
            -(quotient.lo as i128)
        } else {
            quotient.lo as i128
        };

        Ok(I64F64::from_raw(raw))
    }

    /// Saturating addition
    pub fn saturating_add(self, other: I64F64) -> I64F64 {
        I64F64 {
            raw: self.raw.saturating_add(other.raw),
        }
    }

    /// Saturating subtraction
    pub fn saturating_sub(self, other: I64F64) -> I64F64 {
        I64F64 {
            raw: self.raw.saturating_sub(other.raw),
        }
    }

    /// Square root using Newton's method
    ///
    /// Defined for non-negative inputs only.
    pub fn sqrt(&self) -> Result<I64F64, ProgramError> {
        if self.is_negative() {
            return Err(QuantumMarketError::ArithmeticOverflow.into());
        }
        if self.is_zero() {
            return Ok(I64F64::ZERO);
        }

        // Initial guess: x0 = max(self / 2, 1 ulp)
        let mut x = I64F64::from_raw((self.raw >> 1).max(1));

        // Newton's iteration: x_{n+1} = (x_n + self/x_n) / 2
        for _ in 0..40 {
            let next = x
                .checked_add(self.checked_div(x)?)?
                .checked_div(I64F64::from_num(2))?;

            if next.raw.abs_diff(x.raw) <= 1 {
                x = next;
                break;
            }

            x = next;
        }

        Ok(x)
    }

    /// Exponential function via Taylor series
    ///
    /// Negative arguments go through the reciprocal of exp(|x|).
    pub fn exp(&self) -> Result<I64F64, ProgramError> {
        if self.is_negative() {
            let positive = self.abs().exp()?;
            return I64F64::ONE.checked_div(positive);
        }

        if self.raw > I64F64::from_num(20).raw {
            return Err(QuantumMarketError::ArithmeticOverflow.into());
        }

        let mut result = I64F64::ONE;
        let mut term = I64F64::ONE;

        for i in 1..=64i64 {
            term = term.checked_mul(*self)?.checked_div(I64F64::from_num(i))?;

            if term.is_zero() {
                break;
            }

            result = result.checked_add(term)?;
        }

        Ok(result)
    }

    /// Smaller of two values
    pub fn min(self, other: I64F64) -> I64F64 {
        if self.raw <= other.raw {
            self
        } else {
            other
        }
    }

    /// Larger of two values
    pub fn max(self, other: I64F64) -> I64F64 {
        if self.raw >= other.raw {
            self
        } else {
            other
        }
    }

    /// Clamp into an inclusive band
    pub fn clamp(self, lo: I64F64, hi: I64F64) -> I64F64 {
        self.max(lo).min(hi)
    }
}

/// 64.64 magnitude product via 64-bit cross terms, keeping the full
/// intermediate inside u128
fn mul_magnitudes(a: u128, b: u128) -> Result<u128, ProgramError> {
    let mask = (1u128 << FRACTION_BITS) - 1;
    let a_int = a >> FRACTION_BITS;
    let a_frac = a & mask;
    let b_int = b >> FRACTION_BITS;
    let b_frac = b & mask;

    let overflow: ProgramError = QuantumMarketError::ArithmeticOverflow.into();

    let int_int = a_int.checked_mul(b_int).ok_or(overflow)?;
    let int_frac_a = a_int
        .checked_mul(b_frac)
        .ok_or::<ProgramError>(QuantumMarketError::ArithmeticOverflow.into())?;
    let int_frac_b = b_int
        .checked_mul(a_frac)
        .ok_or::<ProgramError>(QuantumMarketError::ArithmeticOverflow.into())?;
    let frac_frac = a_frac
        .checked_mul(b_frac)
        .ok_or::<ProgramError>(QuantumMarketError::ArithmeticOverflow.into())?;

    int_int
        .checked_mul(1u128 << FRACTION_BITS)
        .and_then(|r| r.checked_add(int_frac_a))
        .and_then(|r| r.checked_add(int_frac_b))
        .and_then(|r| r.checked_add(frac_frac >> FRACTION_BITS))
        .ok_or(QuantumMarketError::ArithmeticOverflow.into())
}

impl fmt::Display for I64F64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let magnitude = self.raw.unsigned_abs();
        let whole = magnitude >> FRACTION_BITS;
        let frac = magnitude & ((1u128 << FRACTION_BITS) - 1);
        let decimal = (frac * 1_000_000) >> FRACTION_BITS;
        let sign = if self.raw < 0 { "-" } else { "" };
        write!(f, "{}{}.{:06}", sign, whole, decimal)
    }
}

impl Zero for I64F64 {
    fn zero() -> Self {
        Self::ZERO
    }

    fn is_zero(&self) -> bool {
        self.raw == 0
    }
}

impl One for I64F64 {
    fn one() -> Self {
        Self::ONE
    }
}

impl Add for I64F64 {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        self.saturating_add(other)
    }
}

impl Sub for I64F64 {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        self.saturating_sub(other)
    }
}

impl Neg for I64F64 {
    type Output = Self;

    fn neg(self) -> Self {
        Self {
            raw: self.raw.saturating_neg(),
        }
    }
}

impl Mul for I64F64 {
    type Output = Self;

    fn mul(self, other: Self) -> Self {
        self.checked_mul(other)
            .unwrap_or(Self { raw: i128::MAX })
    }
}

impl Div for I64F64 {
    type Output = Self;

    fn div(self, other: Self) -> Self {
        if other.is_zero() {
            panic!("Division by zero in I64F64");
        }
        self.checked_div(other)
            .unwrap_or(Self { raw: i128::MAX })
    }
}
