//! Lossless decimal numeric type backed by bigdecimal.
//!
//! Provides exact mantissa scaling, truncation and a plain (exponent-free)
//! canonical string form used for storage and API output.

use crate::domain::Amount;
use bigdecimal::num_bigint::Sign;
use bigdecimal::{BigDecimal, ParseBigDecimalError, Zero};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Arbitrary-precision decimal for USD values, prices, rates and ratios.
///
/// Oracle mantissas reach 10^30 and beyond, so a fixed 96-bit mantissa is not
/// enough here.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Decimal(BigDecimal);

impl Decimal {
    /// Parse a Decimal from a string losslessly.
    ///
    /// # Errors
    /// Returns an error if the string is not a valid decimal number.
    pub fn from_str_canonical(s: &str) -> Result<Self, ParseBigDecimalError> {
        BigDecimal::from_str(s.trim()).map(Decimal)
    }

    /// Exact `raw / 10^exponent`. A negative exponent multiplies.
    pub fn from_mantissa(raw: &Amount, exponent: i64) -> Self {
        Decimal(BigDecimal::new(raw.inner().clone(), exponent))
    }

    pub fn from_i64(value: i64) -> Self {
        Decimal(BigDecimal::from(value))
    }

    /// Format without exponent notation and without trailing zeros.
    pub fn to_canonical_string(&self) -> String {
        let (digits, scale) = self.0.normalized().as_bigint_and_exponent();
        if digits.is_zero() {
            return "0".to_string();
        }

        let negative = digits.sign() == Sign::Minus;
        let magnitude = digits.magnitude().to_string();
        let body = if scale <= 0 {
            let mut s = magnitude;
            s.extend(std::iter::repeat('0').take((-scale) as usize));
            s
        } else {
            let scale = scale as usize;
            let padded = if magnitude.len() <= scale {
                format!("{}{}", "0".repeat(scale - magnitude.len() + 1), magnitude)
            } else {
                magnitude
            };
            let split = padded.len() - scale;
            format!("{}.{}", &padded[..split], &padded[split..])
        };

        if negative {
            format!("-{}", body)
        } else {
            body
        }
    }

    /// Get the underlying BigDecimal.
    pub fn inner(&self) -> &BigDecimal {
        &self.0
    }

    /// The additive identity (0).
    pub fn zero() -> Self {
        Decimal(BigDecimal::zero())
    }

    pub fn one() -> Self {
        Decimal(BigDecimal::from(1))
    }

    /// Returns true if the value is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Drop every digit past `places` fractional digits, rounding toward zero.
    pub fn truncate(&self, places: u32) -> Self {
        let (_, scale) = self.0.as_bigint_and_exponent();
        if scale <= places as i64 {
            return self.clone();
        }
        Decimal(self.0.with_scale(places as i64))
    }

    /// Division that yields `None` instead of panicking on a zero divisor.
    pub fn checked_div(&self, rhs: &Decimal) -> Option<Decimal> {
        if rhs.is_zero() {
            return None;
        }
        Some(Decimal(&self.0 / &rhs.0))
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl FromStr for Decimal {
    type Err = ParseBigDecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_canonical(s)
    }
}

// Arithmetic operations
impl std::ops::Add for Decimal {
    type Output = Decimal;

    fn add(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 + rhs.0)
    }
}

impl<'a> std::ops::Add<&'a Decimal> for &'a Decimal {
    type Output = Decimal;

    fn add(self, rhs: &'a Decimal) -> Decimal {
        Decimal(&self.0 + &rhs.0)
    }
}

impl std::ops::Sub for Decimal {
    type Output = Decimal;

    fn sub(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 - rhs.0)
    }
}

impl<'a> std::ops::Sub<&'a Decimal> for &'a Decimal {
    type Output = Decimal;

    fn sub(self, rhs: &'a Decimal) -> Decimal {
        Decimal(&self.0 - &rhs.0)
    }
}

impl std::ops::Mul for Decimal {
    type Output = Decimal;

    fn mul(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 * rhs.0)
    }
}

impl<'a> std::ops::Mul<&'a Decimal> for &'a Decimal {
    type Output = Decimal;

    fn mul(self, rhs: &'a Decimal) -> Decimal {
        Decimal(&self.0 * &rhs.0)
    }
}
