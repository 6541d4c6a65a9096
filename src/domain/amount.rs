//! Raw on-chain integer amounts (token base units and 1e18 mantissas).

use bigdecimal::num_bigint::{BigInt, ParseBigIntError, Sign};
use bigdecimal::Zero;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Arbitrary-precision integer amount as emitted by contracts.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(BigInt);

impl Amount {
    /// Parse a base-10 integer string.
    pub fn from_str_canonical(s: &str) -> Result<Self, ParseBigIntError> {
        BigInt::from_str(s.trim()).map(Amount)
    }

    /// Decode an unsigned big-endian word as returned by `eth_call`.
    pub fn from_be_bytes(bytes: &[u8]) -> Self {
        Amount(BigInt::from_bytes_be(Sign::Plus, bytes))
    }

    pub fn zero() -> Self {
        Amount(BigInt::zero())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn inner(&self) -> &BigInt {
        &self.0
    }

    pub fn to_canonical_string(&self) -> String {
        self.0.to_string()
    }

    /// Multiply by a small unsigned factor (e.g. blocks per year).
    pub fn times(&self, factor: u64) -> Amount {
        Amount(&self.0 * BigInt::from(factor))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = ParseBigIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_canonical(s)
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Amount(BigInt::from(value))
    }
}

impl From<i64> for Amount {
    fn from(value: i64) -> Self {
        Amount(BigInt::from(value))
    }
}

impl<'a> std::ops::Add<&'a Amount> for &'a Amount {
    type Output = Amount;

    fn add(self, rhs: &'a Amount) -> Amount {
        Amount(&self.0 + &rhs.0)
    }
}

impl<'a> std::ops::Sub<&'a Amount> for &'a Amount {
    type Output = Amount;

    fn sub(self, rhs: &'a Amount) -> Amount {
        Amount(&self.0 - &rhs.0)
    }
}

// Serialized as a decimal string; JSON numbers are accepted on input since
// small amounts are often emitted that way.
impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AmountVisitor;

        impl<'de> Visitor<'de> for AmountVisitor {
            type Value = Amount;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an integer or a base-10 integer string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
                Amount::from_str_canonical(v).map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
                Ok(Amount::from(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
                Ok(Amount::from(v))
            }
        }

        deserializer.deserialize_any(AmountVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_arithmetic() {
        let a = Amount::from(100u64);
        let b = Amount::from(40u64);
        assert_eq!(&a + &b, Amount::from(140u64));
        assert_eq!(&b - &a, Amount::from(-60i64));
        assert_eq!(a.times(3), Amount::from(300u64));
    }

    #[test]
    fn test_amount_from_be_bytes() {
        let mut word = [0u8; 32];
        word[31] = 0x2a;
        word[30] = 0x01;
        assert_eq!(Amount::from_be_bytes(&word), Amount::from(298u64));
    }

    #[test]
    fn test_amount_json_accepts_string_and_number() {
        let from_string: Amount = serde_json::from_str("\"123456789012345678901234567890\"").unwrap();
        assert_eq!(from_string.to_canonical_string(), "123456789012345678901234567890");

        let from_number: Amount = serde_json::from_str("42").unwrap();
        assert_eq!(from_number, Amount::from(42u64));

        let json = serde_json::to_string(&from_string).unwrap();
        assert_eq!(json, "\"123456789012345678901234567890\"");
    }

    #[test]
    fn test_amount_rejects_garbage() {
        assert!(Amount::from_str_canonical("12abc").is_err());
    }
}
