//! Domain primitives: Address, Timestamp, DayBucket.

use chrono::{NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Seconds in one snapshot bucket.
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Block timestamp in seconds since Unix epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn new(secs: i64) -> Self {
        Timestamp(secs)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }

    /// The day bucket this timestamp falls in.
    pub fn day_bucket(&self) -> DayBucket {
        DayBucket::from_timestamp(*self)
    }
}

/// `floor(timestamp / 86400)`, the partition key for daily snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DayBucket(pub i64);

impl DayBucket {
    pub fn new(day: i64) -> Self {
        DayBucket(day)
    }

    pub fn from_timestamp(ts: Timestamp) -> Self {
        DayBucket(ts.as_i64().div_euclid(SECONDS_PER_DAY))
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }

    /// First second of the bucket.
    pub fn start(&self) -> Timestamp {
        Timestamp(self.0 * SECONDS_PER_DAY)
    }

    /// UTC calendar date of the bucket, `None` outside chrono's range.
    pub fn date(&self) -> Option<NaiveDate> {
        Utc.timestamp_opt(self.start().as_i64(), 0)
            .single()
            .map(|dt| dt.date_naive())
    }
}

impl std::fmt::Display for DayBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Account or contract address, normalized to lower-case `0x`-prefixed hex.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressParseError {
    #[error("address must start with 0x: {0}")]
    MissingPrefix(String),
    #[error("address must have 40 hex digits: {0}")]
    InvalidLength(String),
    #[error("address contains non-hex characters: {0}")]
    InvalidHex(String),
}

impl Address {
    /// Create an Address without validation (trusted sources such as storage).
    pub fn new(addr: impl Into<String>) -> Self {
        Address(addr.into().to_lowercase())
    }

    /// The all-zero address, used as the pseudo-address of native ETH.
    pub fn zero() -> Self {
        Address(format!("0x{}", "0".repeat(40)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn from_bytes(bytes: &[u8; 20]) -> Self {
        Address(format!("0x{}", hex::encode(bytes)))
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| AddressParseError::MissingPrefix(s.to_string()))?;
        if digits.len() != 40 {
            return Err(AddressParseError::InvalidLength(s.to_string()));
        }
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AddressParseError::InvalidHex(s.to_string()));
        }
        Ok(Address(format!("0x{}", digits.to_lowercase())))
    }
}

impl TryFrom<String> for Address {
    type Error = AddressParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Address::from_str(&value)
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.0
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_normalizes_case() {
        let addr = Address::from_str("0x4DDC2D193948926D02F9B1FE9E1DAA0718270ED5").unwrap();
        assert_eq!(addr.as_str(), "0x4ddc2d193948926d02f9b1fe9e1daa0718270ed5");
    }

    #[test]
    fn test_address_rejects_malformed() {
        assert!(matches!(
            Address::from_str("4ddc2d193948926d02f9b1fe9e1daa0718270ed5"),
            Err(AddressParseError::MissingPrefix(_))
        ));
        assert!(matches!(
            Address::from_str("0x1234"),
            Err(AddressParseError::InvalidLength(_))
        ));
        assert!(matches!(
            Address::from_str("0xzzzc2d193948926d02f9b1fe9e1daa0718270ed5"),
            Err(AddressParseError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_address_from_bytes() {
        let mut bytes = [0u8; 20];
        bytes[0] = 0x39;
        bytes[19] = 0x63;
        assert_eq!(
            Address::from_bytes(&bytes).as_str(),
            "0x3900000000000000000000000000000000000063"
        );
    }

    #[test]
    fn test_address_json_is_validated() {
        let ok: Address =
            serde_json::from_str("\"0xA0B86991C6218B36C1D19D4A2E9EB0CE3606EB48\"").unwrap();
        assert_eq!(ok.as_str(), "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
        assert!(serde_json::from_str::<Address>("\"not-an-address\"").is_err());
    }

    #[test]
    fn test_day_bucket_floors() {
        assert_eq!(Timestamp::new(0).day_bucket(), DayBucket::new(0));
        assert_eq!(Timestamp::new(86_399).day_bucket(), DayBucket::new(0));
        assert_eq!(Timestamp::new(86_400).day_bucket(), DayBucket::new(1));
        assert_eq!(Timestamp::new(1_600_000_000).day_bucket(), DayBucket::new(18_518));
        assert_eq!(DayBucket::new(2).start(), Timestamp::new(172_800));
    }

    #[test]
    fn test_day_bucket_date() {
        let date = DayBucket::new(18_692).date().unwrap();
        assert_eq!(date.to_string(), "2021-03-06");
    }
}
