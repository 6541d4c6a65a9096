//! Mantissa conventions shared by the pool contracts.

use crate::domain::{Amount, Decimal};

/// Decimals of every `1e18`-scaled mantissa (rates, factors, exchange rates).
pub const MANTISSA_DECIMALS: u32 = 18;

/// Decimals of every pool (share) token.
pub const POOL_TOKEN_DECIMALS: u32 = 8;

/// Blocks per day assumed by the rate model (~13.15s blocks).
pub const BLOCKS_PER_DAY: u64 = 6570;

pub const BLOCKS_PER_YEAR: u64 = 365 * BLOCKS_PER_DAY;

/// `raw / 1e18`, e.g. a reserve factor or collateral factor mantissa.
pub fn mantissa_to_ratio(raw: &Amount) -> Decimal {
    Decimal::from_mantissa(raw, MANTISSA_DECIMALS as i64)
}

/// Convert a token amount in base units to whole tokens.
pub fn amount_to_decimal(raw: &Amount, decimals: u32) -> Decimal {
    Decimal::from_mantissa(raw, decimals as i64)
}

/// Simple (non-compounded) annualisation of a per-block rate mantissa.
pub fn rate_per_block_to_apy(rate_per_block: &Amount, blocks_per_year: u64) -> Decimal {
    mantissa_to_ratio(&rate_per_block.times(blocks_per_year))
}

/// Underlying tokens per pool token, given `exchangeRateStored`.
///
/// The stored rate is scaled by `1e(18 + underlying_decimals - 8)`.
pub fn exchange_rate_to_decimal(exchange_rate: &Amount, underlying_decimals: u32) -> Decimal {
    let exponent =
        MANTISSA_DECIMALS as i64 + underlying_decimals as i64 - POOL_TOKEN_DECIMALS as i64;
    Decimal::from_mantissa(exchange_rate, exponent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn a(s: &str) -> Amount {
        Amount::from_str(s).unwrap()
    }

    #[test]
    fn test_mantissa_to_ratio() {
        assert_eq!(mantissa_to_ratio(&a("750000000000000000")), d("0.75"));
        assert_eq!(mantissa_to_ratio(&a("1080000000000000000")), d("1.08"));
    }

    #[test]
    fn test_rate_per_block_to_apy() {
        // 1e10 per block -> 1e10 * 2_398_050 / 1e18
        let apy = rate_per_block_to_apy(&a("10000000000"), BLOCKS_PER_YEAR);
        assert_eq!(apy, d("0.0239805"));
    }

    #[test]
    fn test_exchange_rate_for_six_decimal_asset() {
        // cUSDC: ~0.02 USDC per cUSDC is stored as 2e14 (scale 1e16)
        let rate = exchange_rate_to_decimal(&a("200000000000000"), 6);
        assert_eq!(rate, d("0.02"));
    }

    #[test]
    fn test_amount_to_decimal() {
        assert_eq!(amount_to_decimal(&a("2500000"), 6), d("2.5"));
        assert_eq!(amount_to_decimal(&a("5"), 0), d("5"));
    }
}
