//! Markets and the tokens they reference.

use crate::domain::{Amount, Decimal, Timestamp};
use serde::{Deserialize, Serialize};

/// A pool (share) token or an underlying asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
}

/// One listed pool, keyed by its pool-token address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Market {
    pub id: String,
    pub protocol_id: String,
    pub name: String,

    /// Underlying token id; `None` means no input token is registered.
    pub input_token: Option<String>,
    pub input_token_balance: Amount,
    pub input_token_price_usd: Decimal,
    pub output_token: Option<String>,
    pub output_token_supply: Amount,
    pub output_token_price_usd: Decimal,

    pub total_value_locked_usd: Decimal,
    pub total_deposit_usd: Decimal,
    pub total_borrow_usd: Decimal,

    pub maximum_ltv: Decimal,
    pub liquidation_threshold: Decimal,
    pub liquidation_penalty: Decimal,
    pub reserve_factor: Decimal,

    pub deposit_rate: Decimal,
    pub variable_borrow_rate: Decimal,

    // Per-block rates; integrated over block ranges by the financials snapshot.
    pub total_revenue_usd_per_block: Decimal,
    pub protocol_side_revenue_usd_per_block: Decimal,
    pub supply_side_revenue_usd_per_block: Decimal,

    pub is_active: bool,
    pub can_use_as_collateral: bool,
    pub can_borrow_from: bool,

    pub created_timestamp: Timestamp,
    pub created_block: u64,
    pub last_accrued_block: u64,
}

impl Market {
    /// A freshly listed market with zero balances and prices.
    pub fn listed(
        pool_token: &Token,
        underlying: &Token,
        protocol_id: &str,
        liquidation_penalty: Decimal,
        created_timestamp: Timestamp,
        created_block: u64,
    ) -> Self {
        Market {
            id: pool_token.id.clone(),
            protocol_id: protocol_id.to_string(),
            name: pool_token.name.clone(),
            input_token: Some(underlying.id.clone()),
            input_token_balance: Amount::zero(),
            input_token_price_usd: Decimal::zero(),
            output_token: Some(pool_token.id.clone()),
            output_token_supply: Amount::zero(),
            output_token_price_usd: Decimal::zero(),
            total_value_locked_usd: Decimal::zero(),
            total_deposit_usd: Decimal::zero(),
            total_borrow_usd: Decimal::zero(),
            maximum_ltv: Decimal::zero(),
            liquidation_threshold: Decimal::zero(),
            liquidation_penalty,
            reserve_factor: Decimal::zero(),
            deposit_rate: Decimal::zero(),
            variable_borrow_rate: Decimal::zero(),
            total_revenue_usd_per_block: Decimal::zero(),
            protocol_side_revenue_usd_per_block: Decimal::zero(),
            supply_side_revenue_usd_per_block: Decimal::zero(),
            is_active: true,
            can_use_as_collateral: true,
            can_borrow_from: true,
            created_timestamp,
            created_block,
            last_accrued_block: 0,
        }
    }

    /// True when an accrual at `block` has already been applied.
    pub fn is_accrued_at(&self, block: u64) -> bool {
        block <= self.last_accrued_block
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(id: &str, decimals: u32) -> Token {
        Token {
            id: id.to_string(),
            name: format!("Token {}", id),
            symbol: id.to_uppercase(),
            decimals,
        }
    }

    #[test]
    fn test_listed_market_defaults() {
        let market = Market::listed(
            &token("0xc", 8),
            &token("0xu", 18),
            "0xp",
            Decimal::from_i64(1),
            Timestamp::new(100),
            42,
        );
        assert_eq!(market.input_token.as_deref(), Some("0xu"));
        assert_eq!(market.output_token.as_deref(), Some("0xc"));
        assert!(market.input_token_balance.is_zero());
        assert!(market.is_active && market.can_borrow_from && market.can_use_as_collateral);
        assert_eq!(market.last_accrued_block, 0);
        assert_eq!(market.created_block, 42);
    }

    #[test]
    fn test_is_accrued_at() {
        let mut market = Market::listed(
            &token("0xc", 8),
            &token("0xu", 18),
            "0xp",
            Decimal::zero(),
            Timestamp::new(0),
            1,
        );
        market.last_accrued_block = 100;
        assert!(market.is_accrued_at(99));
        assert!(market.is_accrued_at(100));
        assert!(!market.is_accrued_at(101));
    }
}
