//! Domain events delivered by the ingestion collaborator.

use crate::domain::{Address, Amount, EventOrderingKey, Timestamp};
use serde::{Deserialize, Serialize};

/// One confirmed contract log, decoded into a typed event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LendingEvent {
    pub block_height: u64,
    pub block_timestamp: Timestamp,
    pub tx_hash: String,
    pub log_index: u32,
    /// Emitting contract: the comptroller for governance events, the pool
    /// token for everything else.
    pub address: Address,
    #[serde(flatten)]
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum EventKind {
    NewPriceOracle {
        new_price_oracle: Address,
    },
    MarketListed {
        pool_token: Address,
    },
    NewCollateralFactor {
        pool_token: Address,
        new_collateral_factor_mantissa: Amount,
    },
    NewLiquidationIncentive {
        new_liquidation_incentive_mantissa: Amount,
    },
    NewReserveFactor {
        new_reserve_factor_mantissa: Amount,
    },
    Mint {
        minter: Address,
        mint_amount: Amount,
        mint_tokens: Amount,
    },
    Redeem {
        redeemer: Address,
        redeem_amount: Amount,
        redeem_tokens: Amount,
    },
    Borrow {
        borrower: Address,
        borrow_amount: Amount,
        account_borrows: Amount,
        total_borrows: Amount,
    },
    RepayBorrow {
        payer: Address,
        borrower: Address,
        repay_amount: Amount,
        account_borrows: Amount,
        total_borrows: Amount,
    },
    LiquidateBorrow {
        liquidator: Address,
        borrower: Address,
        repay_amount: Amount,
        pool_token_collateral: Address,
        seize_tokens: Amount,
    },
    AccrueInterest {
        #[serde(default)]
        cash_prior: Amount,
        #[serde(default)]
        interest_accumulated: Amount,
        #[serde(default)]
        borrow_index: Amount,
        #[serde(default)]
        total_borrows: Amount,
    },
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::NewPriceOracle { .. } => "NewPriceOracle",
            EventKind::MarketListed { .. } => "MarketListed",
            EventKind::NewCollateralFactor { .. } => "NewCollateralFactor",
            EventKind::NewLiquidationIncentive { .. } => "NewLiquidationIncentive",
            EventKind::NewReserveFactor { .. } => "NewReserveFactor",
            EventKind::Mint { .. } => "Mint",
            EventKind::Redeem { .. } => "Redeem",
            EventKind::Borrow { .. } => "Borrow",
            EventKind::RepayBorrow { .. } => "RepayBorrow",
            EventKind::LiquidateBorrow { .. } => "LiquidateBorrow",
            EventKind::AccrueInterest { .. } => "AccrueInterest",
        }
    }
}

impl LendingEvent {
    /// Key of the immutable record this event produces: `"{tx_hash}-{log_index}"`.
    pub fn record_id(&self) -> String {
        format!("{}-{}", self.tx_hash.to_lowercase(), self.log_index)
    }

    pub fn ordering_key(&self) -> EventOrderingKey {
        EventOrderingKey::from_event(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::json!({
            "blockHeight": 12_000_000u64,
            "blockTimestamp": 1_615_000_000i64,
            "txHash": "0xABC",
            "logIndex": 7,
            "address": "0x39aa39c021dfbae8fac545936693ac917d5e7563",
            "kind": "mint",
            "minter": "0x1111111111111111111111111111111111111111",
            "mintAmount": "2500000",
            "mintTokens": 12345
        });

        let event: LendingEvent = serde_json::from_value(json).unwrap();
        assert_eq!(event.block_height, 12_000_000);
        assert_eq!(event.record_id(), "0xabc-7");
        match &event.kind {
            EventKind::Mint {
                minter,
                mint_amount,
                mint_tokens,
            } => {
                assert_eq!(minter.as_str(), "0x1111111111111111111111111111111111111111");
                assert_eq!(mint_amount, &Amount::from(2_500_000u64));
                assert_eq!(mint_tokens, &Amount::from(12_345u64));
            }
            other => panic!("unexpected kind {:?}", other),
        }
        assert_eq!(event.kind.name(), "Mint");
    }

    #[test]
    fn test_accrue_interest_fields_are_optional() {
        let json = serde_json::json!({
            "blockHeight": 1u64,
            "blockTimestamp": 1i64,
            "txHash": "0x01",
            "logIndex": 0,
            "address": "0x39aa39c021dfbae8fac545936693ac917d5e7563",
            "kind": "accrueInterest"
        });
        let event: LendingEvent = serde_json::from_value(json).unwrap();
        assert_eq!(event.kind.name(), "AccrueInterest");
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let json = serde_json::json!({
            "blockHeight": 1u64,
            "blockTimestamp": 1i64,
            "txHash": "0x01",
            "logIndex": 0,
            "address": "0x39aa39c021dfbae8fac545936693ac917d5e7563",
            "kind": "transfer"
        });
        assert!(serde_json::from_value::<LendingEvent>(json).is_err());
    }
}
