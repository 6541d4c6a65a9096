//! Immutable transaction records, one per originating event.

use crate::domain::{Amount, Decimal, Timestamp};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Deposit,
    Withdraw,
    Borrow,
    Repay,
    Liquidate,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Deposit => "deposit",
            RecordKind::Withdraw => "withdraw",
            RecordKind::Borrow => "borrow",
            RecordKind::Repay => "repay",
            RecordKind::Liquidate => "liquidate",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown record kind: {0}")]
pub struct UnknownRecordKind(pub String);

impl FromStr for RecordKind {
    type Err = UnknownRecordKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(RecordKind::Deposit),
            "withdraw" => Ok(RecordKind::Withdraw),
            "borrow" => Ok(RecordKind::Borrow),
            "repay" => Ok(RecordKind::Repay),
            "liquidate" => Ok(RecordKind::Liquidate),
            other => Err(UnknownRecordKind(other.to_string())),
        }
    }
}

/// USD outcome of a liquidation from the liquidator's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidationOutcome {
    /// Value of the seized collateral pool tokens.
    pub gain_usd: Decimal,
    /// Value of the repaid borrow.
    pub loss_usd: Decimal,
    pub profit_usd: Decimal,
}

impl LiquidationOutcome {
    pub fn new(gain_usd: Decimal, loss_usd: Decimal) -> Self {
        let profit_usd = &gain_usd - &loss_usd;
        LiquidationOutcome {
            gain_usd,
            loss_usd,
            profit_usd,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    /// `"{hash}-{log_index}"`.
    pub id: String,
    pub kind: RecordKind,
    pub hash: String,
    pub log_index: u32,
    pub protocol_id: String,
    pub from: String,
    pub to: String,
    pub block_height: u64,
    pub timestamp: Timestamp,
    pub market_id: String,
    pub asset_id: String,
    pub amount: Amount,
    pub amount_usd: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liquidation: Option<LiquidationOutcome>,
}
