//! Day-bucketed historical records.

use crate::domain::{Amount, DayBucket, Decimal, Timestamp};
use serde::{Deserialize, Serialize};

/// Point-in-time copy of a market's aggregates, keyed `"{market}-{day}"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketDailySnapshot {
    pub id: String,
    pub protocol_id: String,
    pub market_id: String,
    pub day: DayBucket,
    pub total_value_locked_usd: Decimal,
    pub total_deposit_usd: Decimal,
    pub total_borrow_usd: Decimal,
    pub input_token_balance: Amount,
    pub input_token_price_usd: Decimal,
    pub output_token_supply: Amount,
    pub output_token_price_usd: Decimal,
    pub deposit_rate: Decimal,
    pub variable_borrow_rate: Decimal,
    pub block_height: u64,
    pub timestamp: Timestamp,
}

impl MarketDailySnapshot {
    pub fn id_for(market_id: &str, day: DayBucket) -> String {
        format!("{}-{}", market_id, day)
    }
}

/// Protocol-wide financials for one day, keyed `"{day}"`.
///
/// Totals are overwritten on every update; revenue lines accumulate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialsDailySnapshot {
    pub id: String,
    pub protocol_id: String,
    pub day: DayBucket,
    pub total_value_locked_usd: Decimal,
    pub total_deposit_usd: Decimal,
    pub total_borrow_usd: Decimal,
    pub total_revenue_usd: Decimal,
    pub protocol_side_revenue_usd: Decimal,
    pub supply_side_revenue_usd: Decimal,
    /// Height up to which revenue has been integrated.
    pub block_height: u64,
    pub timestamp: Timestamp,
}

impl FinancialsDailySnapshot {
    pub fn new(protocol_id: &str, day: DayBucket, baseline_height: u64, timestamp: Timestamp) -> Self {
        FinancialsDailySnapshot {
            id: day.to_string(),
            protocol_id: protocol_id.to_string(),
            day,
            total_value_locked_usd: Decimal::zero(),
            total_deposit_usd: Decimal::zero(),
            total_borrow_usd: Decimal::zero(),
            total_revenue_usd: Decimal::zero(),
            protocol_side_revenue_usd: Decimal::zero(),
            supply_side_revenue_usd: Decimal::zero(),
            block_height: baseline_height,
            timestamp,
        }
    }
}

/// Usage metrics for one day, keyed `"{day}"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageDailySnapshot {
    pub id: String,
    pub protocol_id: String,
    pub day: DayBucket,
    pub active_users: i64,
    pub total_unique_users: i64,
    pub daily_transaction_count: i64,
    pub block_height: u64,
    pub timestamp: Timestamp,
}

impl UsageDailySnapshot {
    pub fn new(protocol_id: &str, day: DayBucket) -> Self {
        UsageDailySnapshot {
            id: day.to_string(),
            protocol_id: protocol_id.to_string(),
            day,
            active_users: 0,
            total_unique_users: 0,
            daily_transaction_count: 0,
            block_height: 0,
            timestamp: day.start(),
        }
    }
}

/// Key of the per-(day, account) active marker.
pub fn daily_active_account_id(day: DayBucket, account: &str) -> String {
    format!("{}-{}", day, account)
}
