//! Daily market, financials and usage snapshots.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Serialize;

use super::{AppState, DayRangeQuery};
use crate::domain::{Address, FinancialsDailySnapshot, MarketDailySnapshot, UsageDailySnapshot};
use crate::error::AppError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshotDto {
    pub id: String,
    pub market_id: String,
    pub day: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub total_value_locked_usd: String,
    pub total_deposit_usd: String,
    pub total_borrow_usd: String,
    pub input_token_balance: String,
    pub input_token_price_usd: String,
    pub output_token_supply: String,
    pub output_token_price_usd: String,
    pub deposit_rate: String,
    pub variable_borrow_rate: String,
    pub block_number: u64,
    pub timestamp: i64,
}

impl From<MarketDailySnapshot> for MarketSnapshotDto {
    fn from(s: MarketDailySnapshot) -> Self {
        MarketSnapshotDto {
            id: s.id,
            market_id: s.market_id,
            day: s.day.as_i64(),
            date: s.day.date().map(|d| d.to_string()),
            total_value_locked_usd: s.total_value_locked_usd.to_canonical_string(),
            total_deposit_usd: s.total_deposit_usd.to_canonical_string(),
            total_borrow_usd: s.total_borrow_usd.to_canonical_string(),
            input_token_balance: s.input_token_balance.to_canonical_string(),
            input_token_price_usd: s.input_token_price_usd.to_canonical_string(),
            output_token_supply: s.output_token_supply.to_canonical_string(),
            output_token_price_usd: s.output_token_price_usd.to_canonical_string(),
            deposit_rate: s.deposit_rate.to_canonical_string(),
            variable_borrow_rate: s.variable_borrow_rate.to_canonical_string(),
            block_number: s.block_height,
            timestamp: s.timestamp.as_i64(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialsDto {
    pub id: String,
    pub day: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub total_value_locked_usd: String,
    pub total_deposit_usd: String,
    pub total_borrow_usd: String,
    pub total_revenue_usd: String,
    pub protocol_side_revenue_usd: String,
    pub supply_side_revenue_usd: String,
    pub block_number: u64,
    pub timestamp: i64,
}

impl From<FinancialsDailySnapshot> for FinancialsDto {
    fn from(s: FinancialsDailySnapshot) -> Self {
        FinancialsDto {
            id: s.id,
            day: s.day.as_i64(),
            date: s.day.date().map(|d| d.to_string()),
            total_value_locked_usd: s.total_value_locked_usd.to_canonical_string(),
            total_deposit_usd: s.total_deposit_usd.to_canonical_string(),
            total_borrow_usd: s.total_borrow_usd.to_canonical_string(),
            total_revenue_usd: s.total_revenue_usd.to_canonical_string(),
            protocol_side_revenue_usd: s.protocol_side_revenue_usd.to_canonical_string(),
            supply_side_revenue_usd: s.supply_side_revenue_usd.to_canonical_string(),
            block_number: s.block_height,
            timestamp: s.timestamp.as_i64(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageDto {
    pub id: String,
    pub day: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub active_users: i64,
    pub total_unique_users: i64,
    pub daily_transaction_count: i64,
    pub block_number: u64,
    pub timestamp: i64,
}

impl From<UsageDailySnapshot> for UsageDto {
    fn from(s: UsageDailySnapshot) -> Self {
        UsageDto {
            id: s.id,
            day: s.day.as_i64(),
            date: s.day.date().map(|d| d.to_string()),
            active_users: s.active_users,
            total_unique_users: s.total_unique_users,
            daily_transaction_count: s.daily_transaction_count,
            block_number: s.block_height,
            timestamp: s.timestamp.as_i64(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SnapshotsResponse<T> {
    pub snapshots: Vec<T>,
}

pub async fn get_market_snapshots(
    Path(id): Path<String>,
    Query(params): Query<DayRangeQuery>,
    State(state): State<AppState>,
) -> Result<Json<SnapshotsResponse<MarketSnapshotDto>>, AppError> {
    let id: Address = id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid market address".into()))?;
    let (from_day, to_day) = params.bounds()?;

    let snapshots = state
        .repo
        .query_market_snapshots(id.as_str(), from_day, to_day)
        .await?;
    Ok(Json(SnapshotsResponse {
        snapshots: snapshots.into_iter().map(Into::into).collect(),
    }))
}

pub async fn get_financials(
    Query(params): Query<DayRangeQuery>,
    State(state): State<AppState>,
) -> Result<Json<SnapshotsResponse<FinancialsDto>>, AppError> {
    let (from_day, to_day) = params.bounds()?;
    let snapshots = state.repo.query_financials(from_day, to_day).await?;
    Ok(Json(SnapshotsResponse {
        snapshots: snapshots.into_iter().map(Into::into).collect(),
    }))
}

pub async fn get_usage(
    Query(params): Query<DayRangeQuery>,
    State(state): State<AppState>,
) -> Result<Json<SnapshotsResponse<UsageDto>>, AppError> {
    let (from_day, to_day) = params.bounds()?;
    let snapshots = state.repo.query_usage(from_day, to_day).await?;
    Ok(Json(SnapshotsResponse {
        snapshots: snapshots.into_iter().map(Into::into).collect(),
    }))
}
