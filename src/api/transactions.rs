use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::domain::{Address, RecordKind, TransactionRecord};
use crate::error::AppError;

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 1000;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionsQuery {
    pub market: Option<String>,
    pub kind: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionsResponse {
    pub transactions: Vec<TransactionDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDto {
    pub id: String,
    pub kind: String,
    pub hash: String,
    pub log_index: u32,
    pub from: String,
    pub to: String,
    pub block_number: u64,
    pub timestamp: i64,
    pub market: String,
    pub asset: String,
    pub amount: String,
    pub amount_usd: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gain_usd: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loss_usd: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profit_usd: Option<String>,
}

impl From<TransactionRecord> for TransactionDto {
    fn from(r: TransactionRecord) -> Self {
        let liquidation = r.liquidation.as_ref();
        TransactionDto {
            gain_usd: liquidation.map(|l| l.gain_usd.to_canonical_string()),
            loss_usd: liquidation.map(|l| l.loss_usd.to_canonical_string()),
            profit_usd: liquidation.map(|l| l.profit_usd.to_canonical_string()),
            id: r.id,
            kind: r.kind.to_string(),
            hash: r.hash,
            log_index: r.log_index,
            from: r.from,
            to: r.to,
            block_number: r.block_height,
            timestamp: r.timestamp.as_i64(),
            market: r.market_id,
            asset: r.asset_id,
            amount: r.amount.to_canonical_string(),
            amount_usd: r.amount_usd.to_canonical_string(),
        }
    }
}

/// Records in event order, filtered by market and kind.
pub async fn get_transactions(
    Query(params): Query<TransactionsQuery>,
    State(state): State<AppState>,
) -> Result<Json<TransactionsResponse>, AppError> {
    let market = match params.market.as_deref() {
        Some("") | None => None,
        Some(m) => Some(
            m.parse::<Address>()
                .map_err(|_| AppError::BadRequest("Invalid market address".into()))?,
        ),
    };
    let kind = match params.kind.as_deref() {
        Some("") | None => None,
        Some(k) => Some(
            k.parse::<RecordKind>()
                .map_err(|e| AppError::BadRequest(e.to_string()))?,
        ),
    };
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(AppError::BadRequest(format!(
            "limit must be between 1 and {}",
            MAX_LIMIT
        )));
    }

    let records = state
        .repo
        .query_records(market.as_ref().map(Address::as_str), kind, limit)
        .await?;

    Ok(Json(TransactionsResponse {
        transactions: records.into_iter().map(Into::into).collect(),
    }))
}
