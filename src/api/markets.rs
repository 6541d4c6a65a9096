use axum::extract::{Path, State};
use axum::Json;
use futures::future::try_join_all;
use serde::Serialize;

use super::AppState;
use crate::domain::{Address, Market, Token};
use crate::error::AppError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenDto {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
}

impl From<Token> for TokenDto {
    fn from(t: Token) -> Self {
        TokenDto {
            id: t.id,
            name: t.name,
            symbol: t.symbol,
            decimals: t.decimals,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketDto {
    pub id: String,
    pub protocol_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_token: Option<TokenDto>,
    pub input_token_balance: String,
    pub input_token_price_usd: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_token: Option<TokenDto>,
    pub output_token_supply: String,
    pub output_token_price_usd: String,
    pub total_value_locked_usd: String,
    pub total_deposit_usd: String,
    pub total_borrow_usd: String,
    pub maximum_ltv: String,
    pub liquidation_threshold: String,
    pub liquidation_penalty: String,
    pub reserve_factor: String,
    pub deposit_rate: String,
    pub variable_borrow_rate: String,
    pub is_active: bool,
    pub can_use_as_collateral: bool,
    pub can_borrow_from: bool,
    pub created_timestamp: i64,
    pub created_block_number: u64,
    pub last_accrued_block: u64,
}

impl MarketDto {
    fn new(m: Market, input_token: Option<Token>, output_token: Option<Token>) -> Self {
        MarketDto {
            id: m.id,
            protocol_id: m.protocol_id,
            name: m.name,
            input_token: input_token.map(TokenDto::from),
            input_token_balance: m.input_token_balance.to_canonical_string(),
            input_token_price_usd: m.input_token_price_usd.to_canonical_string(),
            output_token: output_token.map(TokenDto::from),
            output_token_supply: m.output_token_supply.to_canonical_string(),
            output_token_price_usd: m.output_token_price_usd.to_canonical_string(),
            total_value_locked_usd: m.total_value_locked_usd.to_canonical_string(),
            total_deposit_usd: m.total_deposit_usd.to_canonical_string(),
            total_borrow_usd: m.total_borrow_usd.to_canonical_string(),
            maximum_ltv: m.maximum_ltv.to_canonical_string(),
            liquidation_threshold: m.liquidation_threshold.to_canonical_string(),
            liquidation_penalty: m.liquidation_penalty.to_canonical_string(),
            reserve_factor: m.reserve_factor.to_canonical_string(),
            deposit_rate: m.deposit_rate.to_canonical_string(),
            variable_borrow_rate: m.variable_borrow_rate.to_canonical_string(),
            is_active: m.is_active,
            can_use_as_collateral: m.can_use_as_collateral,
            can_borrow_from: m.can_borrow_from,
            created_timestamp: m.created_timestamp.as_i64(),
            created_block_number: m.created_block,
            last_accrued_block: m.last_accrued_block,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketsResponse {
    pub markets: Vec<MarketDto>,
}

async fn with_tokens(state: &AppState, market: Market) -> Result<MarketDto, AppError> {
    let input = match market.input_token.as_deref() {
        Some(id) => state.repo.get_token(id).await?,
        None => None,
    };
    let output = match market.output_token.as_deref() {
        Some(id) => state.repo.get_token(id).await?,
        None => None,
    };
    Ok(MarketDto::new(market, input, output))
}

/// Markets in listing order.
pub async fn list_markets(State(state): State<AppState>) -> Result<Json<MarketsResponse>, AppError> {
    let markets = state.repo.list_markets().await?;
    let markets = try_join_all(markets.into_iter().map(|m| with_tokens(&state, m))).await?;
    Ok(Json(MarketsResponse { markets }))
}

pub async fn get_market(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<MarketDto>, AppError> {
    let id: Address = id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid market address".into()))?;
    let market = state
        .repo
        .get_market(id.as_str())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("market {}", id)))?;
    Ok(Json(with_tokens(&state, market).await?))
}
