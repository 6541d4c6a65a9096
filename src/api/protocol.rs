use axum::extract::State;
use axum::Json;
use serde::Serialize;

use super::AppState;
use crate::domain::Protocol;
use crate::error::AppError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolDto {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub schema_version: String,
    pub subgraph_version: String,
    pub methodology_version: String,
    pub network: String,
    #[serde(rename = "type")]
    pub protocol_type: String,
    pub lending_type: String,
    pub risk_type: String,
    pub total_value_locked_usd: String,
    pub total_deposit_usd: String,
    pub total_borrow_usd: String,
    pub cumulative_total_revenue_usd: String,
    pub cumulative_protocol_side_revenue_usd: String,
    pub cumulative_supply_side_revenue_usd: String,
    pub total_unique_users: i64,
    pub market_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_oracle: Option<String>,
    pub liquidation_incentive: String,
}

impl From<Protocol> for ProtocolDto {
    fn from(p: Protocol) -> Self {
        ProtocolDto {
            id: p.id,
            name: p.name,
            slug: p.slug,
            schema_version: p.schema_version,
            subgraph_version: p.indexer_version,
            methodology_version: p.methodology_version,
            network: p.network,
            protocol_type: p.protocol_type,
            lending_type: p.lending_type,
            risk_type: p.risk_type,
            total_value_locked_usd: p.total_value_locked_usd.to_canonical_string(),
            total_deposit_usd: p.total_deposit_usd.to_canonical_string(),
            total_borrow_usd: p.total_borrow_usd.to_canonical_string(),
            cumulative_total_revenue_usd: p.cumulative_total_revenue_usd.to_canonical_string(),
            cumulative_protocol_side_revenue_usd: p
                .cumulative_protocol_side_revenue_usd
                .to_canonical_string(),
            cumulative_supply_side_revenue_usd: p
                .cumulative_supply_side_revenue_usd
                .to_canonical_string(),
            total_unique_users: p.total_unique_users,
            market_ids: p.market_ids,
            price_oracle: p.price_oracle.map(String::from),
            liquidation_incentive: p.liquidation_incentive.to_canonical_string(),
        }
    }
}

pub async fn get_protocol(State(state): State<AppState>) -> Result<Json<ProtocolDto>, AppError> {
    let protocol = state
        .repo
        .find_protocol()
        .await?
        .ok_or_else(|| AppError::NotFound("protocol has not been created yet".into()))?;
    Ok(Json(protocol.into()))
}
