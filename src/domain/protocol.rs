//! The protocol singleton.

use crate::domain::deployment::Deployment;
use crate::domain::{Address, Decimal};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Protocol {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub schema_version: String,
    pub indexer_version: String,
    pub methodology_version: String,
    pub network: String,
    pub protocol_type: String,
    pub lending_type: String,
    pub risk_type: String,

    pub total_value_locked_usd: Decimal,
    pub total_deposit_usd: Decimal,
    pub total_borrow_usd: Decimal,
    pub cumulative_total_revenue_usd: Decimal,
    pub cumulative_protocol_side_revenue_usd: Decimal,
    pub cumulative_supply_side_revenue_usd: Decimal,
    pub total_unique_users: i64,

    /// Listed markets in listing order.
    pub market_ids: Vec<String>,
    /// Active versioned price source, set by `NewPriceOracle`.
    pub price_oracle: Option<Address>,
    pub liquidation_incentive: Decimal,
}

impl Protocol {
    pub fn new(deployment: &Deployment, liquidation_incentive: Decimal) -> Self {
        let meta = &deployment.metadata;
        Protocol {
            id: deployment.protocol_id().to_string(),
            name: meta.name.clone(),
            slug: meta.slug.clone(),
            schema_version: meta.schema_version.clone(),
            indexer_version: meta.indexer_version.clone(),
            methodology_version: meta.methodology_version.clone(),
            network: meta.network.clone(),
            protocol_type: meta.protocol_type.clone(),
            lending_type: meta.lending_type.clone(),
            risk_type: meta.risk_type.clone(),
            total_value_locked_usd: Decimal::zero(),
            total_deposit_usd: Decimal::zero(),
            total_borrow_usd: Decimal::zero(),
            cumulative_total_revenue_usd: Decimal::zero(),
            cumulative_protocol_side_revenue_usd: Decimal::zero(),
            cumulative_supply_side_revenue_usd: Decimal::zero(),
            total_unique_users: 0,
            market_ids: Vec::new(),
            price_oracle: None,
            liquidation_incentive,
        }
    }

    /// Append a market id unless it is already listed.
    pub fn list_market(&mut self, market_id: &str) -> bool {
        if self.market_ids.iter().any(|id| id == market_id) {
            return false;
        }
        self.market_ids.push(market_id.to_string());
        true
    }
}
