//! State aggregation engine: prices, market and protocol state, snapshots.
//!
//! Every operation works against one event's `StoreTx`. Missing entities
//! and failed contract reads degrade locally; only storage failures and a
//! missing protocol singleton surface as errors.

use crate::chain::ChainReader;
use crate::domain::{Deployment, Protocol};
use crate::db::StoreTx;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

pub mod market_state;
pub mod price;
pub mod protocol_state;
pub mod snapshot;

pub use price::{PriceResolver, PriceSource};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("storage error: {0}")]
    Store(#[from] sqlx::Error),
    /// The protocol singleton must exist before any market-level step runs.
    #[error("protocol {0} not found")]
    ProtocolMissing(String),
}

/// Result of one engine step that may legitimately do nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Applied,
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    MarketMissing,
    InputTokenMissing,
    /// The market was already accrued at or after this height.
    AlreadyAccrued,
    /// A financials snapshot already covers this height.
    NoNewBlocks,
}

/// Whether USD prices are resolved from the price sources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PricingMode {
    #[default]
    PriceAware,
    /// Never query a price source; USD fields derive from the stored price.
    BalanceOnly,
}

impl fmt::Display for PricingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PricingMode::PriceAware => f.write_str("price-aware"),
            PricingMode::BalanceOnly => f.write_str("balance-only"),
        }
    }
}

impl FromStr for PricingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "price-aware" => Ok(PricingMode::PriceAware),
            "balance-only" => Ok(PricingMode::BalanceOnly),
            other => Err(format!(
                "unknown pricing mode '{}', expected price-aware or balance-only",
                other
            )),
        }
    }
}

/// Shared handles for every engine step.
#[derive(Debug, Clone)]
pub struct Engine {
    chain: Arc<dyn ChainReader>,
    deployment: Arc<Deployment>,
    pricing: PricingMode,
}

impl Engine {
    pub fn new(chain: Arc<dyn ChainReader>, deployment: Arc<Deployment>, pricing: PricingMode) -> Self {
        Engine {
            chain,
            deployment,
            pricing,
        }
    }

    pub fn chain(&self) -> &dyn ChainReader {
        self.chain.as_ref()
    }

    pub fn deployment(&self) -> &Deployment {
        &self.deployment
    }

    pub fn pricing(&self) -> PricingMode {
        self.pricing
    }

    pub fn price_resolver(&self) -> PriceResolver<'_> {
        PriceResolver::new(self.chain.as_ref(), &self.deployment)
    }

    /// Load the protocol singleton or fail with `ProtocolMissing`.
    pub async fn require_protocol(&self, tx: &mut StoreTx) -> Result<Protocol, EngineError> {
        let id = self.deployment.protocol_id();
        match tx.load_protocol(id).await? {
            Some(protocol) => Ok(protocol),
            None => {
                error!(protocol = %id, "Protocol not found; aborting remaining steps");
                Err(EngineError::ProtocolMissing(id.to_string()))
            }
        }
    }
}
