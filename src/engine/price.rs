//! Block-height dependent price resolution.

use crate::chain::{CallResultExt, ChainReader};
use crate::domain::fixed_point::MANTISSA_DECIMALS;
use crate::domain::{Address, Decimal, Deployment};
use tracing::debug;

/// Which price source serves a given height, and in what denomination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceSource {
    /// Fixed legacy source, queried by underlying; ETH-denominated.
    Legacy,
    /// Active versioned source, queried by pool token; ETH-denominated.
    VersionedBefore,
    /// Active versioned source, queried by pool token; USD-denominated.
    VersionedAfter,
}

impl PriceSource {
    pub fn for_height(height: u64, deployment: &Deployment) -> PriceSource {
        if height <= deployment.legacy_oracle_until {
            PriceSource::Legacy
        } else if height <= deployment.eth_denominated_until {
            PriceSource::VersionedBefore
        } else {
            PriceSource::VersionedAfter
        }
    }

    pub fn is_eth_denominated(&self) -> bool {
        !matches!(self, PriceSource::VersionedAfter)
    }
}

/// Resolves the USD price of a market's underlying at a height.
///
/// Stateless: the result depends only on the height, the active oracle and
/// what the chain returns for that height. Any failed read yields zero.
#[derive(Debug, Clone, Copy)]
pub struct PriceResolver<'a> {
    chain: &'a dyn ChainReader,
    deployment: &'a Deployment,
}

impl<'a> PriceResolver<'a> {
    pub fn new(chain: &'a dyn ChainReader, deployment: &'a Deployment) -> Self {
        PriceResolver { chain, deployment }
    }

    pub async fn resolve_price_usd(
        &self,
        pool_token: &Address,
        underlying: &Address,
        underlying_decimals: u32,
        height: u64,
        oracle: Option<&Address>,
    ) -> Decimal {
        let source = PriceSource::for_height(height, self.deployment);
        if !source.is_eth_denominated() {
            return self
                .raw_price(source, pool_token, underlying, underlying_decimals, height, oracle)
                .await;
        }

        let d = self.deployment;
        let usd_in_eth = self
            .raw_price(
                source,
                &d.reference_pool,
                &d.reference_asset,
                d.reference_decimals,
                height,
                oracle,
            )
            .await;

        if *pool_token == d.eth_pool {
            return match Decimal::one().checked_div(&usd_in_eth) {
                Some(p) => p.truncate(underlying_decimals),
                None => {
                    debug!(height, "Reference price is zero; ETH price unavailable");
                    Decimal::zero()
                }
            };
        }

        let price_eth = self
            .raw_price(source, pool_token, underlying, underlying_decimals, height, oracle)
            .await
            .truncate(underlying_decimals);

        match price_eth.checked_div(&usd_in_eth) {
            Some(p) => p.truncate(underlying_decimals),
            None => {
                debug!(height, pool = %pool_token, "Reference price is zero; price unavailable");
                Decimal::zero()
            }
        }
    }

    /// Price in the source's own denomination, normalized to whole tokens.
    async fn raw_price(
        &self,
        source: PriceSource,
        pool_token: &Address,
        underlying: &Address,
        underlying_decimals: u32,
        height: u64,
        oracle: Option<&Address>,
    ) -> Decimal {
        match source {
            PriceSource::Legacy => {
                let raw = self
                    .chain
                    .legacy_price(&self.deployment.legacy_oracle, underlying, height)
                    .await
                    .ok_logged("getPrice");
                raw.map(|r| Decimal::from_mantissa(&r, MANTISSA_DECIMALS as i64))
                    .unwrap_or_default()
            }
            PriceSource::VersionedBefore | PriceSource::VersionedAfter => {
                let Some(oracle) = oracle else {
                    debug!(height, "No active price oracle; price is zero");
                    return Decimal::zero();
                };
                let exponent = 2 * MANTISSA_DECIMALS as i64 - underlying_decimals as i64;
                self.chain
                    .underlying_price(oracle, pool_token, height)
                    .await
                    .ok_logged("getUnderlyingPrice")
                    .map(|r| Decimal::from_mantissa(&r, exponent))
                    .unwrap_or_default()
            }
        }
    }
}
