//! Comptroller and pool configuration events.

use super::processor::HandlerOutcome;
use crate::chain::CallResultExt;
use crate::db::StoreTx;
use crate::domain::fixed_point::{mantissa_to_ratio, POOL_TOKEN_DECIMALS};
use crate::domain::{Address, Amount, LendingEvent, Market, Protocol, Token};
use crate::engine::{Engine, EngineError};
use tracing::{info, warn};

const UNKNOWN: &str = "unknown";

/// Load the protocol singleton, creating it on first use.
///
/// Creation reads the comptroller's liquidation incentive at `height`
/// (zero if the read fails).
pub(crate) async fn get_or_create_protocol(
    engine: &Engine,
    tx: &mut StoreTx,
    height: u64,
) -> Result<Protocol, EngineError> {
    let deployment = engine.deployment();
    if let Some(protocol) = tx.load_protocol(deployment.protocol_id()).await? {
        return Ok(protocol);
    }

    let incentive = engine
        .chain()
        .liquidation_incentive_mantissa(&deployment.comptroller, height)
        .await
        .or_default_logged("liquidationIncentiveMantissa", Amount::zero());
    let protocol = Protocol::new(deployment, mantissa_to_ratio(&incentive));
    tx.save_protocol(&protocol).await?;

    info!(protocol = %protocol.id, "Created protocol");
    Ok(protocol)
}

pub(crate) async fn on_new_price_oracle(
    engine: &Engine,
    tx: &mut StoreTx,
    event: &LendingEvent,
    oracle: &Address,
) -> Result<HandlerOutcome, EngineError> {
    let mut protocol = get_or_create_protocol(engine, tx, event.block_height).await?;
    protocol.price_oracle = Some(oracle.clone());
    tx.save_protocol(&protocol).await?;

    info!(oracle = %oracle, height = event.block_height, "Price oracle changed");
    Ok(HandlerOutcome::Applied)
}

pub(crate) async fn on_market_listed(
    engine: &Engine,
    tx: &mut StoreTx,
    event: &LendingEvent,
    pool_token: &Address,
) -> Result<HandlerOutcome, EngineError> {
    if tx.load_token(pool_token.as_str()).await?.is_some() {
        return Ok(HandlerOutcome::Skipped("market already listed"));
    }

    let deployment = engine.deployment();
    let chain = engine.chain();
    let height = event.block_height;
    let is_eth_pool = *pool_token == deployment.eth_pool;

    let underlying = if is_eth_pool {
        deployment.eth_asset.clone()
    } else {
        match chain.underlying(pool_token, height).await {
            Ok(addr) => addr,
            Err(e) => {
                warn!(pool = %pool_token, error = %e, "Could not read underlying of listed pool");
                return Ok(HandlerOutcome::Skipped("underlying unreadable"));
            }
        }
    };

    let pool = if is_eth_pool {
        Token {
            id: pool_token.to_string(),
            name: "Compound Ether".to_string(),
            symbol: "cETH".to_string(),
            decimals: POOL_TOKEN_DECIMALS,
        }
    } else {
        Token {
            id: pool_token.to_string(),
            name: chain
                .token_name(pool_token, height)
                .await
                .or_default_logged("name", UNKNOWN.to_string()),
            symbol: chain
                .token_symbol(pool_token, height)
                .await
                .or_default_logged("symbol", UNKNOWN.to_string()),
            decimals: POOL_TOKEN_DECIMALS,
        }
    };
    tx.insert_token(&pool).await?;

    let asset = if underlying == deployment.eth_asset {
        Token {
            id: underlying.to_string(),
            name: "Ether".to_string(),
            symbol: "ETH".to_string(),
            decimals: 18,
        }
    } else if underlying == deployment.sai_asset {
        // No name()/symbol() on this token.
        Token {
            id: underlying.to_string(),
            name: "Dai Stablecoin v1.0 (DAI)".to_string(),
            symbol: "DAI".to_string(),
            decimals: 18,
        }
    } else {
        Token {
            id: underlying.to_string(),
            name: chain
                .token_name(&underlying, height)
                .await
                .or_default_logged("name", UNKNOWN.to_string()),
            symbol: chain
                .token_symbol(&underlying, height)
                .await
                .or_default_logged("symbol", UNKNOWN.to_string()),
            decimals: chain
                .token_decimals(&underlying, height)
                .await
                .or_default_logged("decimals", 0),
        }
    };
    tx.insert_token(&asset).await?;

    let mut protocol = get_or_create_protocol(engine, tx, height).await?;
    let mut market = Market::listed(
        &pool,
        &asset,
        &protocol.id,
        protocol.liquidation_incentive.clone(),
        event.block_timestamp,
        height,
    );
    if let Some(raw) = chain
        .reserve_factor_mantissa(pool_token, height)
        .await
        .ok_logged("reserveFactorMantissa")
    {
        market.reserve_factor = mantissa_to_ratio(&raw);
    }
    tx.save_market(&market).await?;

    protocol.list_market(&market.id);
    tx.save_protocol(&protocol).await?;

    info!(market = %market.id, name = %market.name, underlying = %asset.symbol, "Market listed");
    Ok(HandlerOutcome::Applied)
}

pub(crate) async fn on_new_collateral_factor(
    tx: &mut StoreTx,
    pool_token: &Address,
    mantissa: &Amount,
) -> Result<HandlerOutcome, EngineError> {
    let Some(mut market) = tx.load_market(pool_token.as_str()).await? else {
        warn!(market = %pool_token, "Market not found for collateral factor change");
        return Ok(HandlerOutcome::Skipped("market not found"));
    };

    let factor = mantissa_to_ratio(mantissa);
    market.maximum_ltv = factor.clone();
    market.liquidation_threshold = factor;
    tx.save_market(&market).await?;

    Ok(HandlerOutcome::Applied)
}

pub(crate) async fn on_new_liquidation_incentive(
    engine: &Engine,
    tx: &mut StoreTx,
    event: &LendingEvent,
    mantissa: &Amount,
) -> Result<HandlerOutcome, EngineError> {
    let incentive = mantissa_to_ratio(mantissa);
    let mut protocol = get_or_create_protocol(engine, tx, event.block_height).await?;
    protocol.liquidation_incentive = incentive.clone();
    tx.save_protocol(&protocol).await?;

    for market_id in &protocol.market_ids {
        let Some(mut market) = tx.load_market(market_id).await? else {
            warn!(market = %market_id, "Listed market not found for liquidation incentive change");
            continue;
        };
        market.liquidation_penalty = incentive.clone();
        tx.save_market(&market).await?;
    }

    Ok(HandlerOutcome::Applied)
}

/// Emitted by the pool itself, so the market is the event's address.
pub(crate) async fn on_new_reserve_factor(
    tx: &mut StoreTx,
    event: &LendingEvent,
    mantissa: &Amount,
) -> Result<HandlerOutcome, EngineError> {
    let Some(mut market) = tx.load_market(event.address.as_str()).await? else {
        warn!(market = %event.address, "Market not found for reserve factor change");
        return Ok(HandlerOutcome::Skipped("market not found"));
    };

    market.reserve_factor = mantissa_to_ratio(mantissa);
    tx.save_market(&market).await?;

    Ok(HandlerOutcome::Applied)
}
