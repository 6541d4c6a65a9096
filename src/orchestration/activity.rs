//! User activity events: deposits, withdrawals, borrows, repayments and
//! liquidations. Each produces one immutable transaction record.

use super::governance::get_or_create_protocol;
use super::processor::HandlerOutcome;
use crate::db::StoreTx;
use crate::domain::fixed_point::{amount_to_decimal, POOL_TOKEN_DECIMALS};
use crate::domain::{
    Address, Amount, LendingEvent, LiquidationOutcome, Market, RecordKind, Token,
    TransactionRecord,
};
use crate::engine::{Engine, EngineError};
use tracing::{debug, warn};

/// Market emitting the event plus its input token.
async fn load_market_with_input(
    tx: &mut StoreTx,
    market_id: &str,
) -> Result<Option<(Market, Token)>, EngineError> {
    let Some(market) = tx.load_market(market_id).await? else {
        warn!(market = %market_id, "Market not found");
        return Ok(None);
    };
    let Some(input_id) = market.input_token.clone() else {
        warn!(market = %market_id, "Market has no input token");
        return Ok(None);
    };
    let Some(token) = tx.load_token(&input_id).await? else {
        warn!(market = %market_id, token = %input_id, "Failed to load input token");
        return Ok(None);
    };
    Ok(Some((market, token)))
}

struct Parties<'a> {
    from: &'a str,
    to: &'a str,
}

fn new_record(
    event: &LendingEvent,
    kind: RecordKind,
    protocol_id: &str,
    parties: Parties<'_>,
    market: &Market,
    asset_id: &str,
    amount: &Amount,
) -> TransactionRecord {
    TransactionRecord {
        id: event.record_id(),
        kind,
        hash: event.tx_hash.to_lowercase(),
        log_index: event.log_index,
        protocol_id: protocol_id.to_string(),
        from: parties.from.to_string(),
        to: parties.to.to_string(),
        block_height: event.block_height,
        timestamp: event.block_timestamp,
        market_id: market.id.clone(),
        asset_id: asset_id.to_string(),
        amount: amount.clone(),
        amount_usd: Default::default(),
        liquidation: None,
    }
}

/// Shared path for the four single-market record kinds.
///
/// The balance delta is applied only when the record is new, so a
/// re-delivered event never moves the balance twice.
async fn record_market_activity(
    engine: &Engine,
    tx: &mut StoreTx,
    event: &LendingEvent,
    kind: RecordKind,
    account: &Address,
    amount: &Amount,
) -> Result<HandlerOutcome, EngineError> {
    let market_id = event.address.as_str();
    let Some((mut market, token)) = load_market_with_input(tx, market_id).await? else {
        return Ok(HandlerOutcome::Skipped("market or input token missing"));
    };

    let protocol = get_or_create_protocol(engine, tx, event.block_height).await?;
    let parties = match kind {
        RecordKind::Deposit | RecordKind::Repay => Parties {
            from: account.as_str(),
            to: market_id,
        },
        _ => Parties {
            from: market_id,
            to: account.as_str(),
        },
    };

    let mut record = new_record(event, kind, &protocol.id, parties, &market, &token.id, amount);
    record.amount_usd = &amount_to_decimal(amount, token.decimals) * &market.input_token_price_usd;

    if !tx.insert_record(&record).await? {
        debug!(record = %record.id, "Record already stored, not re-applying");
        return Ok(HandlerOutcome::Skipped("duplicate record"));
    }

    match kind {
        RecordKind::Deposit => {
            market.input_token_balance = &market.input_token_balance + amount;
            tx.save_market(&market).await?;
        }
        RecordKind::Withdraw => {
            market.input_token_balance = &market.input_token_balance - amount;
            tx.save_market(&market).await?;
        }
        _ => {}
    }

    engine
        .snapshot_usage(tx, event.block_height, event.block_timestamp, account)
        .await?;

    Ok(HandlerOutcome::Applied)
}

pub(crate) async fn on_mint(
    engine: &Engine,
    tx: &mut StoreTx,
    event: &LendingEvent,
    minter: &Address,
    mint_amount: &Amount,
) -> Result<HandlerOutcome, EngineError> {
    record_market_activity(engine, tx, event, RecordKind::Deposit, minter, mint_amount).await
}

pub(crate) async fn on_redeem(
    engine: &Engine,
    tx: &mut StoreTx,
    event: &LendingEvent,
    redeemer: &Address,
    redeem_amount: &Amount,
) -> Result<HandlerOutcome, EngineError> {
    record_market_activity(engine, tx, event, RecordKind::Withdraw, redeemer, redeem_amount).await
}

pub(crate) async fn on_borrow(
    engine: &Engine,
    tx: &mut StoreTx,
    event: &LendingEvent,
    borrower: &Address,
    borrow_amount: &Amount,
) -> Result<HandlerOutcome, EngineError> {
    record_market_activity(engine, tx, event, RecordKind::Borrow, borrower, borrow_amount).await
}

pub(crate) async fn on_repay_borrow(
    engine: &Engine,
    tx: &mut StoreTx,
    event: &LendingEvent,
    payer: &Address,
    repay_amount: &Amount,
) -> Result<HandlerOutcome, EngineError> {
    record_market_activity(engine, tx, event, RecordKind::Repay, payer, repay_amount).await
}

/// Liquidation: the repaid market is the event's address, the seized
/// collateral is pool tokens of `collateral_pool`.
pub(crate) async fn on_liquidate_borrow(
    engine: &Engine,
    tx: &mut StoreTx,
    event: &LendingEvent,
    liquidator: &Address,
    repay_amount: &Amount,
    collateral_pool: &Address,
    seize_tokens: &Amount,
) -> Result<HandlerOutcome, EngineError> {
    let Some((repay_market, repay_token)) =
        load_market_with_input(tx, event.address.as_str()).await?
    else {
        return Ok(HandlerOutcome::Skipped("repay market or input token missing"));
    };

    let Some(collateral) = tx.load_market(collateral_pool.as_str()).await? else {
        warn!(market = %collateral_pool, "Collateral market not found");
        return Ok(HandlerOutcome::Skipped("collateral market missing"));
    };
    let Some(seized_asset) = collateral.output_token.clone() else {
        warn!(market = %collateral_pool, "Collateral market has no output token");
        return Ok(HandlerOutcome::Skipped("collateral output token missing"));
    };

    let protocol = get_or_create_protocol(engine, tx, event.block_height).await?;

    let gain_usd =
        &amount_to_decimal(seize_tokens, POOL_TOKEN_DECIMALS) * &collateral.output_token_price_usd;
    let loss_usd =
        &amount_to_decimal(repay_amount, repay_token.decimals) * &repay_market.input_token_price_usd;

    let parties = Parties {
        from: liquidator.as_str(),
        to: repay_market.id.as_str(),
    };
    let mut record = new_record(
        event,
        RecordKind::Liquidate,
        &protocol.id,
        parties,
        &repay_market,
        &seized_asset,
        seize_tokens,
    );
    record.amount_usd = gain_usd.clone();
    record.liquidation = Some(LiquidationOutcome::new(gain_usd, loss_usd));

    if !tx.insert_record(&record).await? {
        debug!(record = %record.id, "Record already stored, not re-applying");
        return Ok(HandlerOutcome::Skipped("duplicate record"));
    }

    engine
        .snapshot_usage(tx, event.block_height, event.block_timestamp, liquidator)
        .await?;

    Ok(HandlerOutcome::Applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{ChainReader, MockChainReader};
    use crate::db::repo::test_support::setup_test_db;
    use crate::db::Repository;
    use crate::domain::{Deployment, EventKind, Timestamp};
    use crate::engine::test_support::*;
    use crate::engine::PricingMode;
    use std::sync::Arc;

    const MINTER: &str = "0x1111111111111111111111111111111111111111";

    fn engine() -> Engine {
        let chain: Arc<dyn ChainReader> = Arc::new(MockChainReader::new());
        Engine::new(chain, Arc::new(Deployment::default()), PricingMode::PriceAware)
    }

    fn mint(amount: &str) -> LendingEvent {
        LendingEvent {
            block_height: 500,
            block_timestamp: Timestamp::new(1_600_000_000),
            tx_hash: "0xAA".to_string(),
            log_index: 2,
            address: addr(POOL),
            kind: EventKind::Mint {
                minter: addr(MINTER),
                mint_amount: amt(amount),
                mint_tokens: Amount::zero(),
            },
        }
    }

    async fn seed(repo: &Repository) {
        let deployment = Deployment::default();
        let mut tx = repo.begin().await.unwrap();
        let mut protocol = protocol_with_oracle(&deployment);
        let mut market = listed_market(POOL, UNDERLYING, deployment.protocol_id());
        market.input_token_price_usd = dec("2");
        protocol.list_market(POOL);
        tx.insert_token(&token(UNDERLYING, 18)).await.unwrap();
        tx.save_market(&market).await.unwrap();
        tx.save_protocol(&protocol).await.unwrap();
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_deposit_records_value_and_moves_balance_once() {
        let (repo, _temp) = setup_test_db().await;
        seed(&repo).await;
        let engine = engine();
        let event = mint("3000000000000000000");

        for expected in [HandlerOutcome::Applied, HandlerOutcome::Skipped("duplicate record")] {
            let mut tx = repo.begin().await.unwrap();
            let outcome = on_mint(&engine, &mut tx, &event, &addr(MINTER), &amt("3000000000000000000"))
                .await
                .unwrap();
            tx.commit().await.unwrap();
            assert_eq!(outcome, expected);
        }

        let record = repo.get_record("0xaa-2").await.unwrap().unwrap();
        assert_eq!(record.kind, RecordKind::Deposit);
        assert_eq!(record.from, MINTER);
        assert_eq!(record.to, POOL);
        assert_eq!(record.asset_id, UNDERLYING);
        assert_eq!(record.amount_usd, dec("6"));

        let market = repo.get_market(POOL).await.unwrap().unwrap();
        assert_eq!(market.input_token_balance, amt("3000000000000000000"));

        let usage = repo.query_usage(None, None).await.unwrap();
        assert_eq!(usage.len(), 1);
        assert_eq!(usage[0].daily_transaction_count, 1);
    }

    #[tokio::test]
    async fn test_activity_on_unknown_market_is_skipped() {
        let (repo, _temp) = setup_test_db().await;
        let mut tx = repo.begin().await.unwrap();
        let outcome = on_borrow(&engine(), &mut tx, &mint("1"), &addr(MINTER), &amt("1"))
            .await
            .unwrap();
        tx.commit().await.unwrap();
        assert!(matches!(outcome, HandlerOutcome::Skipped(_)));
        assert!(repo.get_record("0xaa-2").await.unwrap().is_none());
    }
}
