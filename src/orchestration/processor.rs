//! Applies one event at a time inside a single storage transaction.

use super::{accrual, activity, governance};
use crate::db::{Repository, StoreTx};
use crate::domain::{EventKind, LendingEvent};
use crate::engine::{Engine, EngineError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// What a handler did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerOutcome {
    Applied,
    /// A referenced entity was missing or unreadable; nothing was written.
    Skipped(&'static str),
}

/// What the processor did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    Applied,
    Skipped(&'static str),
    /// At or below the processing cursor; already applied.
    Replayed,
    /// The protocol singleton was missing mid-cascade. Steps that ran before
    /// the failure are committed; the rest of the event is dropped.
    Aborted,
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("storage error: {0}")]
    Store(#[from] sqlx::Error),
}

#[derive(Debug, Clone)]
pub struct EventProcessor {
    repo: Arc<Repository>,
    engine: Engine,
}

impl EventProcessor {
    pub fn new(repo: Arc<Repository>, engine: Engine) -> Self {
        Self { repo, engine }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Apply `event` atomically.
    ///
    /// On a storage error the whole event is rolled back, including the
    /// cursor, so it can be delivered again.
    pub async fn process(&self, event: &LendingEvent) -> Result<ProcessOutcome, ProcessError> {
        let key = event.ordering_key();
        let mut tx = self.repo.begin().await?;

        if let Some(cursor) = tx.load_cursor().await? {
            if key <= cursor {
                debug!(
                    kind = event.kind.name(),
                    height = event.block_height,
                    log_index = event.log_index,
                    "Event at or below cursor, skipping"
                );
                return Ok(ProcessOutcome::Replayed);
            }
        }

        let outcome = match self.dispatch(&mut tx, event).await {
            Ok(HandlerOutcome::Applied) => ProcessOutcome::Applied,
            Ok(HandlerOutcome::Skipped(reason)) => ProcessOutcome::Skipped(reason),
            Err(EngineError::ProtocolMissing(_)) => ProcessOutcome::Aborted,
            Err(EngineError::Store(e)) => return Err(e.into()),
        };

        tx.set_cursor(key).await?;
        tx.commit().await?;

        match outcome {
            ProcessOutcome::Skipped(reason) => warn!(
                kind = event.kind.name(),
                height = event.block_height,
                tx_hash = %event.tx_hash,
                reason,
                "Event skipped"
            ),
            _ => debug!(
                kind = event.kind.name(),
                height = event.block_height,
                log_index = event.log_index,
                ?outcome,
                "Event processed"
            ),
        }

        Ok(outcome)
    }

    /// Apply a batch in delivery order, stopping at the first storage error.
    pub async fn process_all(&self, events: &[LendingEvent]) -> Result<usize, ProcessError> {
        let mut applied = 0usize;
        for event in events {
            if self.process(event).await? != ProcessOutcome::Replayed {
                applied += 1;
            }
        }
        info!(total = events.len(), applied, "Processed event batch");
        Ok(applied)
    }

    async fn dispatch(
        &self,
        tx: &mut StoreTx,
        event: &LendingEvent,
    ) -> Result<HandlerOutcome, EngineError> {
        let engine = &self.engine;
        match &event.kind {
            EventKind::NewPriceOracle { new_price_oracle } => {
                governance::on_new_price_oracle(engine, tx, event, new_price_oracle).await
            }
            EventKind::MarketListed { pool_token } => {
                governance::on_market_listed(engine, tx, event, pool_token).await
            }
            EventKind::NewCollateralFactor {
                pool_token,
                new_collateral_factor_mantissa,
            } => {
                governance::on_new_collateral_factor(tx, pool_token, new_collateral_factor_mantissa)
                    .await
            }
            EventKind::NewLiquidationIncentive {
                new_liquidation_incentive_mantissa,
            } => {
                governance::on_new_liquidation_incentive(
                    engine,
                    tx,
                    event,
                    new_liquidation_incentive_mantissa,
                )
                .await
            }
            EventKind::NewReserveFactor {
                new_reserve_factor_mantissa,
            } => governance::on_new_reserve_factor(tx, event, new_reserve_factor_mantissa).await,
            EventKind::Mint {
                minter,
                mint_amount,
                ..
            } => activity::on_mint(engine, tx, event, minter, mint_amount).await,
            EventKind::Redeem {
                redeemer,
                redeem_amount,
                ..
            } => activity::on_redeem(engine, tx, event, redeemer, redeem_amount).await,
            EventKind::Borrow {
                borrower,
                borrow_amount,
                ..
            } => activity::on_borrow(engine, tx, event, borrower, borrow_amount).await,
            EventKind::RepayBorrow {
                payer,
                repay_amount,
                ..
            } => activity::on_repay_borrow(engine, tx, event, payer, repay_amount).await,
            EventKind::LiquidateBorrow {
                liquidator,
                repay_amount,
                pool_token_collateral,
                seize_tokens,
                ..
            } => {
                activity::on_liquidate_borrow(
                    engine,
                    tx,
                    event,
                    liquidator,
                    repay_amount,
                    pool_token_collateral,
                    seize_tokens,
                )
                .await
            }
            EventKind::AccrueInterest { .. } => accrual::on_accrue_interest(engine, tx, event).await,
        }
    }
}
