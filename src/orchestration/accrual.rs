//! Interest accrual: the only event that refreshes market state from chain.

use super::processor::HandlerOutcome;
use crate::db::StoreTx;
use crate::domain::LendingEvent;
use crate::engine::{Engine, EngineError, StepOutcome};
use tracing::debug;

/// Refresh the emitting market, re-sum the protocol, then snapshot both.
///
/// Every step runs even when an earlier one skipped; a missing protocol
/// stops the cascade at the step that needed it.
pub(crate) async fn on_accrue_interest(
    engine: &Engine,
    tx: &mut StoreTx,
    event: &LendingEvent,
) -> Result<HandlerOutcome, EngineError> {
    let market_id = event.address.as_str();
    let height = event.block_height;
    let ts = event.block_timestamp;

    let market = engine.update_market(tx, market_id, height).await?;
    engine.update_protocol(tx).await?;
    let snapshot = engine.snapshot_market(tx, market_id, height, ts).await?;
    let financials = engine.snapshot_financials(tx, height, ts).await?;

    debug!(
        market = %market_id,
        height,
        ?market,
        ?snapshot,
        ?financials,
        "Accrual cascade finished"
    );

    match market {
        StepOutcome::Applied => Ok(HandlerOutcome::Applied),
        StepOutcome::Skipped(_) if snapshot == StepOutcome::Applied => Ok(HandlerOutcome::Applied),
        StepOutcome::Skipped(_) => Ok(HandlerOutcome::Skipped("market not found")),
    }
}
