//! Day-bucketed snapshots of market, financials and usage state.

use super::{Engine, EngineError, SkipReason, StepOutcome};
use crate::db::StoreTx;
use crate::domain::{
    Address, Decimal, FinancialsDailySnapshot, MarketDailySnapshot, Timestamp, UsageDailySnapshot,
};
use tracing::{debug, warn};

impl Engine {
    /// Overwrite today's snapshot of a market with its current aggregates.
    pub async fn snapshot_market(
        &self,
        tx: &mut StoreTx,
        market_id: &str,
        height: u64,
        timestamp: Timestamp,
    ) -> Result<StepOutcome, EngineError> {
        let Some(market) = tx.load_market(market_id).await? else {
            warn!(market = %market_id, "Market not found, skipping market snapshot");
            return Ok(StepOutcome::Skipped(SkipReason::MarketMissing));
        };

        let day = timestamp.day_bucket();
        let snapshot = MarketDailySnapshot {
            id: MarketDailySnapshot::id_for(&market.id, day),
            protocol_id: market.protocol_id.clone(),
            market_id: market.id.clone(),
            day,
            total_value_locked_usd: market.total_value_locked_usd,
            total_deposit_usd: market.total_deposit_usd,
            total_borrow_usd: market.total_borrow_usd,
            input_token_balance: market.input_token_balance,
            input_token_price_usd: market.input_token_price_usd,
            output_token_supply: market.output_token_supply,
            output_token_price_usd: market.output_token_price_usd,
            deposit_rate: market.deposit_rate,
            variable_borrow_rate: market.variable_borrow_rate,
            block_height: height,
            timestamp,
        };
        tx.save_market_snapshot(&snapshot).await?;

        Ok(StepOutcome::Applied)
    }

    /// Refresh today's financials and integrate per-block revenue since the
    /// snapshot's last recorded height.
    ///
    /// A day's first snapshot starts from the previous day's recorded height,
    /// so blocks spanning midnight are counted once. With no earlier
    /// snapshot the baseline is `height` and nothing accrues.
    pub async fn snapshot_financials(
        &self,
        tx: &mut StoreTx,
        height: u64,
        timestamp: Timestamp,
    ) -> Result<StepOutcome, EngineError> {
        let mut protocol = self.require_protocol(tx).await?;
        let day = timestamp.day_bucket();

        let mut snapshot = match tx.load_financials(day).await? {
            Some(existing) => existing,
            None => {
                let baseline = tx
                    .latest_financials_before(day)
                    .await?
                    .map(|prev| prev.block_height)
                    .unwrap_or(height);
                FinancialsDailySnapshot::new(&protocol.id, day, baseline, timestamp)
            }
        };

        snapshot.total_value_locked_usd = protocol.total_value_locked_usd.clone();
        snapshot.total_deposit_usd = protocol.total_deposit_usd.clone();
        snapshot.total_borrow_usd = protocol.total_borrow_usd.clone();

        if height <= snapshot.block_height {
            debug!(
                height,
                recorded = snapshot.block_height,
                "Financials already integrated up to this height"
            );
            tx.save_financials(&snapshot).await?;
            return Ok(StepOutcome::Skipped(SkipReason::NoNewBlocks));
        }

        let blocks = Decimal::from_i64(i64::try_from(height - snapshot.block_height).unwrap_or(i64::MAX));
        let mut total = Decimal::zero();
        let mut protocol_side = Decimal::zero();
        let mut supply_side = Decimal::zero();

        for market_id in &protocol.market_ids {
            let Some(market) = tx.load_market(market_id).await? else {
                warn!(market = %market_id, "Listed market not found, excluding from revenue");
                continue;
            };
            total = total + &market.total_revenue_usd_per_block * &blocks;
            protocol_side = protocol_side + &market.protocol_side_revenue_usd_per_block * &blocks;
            supply_side = supply_side + &market.supply_side_revenue_usd_per_block * &blocks;
        }

        snapshot.total_revenue_usd = &snapshot.total_revenue_usd + &total;
        snapshot.protocol_side_revenue_usd = &snapshot.protocol_side_revenue_usd + &protocol_side;
        snapshot.supply_side_revenue_usd = &snapshot.supply_side_revenue_usd + &supply_side;
        snapshot.block_height = height;
        snapshot.timestamp = timestamp;

        protocol.cumulative_total_revenue_usd = &protocol.cumulative_total_revenue_usd + &total;
        protocol.cumulative_protocol_side_revenue_usd =
            &protocol.cumulative_protocol_side_revenue_usd + &protocol_side;
        protocol.cumulative_supply_side_revenue_usd =
            &protocol.cumulative_supply_side_revenue_usd + &supply_side;

        tx.save_financials(&snapshot).await?;
        tx.save_protocol(&protocol).await?;

        Ok(StepOutcome::Applied)
    }

    /// Count one transaction by `account` in today's usage snapshot.
    pub async fn snapshot_usage(
        &self,
        tx: &mut StoreTx,
        height: u64,
        timestamp: Timestamp,
        account: &Address,
    ) -> Result<(), EngineError> {
        let mut protocol = self.require_protocol(tx).await?;
        let day = timestamp.day_bucket();

        let mut usage = match tx.load_usage(day).await? {
            Some(existing) => existing,
            None => UsageDailySnapshot::new(&protocol.id, day),
        };

        if tx.insert_account(account.as_str()).await? {
            protocol.total_unique_users += 1;
            tx.save_protocol(&protocol).await?;
        }

        if tx.insert_daily_active(day, account.as_str()).await? {
            usage.active_users += 1;
        }

        usage.daily_transaction_count += 1;
        usage.total_unique_users = protocol.total_unique_users;
        usage.block_height = height;
        usage.timestamp = timestamp;
        tx.save_usage(&usage).await?;

        Ok(())
    }
}
