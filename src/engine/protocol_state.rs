//! Protocol-wide totals.

use super::{Engine, EngineError};
use crate::db::StoreTx;
use crate::domain::Decimal;
use tracing::warn;

impl Engine {
    /// Re-sum TVL, deposits and borrows over every listed market.
    ///
    /// Markets that no longer load are skipped with a warning. A missing
    /// protocol aborts with `ProtocolMissing`.
    pub async fn update_protocol(&self, tx: &mut StoreTx) -> Result<(), EngineError> {
        let mut protocol = self.require_protocol(tx).await?;

        let mut tvl = Decimal::zero();
        let mut deposits = Decimal::zero();
        let mut borrows = Decimal::zero();

        for market_id in &protocol.market_ids {
            let Some(market) = tx.load_market(market_id).await? else {
                warn!(market = %market_id, "Listed market not found, excluding from totals");
                continue;
            };
            tvl = tvl + market.total_value_locked_usd;
            deposits = deposits + market.total_deposit_usd;
            borrows = borrows + market.total_borrow_usd;
        }

        protocol.total_value_locked_usd = tvl;
        protocol.total_deposit_usd = deposits;
        protocol.total_borrow_usd = borrows;
        tx.save_protocol(&protocol).await?;

        Ok(())
    }
}
