//! Per-market refresh on interest accrual.

use super::{Engine, EngineError, PricingMode, SkipReason, StepOutcome};
use crate::chain::CallResultExt;
use crate::db::StoreTx;
use crate::domain::fixed_point::{
    amount_to_decimal, exchange_rate_to_decimal, mantissa_to_ratio, rate_per_block_to_apy,
};
use crate::domain::{Address, Decimal};
use tracing::{debug, warn};

impl Engine {
    /// Refresh a market's prices, balances, rates and per-block revenue at
    /// `height`.
    ///
    /// Each contract read degrades independently: a failed read leaves the
    /// corresponding stored field untouched. Heights at or below the last
    /// accrued height are ignored.
    pub async fn update_market(
        &self,
        tx: &mut StoreTx,
        market_id: &str,
        height: u64,
    ) -> Result<StepOutcome, EngineError> {
        let Some(mut market) = tx.load_market(market_id).await? else {
            warn!(market = %market_id, "Market not found, skipping update");
            return Ok(StepOutcome::Skipped(SkipReason::MarketMissing));
        };

        if market.is_accrued_at(height) {
            debug!(
                market = %market_id,
                height,
                last_accrued = market.last_accrued_block,
                "Market already accrued at this height"
            );
            return Ok(StepOutcome::Skipped(SkipReason::AlreadyAccrued));
        }

        let Some(input_token_id) = market.input_token.clone() else {
            warn!(market = %market_id, "Market has no input token, skipping update");
            return Ok(StepOutcome::Skipped(SkipReason::InputTokenMissing));
        };
        let Some(input_token) = tx.load_token(&input_token_id).await? else {
            warn!(market = %market_id, token = %input_token_id, "Input token not found, skipping update");
            return Ok(StepOutcome::Skipped(SkipReason::InputTokenMissing));
        };

        let decimals = input_token.decimals;
        let pool = Address::new(market.id.as_str());
        let underlying = Address::new(input_token.id.as_str());
        let chain = self.chain();

        if self.pricing() == PricingMode::PriceAware {
            let oracle = tx
                .load_protocol(self.deployment().protocol_id())
                .await?
                .and_then(|p| p.price_oracle);
            market.input_token_price_usd = self
                .price_resolver()
                .resolve_price_usd(&pool, &underlying, decimals, height, oracle.as_ref())
                .await;
        }
        let price = market.input_token_price_usd.clone();

        if let Some(supply) = chain
            .total_supply(&pool, height)
            .await
            .ok_logged("totalSupply")
        {
            market.output_token_supply = supply;
        }

        let locked_usd = &amount_to_decimal(&market.input_token_balance, decimals) * &price;
        market.total_value_locked_usd = locked_usd.clone();
        market.total_deposit_usd = locked_usd;

        if let Some(rate) = chain
            .exchange_rate_stored(&pool, height)
            .await
            .ok_logged("exchangeRateStored")
        {
            market.output_token_price_usd = &exchange_rate_to_decimal(&rate, decimals) * &price;
        }

        let borrowed_usd = match chain
            .total_borrows(&pool, height)
            .await
            .ok_logged("totalBorrows")
        {
            Some(borrows) => {
                let usd = &amount_to_decimal(&borrows, decimals) * &price;
                market.total_borrow_usd = usd.clone();
                usd
            }
            None => Decimal::zero(),
        };

        let blocks_per_year = self.deployment().blocks_per_year;
        if let Some(rate) = chain
            .supply_rate_per_block(&pool, height)
            .await
            .ok_logged("supplyRatePerBlock")
        {
            market.deposit_rate = rate_per_block_to_apy(&rate, blocks_per_year);
        }

        let borrow_rate_per_block = match chain
            .borrow_rate_per_block(&pool, height)
            .await
            .ok_logged("borrowRatePerBlock")
        {
            Some(rate) => {
                market.variable_borrow_rate = rate_per_block_to_apy(&rate, blocks_per_year);
                mantissa_to_ratio(&rate)
            }
            None => Decimal::zero(),
        };

        let total_revenue = &borrowed_usd * &borrow_rate_per_block;
        let protocol_revenue = &total_revenue * &market.reserve_factor;
        let supply_revenue = &total_revenue - &protocol_revenue;
        market.total_revenue_usd_per_block = total_revenue;
        market.protocol_side_revenue_usd_per_block = protocol_revenue;
        market.supply_side_revenue_usd_per_block = supply_revenue;

        market.last_accrued_block = height;
        tx.save_market(&market).await?;

        Ok(StepOutcome::Applied)
    }
}
