//! Daily snapshot and processing cursor persistence.

use super::{amount_col, decimal_col, height_col, height_param};
use crate::domain::{
    DayBucket, EventOrderingKey, FinancialsDailySnapshot, MarketDailySnapshot, Timestamp,
    UsageDailySnapshot,
};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;

fn day_range(from_day: Option<DayBucket>, to_day: Option<DayBucket>) -> (i64, i64) {
    (
        from_day.map(|d| d.as_i64()).unwrap_or(i64::MIN),
        to_day.map(|d| d.as_i64()).unwrap_or(i64::MAX),
    )
}

// =============================================================================
// Market snapshots
// =============================================================================

pub(super) async fn save_market_snapshot(
    conn: &mut SqliteConnection,
    snapshot: &MarketDailySnapshot,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT OR REPLACE INTO market_daily_snapshots (
            id, protocol_id, market_id, day,
            total_value_locked_usd, total_deposit_usd, total_borrow_usd,
            input_token_balance, input_token_price_usd,
            output_token_supply, output_token_price_usd,
            deposit_rate, variable_borrow_rate, block_height, timestamp
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&snapshot.id)
    .bind(&snapshot.protocol_id)
    .bind(&snapshot.market_id)
    .bind(snapshot.day.as_i64())
    .bind(snapshot.total_value_locked_usd.to_canonical_string())
    .bind(snapshot.total_deposit_usd.to_canonical_string())
    .bind(snapshot.total_borrow_usd.to_canonical_string())
    .bind(snapshot.input_token_balance.to_canonical_string())
    .bind(snapshot.input_token_price_usd.to_canonical_string())
    .bind(snapshot.output_token_supply.to_canonical_string())
    .bind(snapshot.output_token_price_usd.to_canonical_string())
    .bind(snapshot.deposit_rate.to_canonical_string())
    .bind(snapshot.variable_borrow_rate.to_canonical_string())
    .bind(height_param(snapshot.block_height))
    .bind(snapshot.timestamp.as_i64())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub(super) async fn query_market_snapshots(
    conn: &mut SqliteConnection,
    market_id: &str,
    from_day: Option<DayBucket>,
    to_day: Option<DayBucket>,
) -> Result<Vec<MarketDailySnapshot>, sqlx::Error> {
    let (from, to) = day_range(from_day, to_day);
    let rows = sqlx::query(
        r#"
        SELECT * FROM market_daily_snapshots
        WHERE market_id = ? AND day >= ? AND day <= ?
        ORDER BY day ASC
        "#,
    )
    .bind(market_id)
    .bind(from)
    .bind(to)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .iter()
        .map(|row| MarketDailySnapshot {
            id: row.get("id"),
            protocol_id: row.get("protocol_id"),
            market_id: row.get("market_id"),
            day: DayBucket::new(row.get("day")),
            total_value_locked_usd: decimal_col(row, "total_value_locked_usd"),
            total_deposit_usd: decimal_col(row, "total_deposit_usd"),
            total_borrow_usd: decimal_col(row, "total_borrow_usd"),
            input_token_balance: amount_col(row, "input_token_balance"),
            input_token_price_usd: decimal_col(row, "input_token_price_usd"),
            output_token_supply: amount_col(row, "output_token_supply"),
            output_token_price_usd: decimal_col(row, "output_token_price_usd"),
            deposit_rate: decimal_col(row, "deposit_rate"),
            variable_borrow_rate: decimal_col(row, "variable_borrow_rate"),
            block_height: height_col(row, "block_height"),
            timestamp: Timestamp::new(row.get("timestamp")),
        })
        .collect())
}

// =============================================================================
// Financials snapshots
// =============================================================================

fn financials_from_row(row: &SqliteRow) -> FinancialsDailySnapshot {
    FinancialsDailySnapshot {
        id: row.get("id"),
        protocol_id: row.get("protocol_id"),
        day: DayBucket::new(row.get("day")),
        total_value_locked_usd: decimal_col(row, "total_value_locked_usd"),
        total_deposit_usd: decimal_col(row, "total_deposit_usd"),
        total_borrow_usd: decimal_col(row, "total_borrow_usd"),
        total_revenue_usd: decimal_col(row, "total_revenue_usd"),
        protocol_side_revenue_usd: decimal_col(row, "protocol_side_revenue_usd"),
        supply_side_revenue_usd: decimal_col(row, "supply_side_revenue_usd"),
        block_height: height_col(row, "block_height"),
        timestamp: Timestamp::new(row.get("timestamp")),
    }
}

pub(super) async fn load_financials(
    conn: &mut SqliteConnection,
    day: DayBucket,
) -> Result<Option<FinancialsDailySnapshot>, sqlx::Error> {
    let row = sqlx::query("SELECT * FROM financials_daily_snapshots WHERE day = ?")
        .bind(day.as_i64())
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.as_ref().map(financials_from_row))
}

pub(super) async fn latest_financials_before(
    conn: &mut SqliteConnection,
    day: DayBucket,
) -> Result<Option<FinancialsDailySnapshot>, sqlx::Error> {
    let row = sqlx::query(
        "SELECT * FROM financials_daily_snapshots WHERE day < ? ORDER BY day DESC LIMIT 1",
    )
    .bind(day.as_i64())
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.as_ref().map(financials_from_row))
}

pub(super) async fn query_financials(
    conn: &mut SqliteConnection,
    from_day: Option<DayBucket>,
    to_day: Option<DayBucket>,
) -> Result<Vec<FinancialsDailySnapshot>, sqlx::Error> {
    let (from, to) = day_range(from_day, to_day);
    let rows = sqlx::query(
        "SELECT * FROM financials_daily_snapshots WHERE day >= ? AND day <= ? ORDER BY day ASC",
    )
    .bind(from)
    .bind(to)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.iter().map(financials_from_row).collect())
}

pub(super) async fn save_financials(
    conn: &mut SqliteConnection,
    snapshot: &FinancialsDailySnapshot,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT OR REPLACE INTO financials_daily_snapshots (
            id, protocol_id, day,
            total_value_locked_usd, total_deposit_usd, total_borrow_usd,
            total_revenue_usd, protocol_side_revenue_usd, supply_side_revenue_usd,
            block_height, timestamp
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&snapshot.id)
    .bind(&snapshot.protocol_id)
    .bind(snapshot.day.as_i64())
    .bind(snapshot.total_value_locked_usd.to_canonical_string())
    .bind(snapshot.total_deposit_usd.to_canonical_string())
    .bind(snapshot.total_borrow_usd.to_canonical_string())
    .bind(snapshot.total_revenue_usd.to_canonical_string())
    .bind(snapshot.protocol_side_revenue_usd.to_canonical_string())
    .bind(snapshot.supply_side_revenue_usd.to_canonical_string())
    .bind(height_param(snapshot.block_height))
    .bind(snapshot.timestamp.as_i64())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

// =============================================================================
// Usage snapshots
// =============================================================================

fn usage_from_row(row: &SqliteRow) -> UsageDailySnapshot {
    UsageDailySnapshot {
        id: row.get("id"),
        protocol_id: row.get("protocol_id"),
        day: DayBucket::new(row.get("day")),
        active_users: row.get("active_users"),
        total_unique_users: row.get("total_unique_users"),
        daily_transaction_count: row.get("daily_transaction_count"),
        block_height: height_col(row, "block_height"),
        timestamp: Timestamp::new(row.get("timestamp")),
    }
}

pub(super) async fn load_usage(
    conn: &mut SqliteConnection,
    day: DayBucket,
) -> Result<Option<UsageDailySnapshot>, sqlx::Error> {
    let row = sqlx::query("SELECT * FROM usage_daily_snapshots WHERE day = ?")
        .bind(day.as_i64())
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.as_ref().map(usage_from_row))
}

pub(super) async fn query_usage(
    conn: &mut SqliteConnection,
    from_day: Option<DayBucket>,
    to_day: Option<DayBucket>,
) -> Result<Vec<UsageDailySnapshot>, sqlx::Error> {
    let (from, to) = day_range(from_day, to_day);
    let rows = sqlx::query(
        "SELECT * FROM usage_daily_snapshots WHERE day >= ? AND day <= ? ORDER BY day ASC",
    )
    .bind(from)
    .bind(to)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.iter().map(usage_from_row).collect())
}

pub(super) async fn save_usage(
    conn: &mut SqliteConnection,
    snapshot: &UsageDailySnapshot,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT OR REPLACE INTO usage_daily_snapshots (
            id, protocol_id, day, active_users, total_unique_users,
            daily_transaction_count, block_height, timestamp
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&snapshot.id)
    .bind(&snapshot.protocol_id)
    .bind(snapshot.day.as_i64())
    .bind(snapshot.active_users)
    .bind(snapshot.total_unique_users)
    .bind(snapshot.daily_transaction_count)
    .bind(height_param(snapshot.block_height))
    .bind(snapshot.timestamp.as_i64())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

// =============================================================================
// Processing cursor
// =============================================================================

pub(super) async fn load_cursor(
    conn: &mut SqliteConnection,
) -> Result<Option<EventOrderingKey>, sqlx::Error> {
    let row = sqlx::query("SELECT block_height, log_index FROM processing_cursor WHERE id = 1")
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.map(|row| {
        EventOrderingKey::new(
            height_col(&row, "block_height"),
            u32::try_from(row.get::<i64, _>("log_index")).unwrap_or(0),
        )
    }))
}

pub(super) async fn set_cursor(
    conn: &mut SqliteConnection,
    key: EventOrderingKey,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO processing_cursor (id, block_height, log_index)
        VALUES (1, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            block_height = excluded.block_height,
            log_index = excluded.log_index
        "#,
    )
    .bind(height_param(key.block_height))
    .bind(i64::from(key.log_index))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::setup_test_db;
    use crate::domain::{
        DayBucket, Decimal, EventOrderingKey, FinancialsDailySnapshot, Timestamp,
        UsageDailySnapshot,
    };

    #[tokio::test]
    async fn test_latest_financials_before() {
        let (repo, _temp) = setup_test_db().await;

        let mut tx = repo.begin().await.unwrap();
        for (day, height) in [(10, 100u64), (12, 120), (15, 150)] {
            let mut snap =
                FinancialsDailySnapshot::new("0xp", DayBucket::new(day), height, Timestamp::new(0));
            snap.total_revenue_usd = Decimal::from_i64(day);
            tx.save_financials(&snap).await.unwrap();
        }

        let prev = tx.latest_financials_before(DayBucket::new(15)).await.unwrap().unwrap();
        assert_eq!(prev.day, DayBucket::new(12));
        assert_eq!(prev.block_height, 120);

        assert!(tx.latest_financials_before(DayBucket::new(10)).await.unwrap().is_none());
        tx.commit().await.unwrap();

        let range = repo
            .query_financials(Some(DayBucket::new(11)), None)
            .await
            .unwrap();
        assert_eq!(range.len(), 2);
        assert_eq!(range[0].total_revenue_usd, Decimal::from_i64(12));
    }

    #[tokio::test]
    async fn test_usage_overwrite() {
        let (repo, _temp) = setup_test_db().await;
        let day = DayBucket::new(3);

        let mut tx = repo.begin().await.unwrap();
        let mut usage = UsageDailySnapshot::new("0xp", day);
        usage.daily_transaction_count = 1;
        tx.save_usage(&usage).await.unwrap();
        usage.daily_transaction_count = 2;
        tx.save_usage(&usage).await.unwrap();
        assert_eq!(tx.load_usage(day).await.unwrap().unwrap().daily_transaction_count, 2);
        tx.commit().await.unwrap();

        assert_eq!(repo.query_usage(None, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cursor_roundtrip() {
        let (repo, _temp) = setup_test_db().await;
        assert!(repo.get_cursor().await.unwrap().is_none());

        let mut tx = repo.begin().await.unwrap();
        tx.set_cursor(EventOrderingKey::new(100, 3)).await.unwrap();
        tx.set_cursor(EventOrderingKey::new(101, 0)).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(
            repo.get_cursor().await.unwrap(),
            Some(EventOrderingKey::new(101, 0))
        );
    }
}
