//! Repository layer for database operations.
//!
//! `Repository` owns the pool and serves read-only queries. Event processing
//! writes through a `StoreTx`, one SQLite transaction per event, so the
//! whole cascade of an event commits or rolls back together.
//!
//! Row mapping lives in submodules by domain:
//! - `entities.rs` - protocol, tokens and markets
//! - `records.rs` - transaction records, accounts and daily active markers
//! - `snapshots.rs` - daily snapshots and the processing cursor

mod entities;
mod records;
mod snapshots;

use crate::domain::{
    Amount, DayBucket, Decimal, EventOrderingKey, FinancialsDailySnapshot, Market,
    MarketDailySnapshot, Protocol, RecordKind, Token, TransactionRecord, UsageDailySnapshot,
};
use sqlx::sqlite::{Sqlite, SqlitePool, SqliteRow};
use sqlx::{Row, Transaction};
use tracing::warn;

/// Repository for database operations.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Open a unit of work for one event.
    ///
    /// # Errors
    /// Returns an error if a connection cannot be acquired.
    pub async fn begin(&self) -> Result<StoreTx, sqlx::Error> {
        Ok(StoreTx {
            tx: self.pool.begin().await?,
        })
    }

    // =========================================================================
    // Read-only queries
    // =========================================================================

    pub async fn get_protocol(&self, id: &str) -> Result<Option<Protocol>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        entities::load_protocol(&mut conn, id).await
    }

    /// The protocol singleton, whatever its id.
    pub async fn find_protocol(&self) -> Result<Option<Protocol>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        let id: Option<String> = sqlx::query_scalar("SELECT id FROM protocol LIMIT 1")
            .fetch_optional(&mut *conn)
            .await?;
        match id {
            Some(id) => entities::load_protocol(&mut conn, &id).await,
            None => Ok(None),
        }
    }

    pub async fn get_market(&self, id: &str) -> Result<Option<Market>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        entities::load_market(&mut conn, id).await
    }

    /// All markets in listing order.
    pub async fn list_markets(&self) -> Result<Vec<Market>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        entities::list_markets(&mut conn).await
    }

    pub async fn get_token(&self, id: &str) -> Result<Option<Token>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        entities::load_token(&mut conn, id).await
    }

    pub async fn get_record(&self, id: &str) -> Result<Option<TransactionRecord>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        records::load_record(&mut conn, id).await
    }

    /// Records in event order, optionally filtered by market and kind.
    pub async fn query_records(
        &self,
        market_id: Option<&str>,
        kind: Option<RecordKind>,
        limit: i64,
    ) -> Result<Vec<TransactionRecord>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        records::query_records(&mut conn, market_id, kind, limit).await
    }

    pub async fn count_accounts(&self) -> Result<i64, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        records::count_accounts(&mut conn).await
    }

    pub async fn query_market_snapshots(
        &self,
        market_id: &str,
        from_day: Option<DayBucket>,
        to_day: Option<DayBucket>,
    ) -> Result<Vec<MarketDailySnapshot>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        snapshots::query_market_snapshots(&mut conn, market_id, from_day, to_day).await
    }

    pub async fn query_financials(
        &self,
        from_day: Option<DayBucket>,
        to_day: Option<DayBucket>,
    ) -> Result<Vec<FinancialsDailySnapshot>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        snapshots::query_financials(&mut conn, from_day, to_day).await
    }

    pub async fn query_usage(
        &self,
        from_day: Option<DayBucket>,
        to_day: Option<DayBucket>,
    ) -> Result<Vec<UsageDailySnapshot>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        snapshots::query_usage(&mut conn, from_day, to_day).await
    }

    pub async fn get_cursor(&self) -> Result<Option<EventOrderingKey>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        snapshots::load_cursor(&mut conn).await
    }
}

/// One event's unit of work. Dropping it without `commit` rolls back.
#[derive(Debug)]
pub struct StoreTx {
    tx: Transaction<'static, Sqlite>,
}

impl StoreTx {
    /// # Errors
    /// Returns an error if the commit fails; nothing is persisted in that case.
    pub async fn commit(self) -> Result<(), sqlx::Error> {
        self.tx.commit().await
    }

    pub async fn rollback(self) -> Result<(), sqlx::Error> {
        self.tx.rollback().await
    }

    // =========================================================================
    // Protocol, tokens, markets
    // =========================================================================

    pub async fn load_protocol(&mut self, id: &str) -> Result<Option<Protocol>, sqlx::Error> {
        entities::load_protocol(&mut self.tx, id).await
    }

    pub async fn save_protocol(&mut self, protocol: &Protocol) -> Result<(), sqlx::Error> {
        entities::save_protocol(&mut self.tx, protocol).await
    }

    pub async fn load_token(&mut self, id: &str) -> Result<Option<Token>, sqlx::Error> {
        entities::load_token(&mut self.tx, id).await
    }

    /// Tokens are immutable: returns false if the id already exists.
    pub async fn insert_token(&mut self, token: &Token) -> Result<bool, sqlx::Error> {
        entities::insert_token(&mut self.tx, token).await
    }

    pub async fn load_market(&mut self, id: &str) -> Result<Option<Market>, sqlx::Error> {
        entities::load_market(&mut self.tx, id).await
    }

    pub async fn save_market(&mut self, market: &Market) -> Result<(), sqlx::Error> {
        entities::save_market(&mut self.tx, market).await
    }

    // =========================================================================
    // Records and accounts
    // =========================================================================

    /// Insert an immutable record; returns false if the key was already stored.
    pub async fn insert_record(&mut self, record: &TransactionRecord) -> Result<bool, sqlx::Error> {
        records::insert_record(&mut self.tx, record).await
    }

    /// Returns true if the account was seen for the first time.
    pub async fn insert_account(&mut self, account: &str) -> Result<bool, sqlx::Error> {
        records::insert_account(&mut self.tx, account).await
    }

    /// Returns true if the account was not yet active on `day`.
    pub async fn insert_daily_active(
        &mut self,
        day: DayBucket,
        account: &str,
    ) -> Result<bool, sqlx::Error> {
        records::insert_daily_active(&mut self.tx, day, account).await
    }

    // =========================================================================
    // Snapshots and cursor
    // =========================================================================

    pub async fn save_market_snapshot(
        &mut self,
        snapshot: &MarketDailySnapshot,
    ) -> Result<(), sqlx::Error> {
        snapshots::save_market_snapshot(&mut self.tx, snapshot).await
    }

    pub async fn load_financials(
        &mut self,
        day: DayBucket,
    ) -> Result<Option<FinancialsDailySnapshot>, sqlx::Error> {
        snapshots::load_financials(&mut self.tx, day).await
    }

    /// Most recent financials snapshot strictly before `day`.
    pub async fn latest_financials_before(
        &mut self,
        day: DayBucket,
    ) -> Result<Option<FinancialsDailySnapshot>, sqlx::Error> {
        snapshots::latest_financials_before(&mut self.tx, day).await
    }

    pub async fn save_financials(
        &mut self,
        snapshot: &FinancialsDailySnapshot,
    ) -> Result<(), sqlx::Error> {
        snapshots::save_financials(&mut self.tx, snapshot).await
    }

    pub async fn load_usage(
        &mut self,
        day: DayBucket,
    ) -> Result<Option<UsageDailySnapshot>, sqlx::Error> {
        snapshots::load_usage(&mut self.tx, day).await
    }

    pub async fn save_usage(&mut self, snapshot: &UsageDailySnapshot) -> Result<(), sqlx::Error> {
        snapshots::save_usage(&mut self.tx, snapshot).await
    }

    pub async fn load_cursor(&mut self) -> Result<Option<EventOrderingKey>, sqlx::Error> {
        snapshots::load_cursor(&mut self.tx).await
    }

    pub async fn set_cursor(&mut self, key: EventOrderingKey) -> Result<(), sqlx::Error> {
        snapshots::set_cursor(&mut self.tx, key).await
    }
}

// =============================================================================
// Column helpers
// =============================================================================

fn decimal_col(row: &SqliteRow, col: &str) -> Decimal {
    let raw: String = row.get(col);
    Decimal::from_str_canonical(&raw).unwrap_or_else(|e| {
        warn!(column = %col, value = %raw, error = %e, "Failed to parse decimal column, using default");
        Decimal::default()
    })
}

fn opt_decimal_col(row: &SqliteRow, col: &str) -> Option<Decimal> {
    let raw: Option<String> = row.get(col);
    raw.map(|raw| {
        Decimal::from_str_canonical(&raw).unwrap_or_else(|e| {
            warn!(column = %col, value = %raw, error = %e, "Failed to parse decimal column, using default");
            Decimal::default()
        })
    })
}

fn amount_col(row: &SqliteRow, col: &str) -> Amount {
    let raw: String = row.get(col);
    Amount::from_str_canonical(&raw).unwrap_or_else(|e| {
        warn!(column = %col, value = %raw, error = %e, "Failed to parse amount column, using default");
        Amount::default()
    })
}

fn height_col(row: &SqliteRow, col: &str) -> u64 {
    u64::try_from(row.get::<i64, _>(col)).unwrap_or(0)
}

/// SQLite integers are signed 64-bit; block heights never approach the limit.
fn height_param(height: u64) -> i64 {
    i64::try_from(height).unwrap_or(i64::MAX)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::Repository;
    use crate::db::migrations::init_db;
    use tempfile::TempDir;

    pub async fn setup_test_db() -> (Repository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        (Repository::new(pool), temp_dir)
    }
}
