//! Transaction records, accounts and daily active markers.

use super::{amount_col, decimal_col, height_col, height_param, opt_decimal_col};
use crate::domain::snapshot::daily_active_account_id;
use crate::domain::{DayBucket, LiquidationOutcome, RecordKind, Timestamp, TransactionRecord};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use tracing::warn;

pub(super) async fn insert_record(
    conn: &mut SqliteConnection,
    record: &TransactionRecord,
) -> Result<bool, sqlx::Error> {
    let liquidation = record.liquidation.as_ref();
    let result = sqlx::query(
        r#"
        INSERT INTO transaction_records (
            id, kind, hash, log_index, protocol_id, from_account, to_account,
            block_height, timestamp, market_id, asset_id, amount, amount_usd,
            gain_usd, loss_usd, profit_usd
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO NOTHING
        "#,
    )
    .bind(&record.id)
    .bind(record.kind.as_str())
    .bind(&record.hash)
    .bind(i64::from(record.log_index))
    .bind(&record.protocol_id)
    .bind(&record.from)
    .bind(&record.to)
    .bind(height_param(record.block_height))
    .bind(record.timestamp.as_i64())
    .bind(&record.market_id)
    .bind(&record.asset_id)
    .bind(record.amount.to_canonical_string())
    .bind(record.amount_usd.to_canonical_string())
    .bind(liquidation.map(|l| l.gain_usd.to_canonical_string()))
    .bind(liquidation.map(|l| l.loss_usd.to_canonical_string()))
    .bind(liquidation.map(|l| l.profit_usd.to_canonical_string()))
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub(super) async fn load_record(
    conn: &mut SqliteConnection,
    id: &str,
) -> Result<Option<TransactionRecord>, sqlx::Error> {
    let row = sqlx::query("SELECT * FROM transaction_records WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.as_ref().and_then(record_from_row))
}

pub(super) async fn query_records(
    conn: &mut SqliteConnection,
    market_id: Option<&str>,
    kind: Option<RecordKind>,
    limit: i64,
) -> Result<Vec<TransactionRecord>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT *
        FROM transaction_records
        WHERE (?1 IS NULL OR market_id = ?1)
          AND (?2 IS NULL OR kind = ?2)
        ORDER BY block_height ASC, log_index ASC
        LIMIT ?3
        "#,
    )
    .bind(market_id)
    .bind(kind.map(|k| k.as_str()))
    .bind(limit)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.iter().filter_map(record_from_row).collect())
}

fn record_from_row(row: &SqliteRow) -> Option<TransactionRecord> {
    let id: String = row.get("id");
    let kind_str: String = row.get("kind");
    let kind = match RecordKind::from_str(&kind_str) {
        Ok(kind) => kind,
        Err(e) => {
            warn!(id = %id, error = %e, "Skipping transaction record with unknown kind");
            return None;
        }
    };

    let liquidation = match (
        opt_decimal_col(row, "gain_usd"),
        opt_decimal_col(row, "loss_usd"),
        opt_decimal_col(row, "profit_usd"),
    ) {
        (Some(gain_usd), Some(loss_usd), Some(profit_usd)) => Some(LiquidationOutcome {
            gain_usd,
            loss_usd,
            profit_usd,
        }),
        _ => None,
    };

    Some(TransactionRecord {
        id,
        kind,
        hash: row.get("hash"),
        log_index: u32::try_from(row.get::<i64, _>("log_index")).unwrap_or(0),
        protocol_id: row.get("protocol_id"),
        from: row.get("from_account"),
        to: row.get("to_account"),
        block_height: height_col(row, "block_height"),
        timestamp: Timestamp::new(row.get("timestamp")),
        market_id: row.get("market_id"),
        asset_id: row.get("asset_id"),
        amount: amount_col(row, "amount"),
        amount_usd: decimal_col(row, "amount_usd"),
        liquidation,
    })
}

pub(super) async fn insert_account(
    conn: &mut SqliteConnection,
    account: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("INSERT INTO accounts (id) VALUES (?) ON CONFLICT(id) DO NOTHING")
        .bind(account)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub(super) async fn count_accounts(conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM accounts")
        .fetch_one(&mut *conn)
        .await
}

pub(super) async fn insert_daily_active(
    conn: &mut SqliteConnection,
    day: DayBucket,
    account: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO daily_active_accounts (id, day, account)
        VALUES (?, ?, ?)
        ON CONFLICT(id) DO NOTHING
        "#,
    )
    .bind(daily_active_account_id(day, account))
    .bind(day.as_i64())
    .bind(account)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}
