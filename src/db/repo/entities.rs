//! Protocol, token and market persistence.

use super::{amount_col, decimal_col, height_col, height_param};
use crate::domain::{Address, Market, Protocol, Timestamp, Token};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;

// =============================================================================
// Protocol
// =============================================================================

pub(super) async fn load_protocol(
    conn: &mut SqliteConnection,
    id: &str,
) -> Result<Option<Protocol>, sqlx::Error> {
    let row = sqlx::query("SELECT * FROM protocol WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let market_ids: Vec<String> = sqlx::query_scalar(
        "SELECT market_id FROM protocol_markets WHERE protocol_id = ? ORDER BY position ASC",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Some(protocol_from_row(&row, market_ids)))
}

fn protocol_from_row(row: &SqliteRow, market_ids: Vec<String>) -> Protocol {
    Protocol {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
        schema_version: row.get("schema_version"),
        indexer_version: row.get("indexer_version"),
        methodology_version: row.get("methodology_version"),
        network: row.get("network"),
        protocol_type: row.get("protocol_type"),
        lending_type: row.get("lending_type"),
        risk_type: row.get("risk_type"),
        total_value_locked_usd: decimal_col(row, "total_value_locked_usd"),
        total_deposit_usd: decimal_col(row, "total_deposit_usd"),
        total_borrow_usd: decimal_col(row, "total_borrow_usd"),
        cumulative_total_revenue_usd: decimal_col(row, "cumulative_total_revenue_usd"),
        cumulative_protocol_side_revenue_usd: decimal_col(
            row,
            "cumulative_protocol_side_revenue_usd",
        ),
        cumulative_supply_side_revenue_usd: decimal_col(row, "cumulative_supply_side_revenue_usd"),
        total_unique_users: row.get("total_unique_users"),
        market_ids,
        price_oracle: row.get::<Option<String>, _>("price_oracle").map(Address::new),
        liquidation_incentive: decimal_col(row, "liquidation_incentive"),
    }
}

pub(super) async fn save_protocol(
    conn: &mut SqliteConnection,
    protocol: &Protocol,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO protocol (
            id, name, slug, schema_version, indexer_version, methodology_version,
            network, protocol_type, lending_type, risk_type,
            total_value_locked_usd, total_deposit_usd, total_borrow_usd,
            cumulative_total_revenue_usd, cumulative_protocol_side_revenue_usd,
            cumulative_supply_side_revenue_usd, total_unique_users,
            price_oracle, liquidation_incentive
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            total_value_locked_usd = excluded.total_value_locked_usd,
            total_deposit_usd = excluded.total_deposit_usd,
            total_borrow_usd = excluded.total_borrow_usd,
            cumulative_total_revenue_usd = excluded.cumulative_total_revenue_usd,
            cumulative_protocol_side_revenue_usd = excluded.cumulative_protocol_side_revenue_usd,
            cumulative_supply_side_revenue_usd = excluded.cumulative_supply_side_revenue_usd,
            total_unique_users = excluded.total_unique_users,
            price_oracle = excluded.price_oracle,
            liquidation_incentive = excluded.liquidation_incentive
        "#,
    )
    .bind(&protocol.id)
    .bind(&protocol.name)
    .bind(&protocol.slug)
    .bind(&protocol.schema_version)
    .bind(&protocol.indexer_version)
    .bind(&protocol.methodology_version)
    .bind(&protocol.network)
    .bind(&protocol.protocol_type)
    .bind(&protocol.lending_type)
    .bind(&protocol.risk_type)
    .bind(protocol.total_value_locked_usd.to_canonical_string())
    .bind(protocol.total_deposit_usd.to_canonical_string())
    .bind(protocol.total_borrow_usd.to_canonical_string())
    .bind(protocol.cumulative_total_revenue_usd.to_canonical_string())
    .bind(protocol.cumulative_protocol_side_revenue_usd.to_canonical_string())
    .bind(protocol.cumulative_supply_side_revenue_usd.to_canonical_string())
    .bind(protocol.total_unique_users)
    .bind(protocol.price_oracle.as_ref().map(|a| a.as_str().to_string()))
    .bind(protocol.liquidation_incentive.to_canonical_string())
    .execute(&mut *conn)
    .await?;

    // The market list only ever grows; existing positions are left alone.
    for (position, market_id) in protocol.market_ids.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO protocol_markets (protocol_id, position, market_id)
            VALUES (?, ?, ?)
            ON CONFLICT(protocol_id, market_id) DO NOTHING
            "#,
        )
        .bind(&protocol.id)
        .bind(position as i64)
        .bind(market_id)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

// =============================================================================
// Tokens
// =============================================================================

pub(super) async fn load_token(
    conn: &mut SqliteConnection,
    id: &str,
) -> Result<Option<Token>, sqlx::Error> {
    let row = sqlx::query("SELECT id, name, symbol, decimals FROM tokens WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.map(|row| Token {
        id: row.get("id"),
        name: row.get("name"),
        symbol: row.get("symbol"),
        decimals: u32::try_from(row.get::<i64, _>("decimals")).unwrap_or(0),
    }))
}

pub(super) async fn insert_token(
    conn: &mut SqliteConnection,
    token: &Token,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO tokens (id, name, symbol, decimals)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(id) DO NOTHING
        "#,
    )
    .bind(&token.id)
    .bind(&token.name)
    .bind(&token.symbol)
    .bind(i64::from(token.decimals))
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

// =============================================================================
// Markets
// =============================================================================

pub(super) async fn load_market(
    conn: &mut SqliteConnection,
    id: &str,
) -> Result<Option<Market>, sqlx::Error> {
    let row = sqlx::query("SELECT * FROM markets WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.as_ref().map(market_from_row))
}

pub(super) async fn list_markets(conn: &mut SqliteConnection) -> Result<Vec<Market>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT m.*
        FROM markets m
        LEFT JOIN protocol_markets pm ON pm.market_id = m.id
        ORDER BY pm.position ASC, m.id ASC
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.iter().map(market_from_row).collect())
}

fn market_from_row(row: &SqliteRow) -> Market {
    Market {
        id: row.get("id"),
        protocol_id: row.get("protocol_id"),
        name: row.get("name"),
        input_token: row.get("input_token"),
        input_token_balance: amount_col(row, "input_token_balance"),
        input_token_price_usd: decimal_col(row, "input_token_price_usd"),
        output_token: row.get("output_token"),
        output_token_supply: amount_col(row, "output_token_supply"),
        output_token_price_usd: decimal_col(row, "output_token_price_usd"),
        total_value_locked_usd: decimal_col(row, "total_value_locked_usd"),
        total_deposit_usd: decimal_col(row, "total_deposit_usd"),
        total_borrow_usd: decimal_col(row, "total_borrow_usd"),
        maximum_ltv: decimal_col(row, "maximum_ltv"),
        liquidation_threshold: decimal_col(row, "liquidation_threshold"),
        liquidation_penalty: decimal_col(row, "liquidation_penalty"),
        reserve_factor: decimal_col(row, "reserve_factor"),
        deposit_rate: decimal_col(row, "deposit_rate"),
        variable_borrow_rate: decimal_col(row, "variable_borrow_rate"),
        total_revenue_usd_per_block: decimal_col(row, "total_revenue_usd_per_block"),
        protocol_side_revenue_usd_per_block: decimal_col(
            row,
            "protocol_side_revenue_usd_per_block",
        ),
        supply_side_revenue_usd_per_block: decimal_col(row, "supply_side_revenue_usd_per_block"),
        is_active: row.get::<i32, _>("is_active") != 0,
        can_use_as_collateral: row.get::<i32, _>("can_use_as_collateral") != 0,
        can_borrow_from: row.get::<i32, _>("can_borrow_from") != 0,
        created_timestamp: Timestamp::new(row.get("created_timestamp")),
        created_block: height_col(row, "created_block"),
        last_accrued_block: height_col(row, "last_accrued_block"),
    }
}

pub(super) async fn save_market(
    conn: &mut SqliteConnection,
    market: &Market,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT OR REPLACE INTO markets (
            id, protocol_id, name,
            input_token, input_token_balance, input_token_price_usd,
            output_token, output_token_supply, output_token_price_usd,
            total_value_locked_usd, total_deposit_usd, total_borrow_usd,
            maximum_ltv, liquidation_threshold, liquidation_penalty, reserve_factor,
            deposit_rate, variable_borrow_rate,
            total_revenue_usd_per_block, protocol_side_revenue_usd_per_block,
            supply_side_revenue_usd_per_block,
            is_active, can_use_as_collateral, can_borrow_from,
            created_timestamp, created_block, last_accrued_block
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&market.id)
    .bind(&market.protocol_id)
    .bind(&market.name)
    .bind(market.input_token.as_deref())
    .bind(market.input_token_balance.to_canonical_string())
    .bind(market.input_token_price_usd.to_canonical_string())
    .bind(market.output_token.as_deref())
    .bind(market.output_token_supply.to_canonical_string())
    .bind(market.output_token_price_usd.to_canonical_string())
    .bind(market.total_value_locked_usd.to_canonical_string())
    .bind(market.total_deposit_usd.to_canonical_string())
    .bind(market.total_borrow_usd.to_canonical_string())
    .bind(market.maximum_ltv.to_canonical_string())
    .bind(market.liquidation_threshold.to_canonical_string())
    .bind(market.liquidation_penalty.to_canonical_string())
    .bind(market.reserve_factor.to_canonical_string())
    .bind(market.deposit_rate.to_canonical_string())
    .bind(market.variable_borrow_rate.to_canonical_string())
    .bind(market.total_revenue_usd_per_block.to_canonical_string())
    .bind(market.protocol_side_revenue_usd_per_block.to_canonical_string())
    .bind(market.supply_side_revenue_usd_per_block.to_canonical_string())
    .bind(market.is_active as i32)
    .bind(market.can_use_as_collateral as i32)
    .bind(market.can_borrow_from as i32)
    .bind(market.created_timestamp.as_i64())
    .bind(height_param(market.created_block))
    .bind(height_param(market.last_accrued_block))
    .execute(&mut *conn)
    .await?;

    Ok(())
}
