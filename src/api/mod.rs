pub mod health;
pub mod markets;
pub mod protocol;
pub mod snapshots;
pub mod transactions;

use crate::db::Repository;
use crate::domain::DayBucket;
use crate::error::AppError;
use axum::{routing::get, Router};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Debug, Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
}

impl AppState {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }
}

/// `fromDay`/`toDay` filter shared by the snapshot endpoints.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayRangeQuery {
    pub from_day: Option<i64>,
    pub to_day: Option<i64>,
}

impl DayRangeQuery {
    pub fn bounds(&self) -> Result<(Option<DayBucket>, Option<DayBucket>), AppError> {
        if let (Some(from), Some(to)) = (self.from_day, self.to_day) {
            if from > to {
                return Err(AppError::BadRequest("fromDay must be <= toDay".into()));
            }
        }
        Ok((
            self.from_day.map(DayBucket::new),
            self.to_day.map(DayBucket::new),
        ))
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/protocol", get(protocol::get_protocol))
        .route("/v1/markets", get(markets::list_markets))
        .route("/v1/markets/:id", get(markets::get_market))
        .route("/v1/markets/:id/snapshots", get(snapshots::get_market_snapshots))
        .route("/v1/financials", get(snapshots::get_financials))
        .route("/v1/usage", get(snapshots::get_usage))
        .route("/v1/transactions", get(transactions::get_transactions))
        .layer(cors)
        .with_state(state)
}
