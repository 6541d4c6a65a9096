mod common;

use axum::http::StatusCode;
use common::*;
use compound_ledger::api::{self, AppState};
use tower::util::ServiceExt;

async fn request(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let req = axum::http::Request::builder()
        .method("GET")
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();

    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

async fn populated_app() -> (axum::Router, TestPipeline) {
    let pipeline = setup_pipeline(two_market_chain()).await;
    pipeline.processor.process_all(&bootstrap_events()).await.unwrap();
    let events = vec![
        accrue(H + 2, 100, DAI_POOL),
        mint(H + 3, 0, 200, DAI_POOL, ALICE, "100000000000000000000"),
        borrow(H + 4, 0, 300, DAI_POOL, BOB, "5000000000000000000"),
        accrue(H + 12, 400, DAI_POOL),
    ];
    pipeline.processor.process_all(&events).await.unwrap();

    let app = api::create_router(AppState::new(pipeline.repo.clone()));
    (app, pipeline)
}

#[tokio::test]
async fn test_protocol_endpoint() {
    let (app, _pipeline) = populated_app().await;
    let (status, body) = request(app, "/v1/protocol").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["slug"], "compound-v2");
    assert_eq!(body["totalValueLockedUsd"], "100");
    assert_eq!(body["cumulativeTotalRevenueUsd"], "5");
    assert_eq!(body["totalUniqueUsers"], 2);
    assert_eq!(body["marketIds"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_protocol_endpoint_before_any_event() {
    let pipeline = setup_pipeline(two_market_chain()).await;
    let app = api::create_router(AppState::new(pipeline.repo.clone()));
    let (status, body) = request(app, "/v1/protocol").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_markets_endpoints() {
    let (app, _pipeline) = populated_app().await;

    let (status, body) = request(app.clone(), "/v1/markets").await;
    assert_eq!(status, StatusCode::OK);
    let markets = body["markets"].as_array().unwrap();
    assert_eq!(markets.len(), 2);
    assert_eq!(markets[0]["id"], DAI_POOL);
    assert_eq!(markets[0]["inputToken"]["symbol"], "DAI");
    assert_eq!(markets[0]["outputToken"]["decimals"], 8);
    assert_eq!(markets[0]["inputTokenBalance"], "100000000000000000000");

    let (status, body) = request(app.clone(), &format!("/v1/markets/{}", DAI_POOL)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalBorrowUsd"], "50");
    assert_eq!(body["lastAccruedBlock"], H + 12);

    let missing = "0x00000000000000000000000000000000000c00ff";
    let (status, _) = request(app.clone(), &format!("/v1/markets/{}", missing)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = request(app, "/v1/markets/not-an-address").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_snapshot_endpoints() {
    let (app, _pipeline) = populated_app().await;

    let uri = format!("/v1/markets/{}/snapshots?fromDay=18692&toDay=18692", DAI_POOL);
    let (status, body) = request(app.clone(), &uri).await;
    assert_eq!(status, StatusCode::OK);
    let snapshots = body["snapshots"].as_array().unwrap();
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0]["date"], "2021-03-06");
    assert_eq!(snapshots[0]["blockNumber"], H + 12);

    let (status, body) = request(app.clone(), "/v1/financials").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["snapshots"][0]["totalRevenueUsd"], "5");

    let (status, body) = request(app.clone(), "/v1/usage?fromDay=18692").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["snapshots"][0]["dailyTransactionCount"], 2);

    let (status, _) = request(app, "/v1/usage?fromDay=5&toDay=4").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_transactions_endpoint_filters() {
    let (app, _pipeline) = populated_app().await;

    let (status, body) = request(app.clone(), "/v1/transactions").await;
    assert_eq!(status, StatusCode::OK);
    let all = body["transactions"].as_array().unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0]["kind"], "deposit");
    assert_eq!(all[0]["amountUsd"], "100");
    assert!(all[0].get("profitUsd").is_none());

    let (_, body) = request(app.clone(), "/v1/transactions?kind=borrow&limit=1").await;
    let borrows = body["transactions"].as_array().unwrap();
    assert_eq!(borrows.len(), 1);
    assert_eq!(borrows[0]["to"], BOB);

    let other = format!("/v1/transactions?market={}", USDC_POOL);
    let (_, body) = request(app.clone(), &other).await;
    assert!(body["transactions"].as_array().unwrap().is_empty());

    let (status, _) = request(app.clone(), "/v1/transactions?kind=mint").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = request(app, "/v1/transactions?limit=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_and_ready() {
    let (app, _pipeline) = populated_app().await;
    let (status, body) = request(app.clone(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = request(app, "/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["blockHeight"], H + 12);
}
