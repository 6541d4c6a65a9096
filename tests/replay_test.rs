mod common;

use common::*;
use compound_ledger::domain::EventOrderingKey;
use compound_ledger::orchestration::ProcessOutcome;

#[tokio::test]
async fn test_events_at_or_below_cursor_are_replays() {
    let pipeline = setup_pipeline(two_market_chain()).await;
    let bootstrap = bootstrap_events();
    assert_eq!(pipeline.processor.process_all(&bootstrap).await.unwrap(), 3);

    // Whole batch again: nothing applied, nothing read from chain.
    let reads = pipeline.chain.call_count();
    assert_eq!(pipeline.processor.process_all(&bootstrap).await.unwrap(), 0);
    assert_eq!(pipeline.chain.call_count(), reads);

    let deposit = mint(H + 3, 0, 200, DAI_POOL, ALICE, "1000");
    pipeline.processor.process(&deposit).await.unwrap();
    let earlier = mint(H + 2, 7, 150, DAI_POOL, BOB, "1000");
    assert_eq!(
        pipeline.processor.process(&earlier).await.unwrap(),
        ProcessOutcome::Replayed
    );

    let cursor = pipeline.repo.get_cursor().await.unwrap().unwrap();
    assert_eq!(cursor, EventOrderingKey::new(H + 3, 0));
    assert_eq!(pipeline.repo.count_accounts().await.unwrap(), 1);
}

#[tokio::test]
async fn test_redelivered_record_does_not_double_apply() {
    let pipeline = setup_pipeline(two_market_chain()).await;
    pipeline.processor.process_all(&bootstrap_events()).await.unwrap();

    let deposit = mint(H + 3, 0, 200, DAI_POOL, ALICE, "1000");
    assert_eq!(pipeline.processor.process(&deposit).await.unwrap(), ProcessOutcome::Applied);

    // Simulate a lost cursor so the same log reaches the handlers again.
    let mut tx = pipeline.repo.begin().await.unwrap();
    tx.set_cursor(EventOrderingKey::new(H, 2)).await.unwrap();
    tx.commit().await.unwrap();

    assert!(matches!(
        pipeline.processor.process(&deposit).await.unwrap(),
        ProcessOutcome::Skipped(_)
    ));

    let market = pipeline.repo.get_market(DAI_POOL).await.unwrap().unwrap();
    assert_eq!(market.input_token_balance, amt("1000"));
    let usage = pipeline.repo.query_usage(None, None).await.unwrap();
    assert_eq!(usage[0].daily_transaction_count, 1);
}

#[tokio::test]
async fn test_governance_updates_reach_listed_markets() {
    use compound_ledger::domain::{Decimal, Deployment, EventKind};

    let pipeline = setup_pipeline(two_market_chain()).await;
    pipeline.processor.process_all(&bootstrap_events()).await.unwrap();
    let comptroller = Deployment::default().comptroller.to_string();

    let events = vec![
        event(
            H + 1,
            0,
            10,
            &comptroller,
            EventKind::NewCollateralFactor {
                pool_token: addr(DAI_POOL),
                new_collateral_factor_mantissa: amt("750000000000000000"),
            },
        ),
        event(
            H + 1,
            1,
            10,
            &comptroller,
            EventKind::NewLiquidationIncentive {
                new_liquidation_incentive_mantissa: amt("1100000000000000000"),
            },
        ),
        event(
            H + 1,
            2,
            10,
            USDC_POOL,
            EventKind::NewReserveFactor {
                new_reserve_factor_mantissa: amt("150000000000000000"),
            },
        ),
    ];
    pipeline.processor.process_all(&events).await.unwrap();

    let dec = |s: &str| Decimal::from_str_canonical(s).unwrap();
    let dai = pipeline.repo.get_market(DAI_POOL).await.unwrap().unwrap();
    assert_eq!(dai.maximum_ltv, dec("0.75"));
    assert_eq!(dai.liquidation_threshold, dec("0.75"));
    assert_eq!(dai.liquidation_penalty, dec("1.1"));

    let usdc = pipeline.repo.get_market(USDC_POOL).await.unwrap().unwrap();
    assert_eq!(usdc.liquidation_penalty, dec("1.1"));
    assert_eq!(usdc.reserve_factor, dec("0.15"));

    let protocol = pipeline.repo.find_protocol().await.unwrap().unwrap();
    assert_eq!(protocol.liquidation_incentive, dec("1.1"));
}

#[tokio::test]
async fn test_accrual_without_protocol_aborts_and_advances_cursor() {
    let pipeline = setup_pipeline(two_market_chain()).await;

    let early = accrue(H - 1, 0, DAI_POOL);
    assert_eq!(
        pipeline.processor.process(&early).await.unwrap(),
        ProcessOutcome::Aborted
    );

    let cursor = pipeline.repo.get_cursor().await.unwrap().unwrap();
    assert_eq!(cursor, EventOrderingKey::new(H - 1, 0));
    assert!(pipeline.repo.find_protocol().await.unwrap().is_none());
    assert!(pipeline.repo.query_financials(None, None).await.unwrap().is_empty());

    // Aborted events are not retried, and later events still apply.
    assert_eq!(
        pipeline.processor.process(&early).await.unwrap(),
        ProcessOutcome::Replayed
    );
    assert_eq!(pipeline.processor.process_all(&bootstrap_events()).await.unwrap(), 3);
    assert_eq!(
        pipeline.processor.process(&accrue(H + 1, 12, DAI_POOL)).await.unwrap(),
        ProcessOutcome::Applied
    );
    let cursor = pipeline.repo.get_cursor().await.unwrap().unwrap();
    assert_eq!(cursor, EventOrderingKey::new(H + 1, 0));
}
