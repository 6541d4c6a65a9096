//! Fixtures shared by the integration tests.
#![allow(dead_code)]

use compound_ledger::chain::ChainMethod;
use compound_ledger::db::init_db;
use compound_ledger::domain::{Address, Amount, Deployment, EventKind, LendingEvent, Timestamp};
use compound_ledger::engine::{Engine, PricingMode};
use compound_ledger::orchestration::EventProcessor;
use compound_ledger::{ChainReader, MockChainReader, Repository};
use std::sync::Arc;
use tempfile::TempDir;

/// Heights past the last ETH-denominated block: prices come straight from
/// the versioned oracle in USD.
pub const H: u64 = 11_000_000;
/// 2021-03-06 00:00:00 UTC.
pub const DAY_START: i64 = 18_692 * 86_400;

pub const ORACLE: &str = "0x000000000000000000000000000000000000f001";
pub const DAI_POOL: &str = "0x00000000000000000000000000000000000c0001";
pub const DAI: &str = "0x00000000000000000000000000000000000a0001";
pub const USDC_POOL: &str = "0x00000000000000000000000000000000000c0002";
pub const USDC: &str = "0x00000000000000000000000000000000000a0002";
pub const ALICE: &str = "0x1111111111111111111111111111111111111111";
pub const BOB: &str = "0x2222222222222222222222222222222222222222";

pub fn addr(s: &str) -> Address {
    Address::new(s)
}

pub fn amt(s: &str) -> Amount {
    Amount::from_str_canonical(s).unwrap()
}

/// Two markets: an 18-decimal token priced at $1 and a 6-decimal token
/// priced at $1, each with a 0.02 exchange rate, 50 tokens borrowed and a
/// 1% per-block borrow rate.
pub fn two_market_chain() -> MockChainReader {
    let deployment = Deployment::default();
    let oracle = addr(ORACLE);
    let (dai_pool, usdc_pool) = (addr(DAI_POOL), addr(USDC_POOL));

    MockChainReader::new()
        .with_uint(
            &deployment.comptroller,
            ChainMethod::LiquidationIncentiveMantissa,
            amt("1080000000000000000"),
        )
        .with_pool(&dai_pool, "Compound Dai", "cDAI", &addr(DAI))
        .with_token(&addr(DAI), "Dai Stablecoin", "DAI", 18)
        .with_uint(&dai_pool, ChainMethod::ReserveFactorMantissa, amt("100000000000000000"))
        .with_uint_arg(&oracle, ChainMethod::GetUnderlyingPrice, &dai_pool, amt("1000000000000000000"))
        .with_uint(&dai_pool, ChainMethod::TotalSupply, amt("5000000000"))
        .with_uint(&dai_pool, ChainMethod::ExchangeRateStored, amt("200000000000000000000000000"))
        .with_uint(&dai_pool, ChainMethod::TotalBorrows, amt("50000000000000000000"))
        .with_uint(&dai_pool, ChainMethod::SupplyRatePerBlock, amt("0"))
        .with_uint(&dai_pool, ChainMethod::BorrowRatePerBlock, amt("10000000000000000"))
        .with_pool(&usdc_pool, "Compound USD Coin", "cUSDC", &addr(USDC))
        .with_token(&addr(USDC), "USD Coin", "USDC", 6)
        .with_uint(&usdc_pool, ChainMethod::ReserveFactorMantissa, amt("0"))
        .with_uint_arg(
            &oracle,
            ChainMethod::GetUnderlyingPrice,
            &usdc_pool,
            amt("1000000000000000000000000000000"),
        )
        .with_uint(&usdc_pool, ChainMethod::TotalSupply, amt("5000000000"))
        .with_uint(&usdc_pool, ChainMethod::ExchangeRateStored, amt("200000000000000"))
        .with_uint(&usdc_pool, ChainMethod::TotalBorrows, amt("50000000"))
        .with_uint(&usdc_pool, ChainMethod::SupplyRatePerBlock, amt("0"))
        .with_uint(&usdc_pool, ChainMethod::BorrowRatePerBlock, amt("10000000000000000"))
}

pub struct TestPipeline {
    pub repo: Arc<Repository>,
    pub processor: EventProcessor,
    pub chain: Arc<MockChainReader>,
    _temp: TempDir,
}

pub async fn setup_pipeline(chain: MockChainReader) -> TestPipeline {
    setup_pipeline_with(chain, PricingMode::PriceAware).await
}

pub async fn setup_pipeline_with(chain: MockChainReader, pricing: PricingMode) -> TestPipeline {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    let repo = Arc::new(Repository::new(pool));

    let chain = Arc::new(chain);
    let reader: Arc<dyn ChainReader> = chain.clone();
    let engine = Engine::new(reader, Arc::new(Deployment::default()), pricing);
    let processor = EventProcessor::new(repo.clone(), engine);

    TestPipeline {
        repo,
        processor,
        chain,
        _temp: temp_dir,
    }
}

pub fn event(height: u64, log_index: u32, secs: i64, address: &str, kind: EventKind) -> LendingEvent {
    LendingEvent {
        block_height: height,
        block_timestamp: Timestamp::new(DAY_START + secs),
        tx_hash: format!("0x{:x}{:02x}", height, log_index),
        log_index,
        address: addr(address),
        kind,
    }
}

fn comptroller() -> String {
    Deployment::default().comptroller.to_string()
}

/// Oracle set plus both markets listed at `H`.
pub fn bootstrap_events() -> Vec<LendingEvent> {
    vec![
        event(
            H,
            0,
            0,
            &comptroller(),
            EventKind::NewPriceOracle {
                new_price_oracle: addr(ORACLE),
            },
        ),
        event(
            H,
            1,
            0,
            &comptroller(),
            EventKind::MarketListed {
                pool_token: addr(DAI_POOL),
            },
        ),
        event(
            H,
            2,
            0,
            &comptroller(),
            EventKind::MarketListed {
                pool_token: addr(USDC_POOL),
            },
        ),
    ]
}

pub fn accrue(height: u64, secs: i64, pool: &str) -> LendingEvent {
    event(
        height,
        0,
        secs,
        pool,
        EventKind::AccrueInterest {
            cash_prior: Amount::zero(),
            interest_accumulated: Amount::zero(),
            borrow_index: Amount::zero(),
            total_borrows: Amount::zero(),
        },
    )
}

pub fn mint(height: u64, log_index: u32, secs: i64, pool: &str, minter: &str, amount: &str) -> LendingEvent {
    event(
        height,
        log_index,
        secs,
        pool,
        EventKind::Mint {
            minter: addr(minter),
            mint_amount: amt(amount),
            mint_tokens: Amount::zero(),
        },
    )
}

pub fn redeem(height: u64, log_index: u32, secs: i64, pool: &str, redeemer: &str, amount: &str) -> LendingEvent {
    event(
        height,
        log_index,
        secs,
        pool,
        EventKind::Redeem {
            redeemer: addr(redeemer),
            redeem_amount: amt(amount),
            redeem_tokens: Amount::zero(),
        },
    )
}

pub fn borrow(height: u64, log_index: u32, secs: i64, pool: &str, borrower: &str, amount: &str) -> LendingEvent {
    event(
        height,
        log_index,
        secs,
        pool,
        EventKind::Borrow {
            borrower: addr(borrower),
            borrow_amount: amt(amount),
            account_borrows: Amount::zero(),
            total_borrows: Amount::zero(),
        },
    )
}
