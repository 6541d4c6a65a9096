//! Domain types for the lending market state engine.
//!
//! This module provides:
//! - Lossless numerics: `Decimal` (USD values, rates) and `Amount` (raw integers)
//! - Fixed-point helpers for 1e18 mantissas and token decimals
//! - Primitives: Address, Timestamp, DayBucket
//! - Events and their total ordering key
//! - Entities: Protocol, Market, Token, transaction records, daily snapshots

pub mod amount;
pub mod decimal;
pub mod deployment;
pub mod event;
pub mod fixed_point;
pub mod market;
pub mod ordering;
pub mod primitives;
pub mod protocol;
pub mod record;
pub mod snapshot;

pub use amount::Amount;
pub use decimal::Decimal;
pub use deployment::{Deployment, ProtocolMetadata};
pub use event::{EventKind, LendingEvent};
pub use market::{Market, Token};
pub use ordering::EventOrderingKey;
pub use primitives::{Address, AddressParseError, DayBucket, Timestamp, SECONDS_PER_DAY};
pub use protocol::Protocol;
pub use record::{LiquidationOutcome, RecordKind, TransactionRecord};
pub use snapshot::{FinancialsDailySnapshot, MarketDailySnapshot, UsageDailySnapshot};
