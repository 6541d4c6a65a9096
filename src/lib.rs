pub mod api;
pub mod chain;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;

pub use chain::{CallError, ChainReader, MockChainReader, RpcChainReader};
pub use config::Config;
pub use db::{init_db, Repository};
pub use domain::{
    Address, Amount, Decimal, Deployment, EventKind, LendingEvent, Market, Protocol, RecordKind,
    Timestamp, TransactionRecord,
};
pub use engine::{Engine, PricingMode};
pub use error::AppError;
pub use orchestration::{EventProcessor, EventWriter, ProcessOutcome};
