//! Event handlers and the single-writer pipeline that drives them.

mod accrual;
mod activity;
pub mod feed;
mod governance;
pub mod processor;
pub mod writer;

pub use feed::{run_feed, FeedError, FeedSummary};
pub use processor::{EventProcessor, HandlerOutcome, ProcessError, ProcessOutcome};
pub use writer::{EventWriter, WriterError};
