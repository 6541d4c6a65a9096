//! JSON-lines event feed: one `LendingEvent` per line.

use super::processor::ProcessOutcome;
use super::writer::{EventWriter, WriterError};
use crate::domain::LendingEvent;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{info, warn};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FeedSummary {
    pub applied: u64,
    pub skipped: u64,
    pub replayed: u64,
    pub aborted: u64,
    /// Lines that did not decode as an event.
    pub malformed: u64,
    /// Events rolled back by a storage failure.
    pub failed: u64,
}

/// Submit every line of `reader` to `writer` in order.
///
/// Malformed lines and rolled-back events are logged and counted; only an
/// I/O error on the reader or a closed writer ends the feed early.
pub async fn run_feed<R>(reader: R, writer: &EventWriter) -> Result<FeedSummary, FeedError>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let mut summary = FeedSummary::default();
    let mut line_no = 0u64;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let event: LendingEvent = match serde_json::from_str(line) {
            Ok(event) => event,
            Err(e) => {
                warn!(line = line_no, error = %e, "Malformed event line");
                summary.malformed += 1;
                continue;
            }
        };

        match writer.submit(event).await {
            Ok(ProcessOutcome::Applied) => summary.applied += 1,
            Ok(ProcessOutcome::Skipped(_)) => summary.skipped += 1,
            Ok(ProcessOutcome::Replayed) => summary.replayed += 1,
            Ok(ProcessOutcome::Aborted) => summary.aborted += 1,
            Err(WriterError::RolledBack(_)) => summary.failed += 1,
            Err(WriterError::Closed) => return Err(FeedError::WriterClosed),
        }
    }

    info!(?summary, "Event feed finished");
    Ok(summary)
}

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("reading event feed: {0}")]
    Io(#[from] std::io::Error),
    #[error("event writer closed before the feed finished")]
    WriterClosed,
}
