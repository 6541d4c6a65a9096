//! Single-writer queue in front of the processor.
//!
//! Producers submit events through a cloneable [`EventWriter`]; one task owns
//! the [`EventProcessor`] and applies them strictly in arrival order.

use super::processor::{EventProcessor, ProcessOutcome};
use crate::domain::LendingEvent;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum WriterError {
    #[error("event writer has shut down")]
    Closed,
    /// The event was rolled back; the writer keeps running.
    #[error("event rolled back: {0}")]
    RolledBack(String),
}

#[derive(Debug)]
struct Submission {
    event: LendingEvent,
    reply: oneshot::Sender<Result<ProcessOutcome, WriterError>>,
}

#[derive(Debug, Clone)]
pub struct EventWriter {
    sender: mpsc::Sender<Submission>,
}

impl EventWriter {
    /// Start the writer task. It exits once every `EventWriter` clone is
    /// dropped and the queue has drained.
    pub fn spawn(processor: EventProcessor, capacity: usize) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(run(processor, receiver));
        (EventWriter { sender }, handle)
    }

    /// Queue `event` and wait for it to be applied.
    pub async fn submit(&self, event: LendingEvent) -> Result<ProcessOutcome, WriterError> {
        let (reply, outcome) = oneshot::channel();
        self.sender
            .send(Submission { event, reply })
            .await
            .map_err(|_| WriterError::Closed)?;
        outcome.await.map_err(|_| WriterError::Closed)?
    }
}

async fn run(processor: EventProcessor, mut receiver: mpsc::Receiver<Submission>) {
    let mut processed = 0u64;
    let mut failed = 0u64;

    while let Some(Submission { event, reply }) = receiver.recv().await {
        let result = match processor.process(&event).await {
            Ok(outcome) => {
                processed += 1;
                Ok(outcome)
            }
            Err(e) => {
                failed += 1;
                error!(
                    kind = event.kind.name(),
                    height = event.block_height,
                    tx_hash = %event.tx_hash,
                    log_index = event.log_index,
                    error = %e,
                    "Event rolled back"
                );
                Err(WriterError::RolledBack(e.to_string()))
            }
        };
        // Submitter may have given up waiting.
        let _ = reply.send(result);
    }

    info!(processed, failed, "Event writer stopped");
}
