//! Ingestion loop: intake queue -> decode -> store -> recipient inbox.
//!
//! Delivery is at-most-once. An item is gone from the intake queue as soon as
//! it is popped, so a malformed item or a failed store write loses it. The
//! store is the system of record; the inbox push is a best-effort notification
//! and its failure does not change what the loop does next.
//!
//! Each backend call runs to completion before the step decides its outcome;
//! time limits belong to the backends (e.g. the SQLite busy timeout), so a
//! reported failure never hides a write that went through.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::message::decode;
use crate::queue::{inbox_key, MessageQueue, DEFAULT_INTAKE};
use crate::store::MessageStore;

/// Ingestion loop settings.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// List key producers push encoded messages onto.
    pub intake: String,
    /// Wait before polling again after an empty (or failed) fetch.
    pub poll_interval: Duration,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            intake: DEFAULT_INTAKE.to_string(),
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// What a single pass of the loop did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The intake queue had nothing to give.
    Empty,
    /// The intake queue could not be read.
    FetchFailed,
    /// The item did not decode and was dropped.
    Malformed,
    /// The item decoded but could not be stored, and was dropped.
    StoreFailed,
    /// The message was stored. `published` tells whether the inbox push went through.
    Delivered { recipient: String, published: bool },
}

impl StepOutcome {
    /// Whether the loop should back off before the next fetch.
    pub fn should_idle(&self) -> bool {
        matches!(self, StepOutcome::Empty | StepOutcome::FetchFailed)
    }
}

/// The single consumer of the intake queue.
#[derive(Clone)]
pub struct Ingestor {
    queue: Arc<dyn MessageQueue>,
    store: Arc<dyn MessageStore>,
    config: IngestConfig,
}

impl Ingestor {
    pub fn new(
        queue: Arc<dyn MessageQueue>,
        store: Arc<dyn MessageStore>,
        config: IngestConfig,
    ) -> Self {
        Self {
            queue,
            store,
            config,
        }
    }

    /// Run one fetch/decode/persist/publish pass.
    pub async fn step(&self) -> StepOutcome {
        let raw = match self.queue.pop(&self.config.intake).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return StepOutcome::Empty,
            Err(e) => {
                tracing::error!("Failed to fetch from {}: {}", self.config.intake, e);
                return StepOutcome::FetchFailed;
            }
        };

        let envelope = match decode(&raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::debug!("Dropping malformed message ({}): {:?}", e, raw);
                return StepOutcome::Malformed;
            }
        };

        let (message, raw) = envelope.stamp(Utc::now());
        if let Err(e) = self.store.append(&message).await {
            tracing::error!(
                "Dropping message {} -> {}: store write failed: {}",
                message.sender,
                message.recipient,
                e
            );
            return StepOutcome::StoreFailed;
        }

        let inbox = inbox_key(&message.recipient);
        let published = match self.queue.push(&inbox, &raw).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Inbox push to {} failed: {}", inbox, e);
                false
            }
        };

        tracing::debug!(
            "Delivered message {} -> {} ({} bytes)",
            message.sender,
            message.recipient,
            message.content.len()
        );
        StepOutcome::Delivered {
            recipient: message.recipient,
            published,
        }
    }

    /// Consume the intake queue until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(
            "Ingestion loop started (intake={}, poll={:?})",
            self.config.intake,
            self.config.poll_interval
        );

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let outcome = self.step().await;
            if outcome.should_idle() {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.config.poll_interval) => {}
                }
            }
        }

        tracing::info!("Ingestion loop stopped");
    }

    /// Start the loop on its own task.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(cancel).await })
    }
}
