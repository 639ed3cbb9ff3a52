//! Named FIFO lists used for the intake queue and the per-recipient inboxes.
//!
//! Backends:
//! - `FileQueue`:   one directory per list, one file per item (shared across processes)
//! - `MemoryQueue`: in-process lists, for tests and embedding

use async_trait::async_trait;
use thiserror::Error;

pub mod file;
pub mod memory;

pub use file::FileQueue;
pub use memory::MemoryQueue;

/// Default name of the intake list.
pub const DEFAULT_INTAKE: &str = "incoming";

/// Prefix of per-recipient inbox lists.
pub const INBOX_PREFIX: &str = "inbox:";

/// List key of `recipient`'s inbox.
pub fn inbox_key(recipient: &str) -> String {
    format!("{INBOX_PREFIX}{recipient}")
}

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Queue item {0} is not valid UTF-8")]
    Corrupt(String),

    #[error("Queue task failed: {0}")]
    Task(String),

    #[error("{0}")]
    Other(String),
}

/// A set of named FIFO lists.
///
/// Implementations must be safe to share between the ingestion loop and any
/// number of producers; each pushed item is returned by at most one `pop`.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Append `value` to the tail of `key`.
    async fn push(&self, key: &str, value: &str) -> Result<(), QueueError>;

    /// Remove and return the head of `key`, or `None` when the list is empty.
    async fn pop(&self, key: &str) -> Result<Option<String>, QueueError>;

    /// Number of items currently in `key`.
    async fn len(&self, key: &str) -> Result<usize, QueueError>;

    /// All items of `key`, head first, without removing them.
    async fn peek_all(&self, key: &str) -> Result<Vec<String>, QueueError>;
}
