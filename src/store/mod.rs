//! Durable message store.

use async_trait::async_trait;
use thiserror::Error;

use crate::core::Message;

pub mod sqlite;

pub use sqlite::SqliteStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sqlite {op}: {source}")]
    Sqlite {
        op: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Store task failed: {0}")]
    Task(String),

    #[error("{0}")]
    Other(String),
}

impl StoreError {
    pub(crate) fn sqlite(op: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| StoreError::Sqlite { op, source }
    }
}

/// Which messages a conversation lookup selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationFilter {
    /// Messages exchanged between two participants, in either direction.
    Pair { user: String, peer: String },
    /// Every message `user` sent or received.
    Participant { user: String },
}

/// Append-only store of delivered messages.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist one message.
    async fn append(&self, message: &Message) -> Result<(), StoreError>;

    /// Messages matching `filter`, oldest first.
    async fn conversation(&self, filter: &ConversationFilter) -> Result<Vec<Message>, StoreError>;

    /// Total number of stored messages.
    async fn count(&self) -> Result<usize, StoreError>;
}
