//! Conversation history lookups.

use std::sync::Arc;
use thiserror::Error;

use crate::core::Message;
use crate::store::{ConversationFilter, MessageStore, StoreError};

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("user param required")]
    InvalidRequest,

    #[error("{0}")]
    StorageUnavailable(#[source] StoreError),
}

/// A history request: everything `user` exchanged, optionally narrowed to one peer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationQuery {
    pub user: String,
    pub peer: Option<String>,
}

impl ConversationQuery {
    pub fn new(user: impl Into<String>, peer: Option<String>) -> Self {
        Self {
            user: user.into(),
            peer,
        }
    }

    /// Translate into a store filter. An empty peer counts as no peer.
    pub fn filter(&self) -> Result<ConversationFilter, QueryError> {
        if self.user.is_empty() {
            return Err(QueryError::InvalidRequest);
        }

        Ok(match self.peer.as_deref() {
            Some(peer) if !peer.is_empty() => ConversationFilter::Pair {
                user: self.user.clone(),
                peer: peer.to_string(),
            },
            _ => ConversationFilter::Participant {
                user: self.user.clone(),
            },
        })
    }
}

/// Read-only view over the message store.
#[derive(Clone)]
pub struct ConversationService {
    store: Arc<dyn MessageStore>,
}

impl ConversationService {
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        Self { store }
    }

    /// Messages matching `query`, oldest first.
    pub async fn history(&self, query: &ConversationQuery) -> Result<Vec<Message>, QueryError> {
        let filter = query.filter()?;
        let messages = self
            .store
            .conversation(&filter)
            .await
            .map_err(QueryError::StorageUnavailable)?;

        tracing::debug!(
            "History for user={} peer={}: {} message(s)",
            query.user,
            query.peer.as_deref().unwrap_or(""),
            messages.len()
        );
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store that counts lookups and always fails them.
    #[derive(Default)]
    struct BrokenStore {
        lookups: AtomicUsize,
    }

    #[async_trait]
    impl MessageStore for BrokenStore {
        async fn append(&self, _message: &Message) -> Result<(), StoreError> {
            Err(StoreError::Other("read-only".to_string()))
        }

        async fn conversation(&self, _filter: &ConversationFilter) -> Result<Vec<Message>, StoreError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Other("connection refused".to_string()))
        }

        async fn count(&self) -> Result<usize, StoreError> {
            Ok(0)
        }
    }

    #[test]
    fn test_filter_selection() {
        let q = ConversationQuery::new("alice", Some("bob".to_string()));
        assert_eq!(
            q.filter().unwrap(),
            ConversationFilter::Pair {
                user: "alice".to_string(),
                peer: "bob".to_string()
            }
        );

        for peer in [None, Some(String::new())] {
            let q = ConversationQuery::new("alice", peer);
            assert_eq!(
                q.filter().unwrap(),
                ConversationFilter::Participant {
                    user: "alice".to_string()
                }
            );
        }
    }

    #[tokio::test]
    async fn test_missing_user_skips_store() {
        let store = Arc::new(BrokenStore::default());
        let service = ConversationService::new(store.clone());

        let err = service
            .history(&ConversationQuery::new("", Some("bob".to_string())))
            .await
            .unwrap_err();

        assert!(matches!(err, QueryError::InvalidRequest));
        assert_eq!(store.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_storage_failure() {
        let store = Arc::new(BrokenStore::default());
        let service = ConversationService::new(store.clone());

        let err = service
            .history(&ConversationQuery::new("alice", None))
            .await
            .unwrap_err();

        assert!(matches!(err, QueryError::StorageUnavailable(_)));
        assert_eq!(err.to_string(), "connection refused");
        assert_eq!(store.lookups.load(Ordering::SeqCst), 1);
    }
}
