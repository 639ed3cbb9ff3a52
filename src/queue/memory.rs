//! In-process list backend.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use super::{MessageQueue, QueueError};

#[derive(Debug, Default)]
pub struct MemoryQueue {
    lists: Mutex<HashMap<String, VecDeque<String>>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lists(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, VecDeque<String>>>, QueueError> {
        self.lists
            .lock()
            .map_err(|_| QueueError::Other("memory queue lock poisoned".to_string()))
    }
}

#[async_trait]
impl MessageQueue for MemoryQueue {
    async fn push(&self, key: &str, value: &str) -> Result<(), QueueError> {
        self.lists()?
            .entry(key.to_string())
            .or_default()
            .push_back(value.to_string());
        Ok(())
    }

    async fn pop(&self, key: &str) -> Result<Option<String>, QueueError> {
        Ok(self.lists()?.get_mut(key).and_then(VecDeque::pop_front))
    }

    async fn len(&self, key: &str) -> Result<usize, QueueError> {
        Ok(self.lists()?.get(key).map_or(0, VecDeque::len))
    }

    async fn peek_all(&self, key: &str) -> Result<Vec<String>, QueueError> {
        Ok(self
            .lists()?
            .get(key)
            .map(|list| list.iter().cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fifo_per_key() {
        let queue = MemoryQueue::new();
        queue.push("a", "1").await.unwrap();
        queue.push("a", "2").await.unwrap();
        queue.push("b", "x").await.unwrap();

        assert_eq!(queue.len("a").await.unwrap(), 2);
        assert_eq!(queue.peek_all("a").await.unwrap(), vec!["1", "2"]);
        assert_eq!(queue.pop("a").await.unwrap().as_deref(), Some("1"));
        assert_eq!(queue.pop("a").await.unwrap().as_deref(), Some("2"));
        assert_eq!(queue.pop("a").await.unwrap(), None);
        assert_eq!(queue.len("b").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unknown_key_is_empty() {
        let queue = MemoryQueue::new();
        assert_eq!(queue.pop("nope").await.unwrap(), None);
        assert_eq!(queue.len("nope").await.unwrap(), 0);
        assert!(queue.peek_all("nope").await.unwrap().is_empty());
    }
}
