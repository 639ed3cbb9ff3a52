//! SQLite-backed message store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::path::PathBuf;
use std::time::Duration;

use super::{ConversationFilter, MessageStore, StoreError};
use crate::core::Message;

/// How long a statement waits on another connection's lock before failing.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        sender TEXT NOT NULL,
        recipient TEXT NOT NULL,
        content TEXT NOT NULL,
        ts INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_messages_sender ON messages(sender, ts);
    CREATE INDEX IF NOT EXISTS idx_messages_recipient ON messages(recipient, ts);
"#;

#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
    busy_timeout: Duration,
}

impl SqliteStore {
    /// Open the database at `path`, creating the file and schema if needed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        Self::open_with_busy_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    /// Like `open`, with a custom lock wait. A write that cannot get the
    /// lock in time fails inside SQLite and leaves nothing behind.
    pub fn open_with_busy_timeout(
        path: impl Into<PathBuf>,
        busy_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let store = Self {
            path: path.into(),
            busy_timeout,
        };
        if let Some(parent) = store.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = store.connect()?;
        let mode: String = conn
            .query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))
            .map_err(StoreError::sqlite("journal mode"))?;
        conn.execute_batch(SCHEMA)
            .map_err(StoreError::sqlite("init"))?;

        tracing::debug!("Opened message store {} (journal={})", store.path.display(), mode);
        Ok(store)
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.path).map_err(StoreError::sqlite("open"))?;
        conn.busy_timeout(self.busy_timeout)
            .map_err(StoreError::sqlite("busy timeout"))?;
        Ok(conn)
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || f(store.connect()?))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

#[async_trait]
impl MessageStore for SqliteStore {
    async fn append(&self, message: &Message) -> Result<(), StoreError> {
        let message = message.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO messages (sender, recipient, content, ts) VALUES (?1, ?2, ?3, ?4)",
                params![
                    message.sender,
                    message.recipient,
                    message.content,
                    message.timestamp.timestamp_micros()
                ],
            )
            .map_err(StoreError::sqlite("insert message"))?;
            Ok(())
        })
        .await
    }

    async fn conversation(&self, filter: &ConversationFilter) -> Result<Vec<Message>, StoreError> {
        let filter = filter.clone();
        self.with_conn(move |conn| {
            let rows = match &filter {
                ConversationFilter::Pair { user, peer } => {
                    let mut stmt = conn
                        .prepare(
                            "SELECT sender, recipient, content, ts FROM messages \
                             WHERE (sender = ?1 AND recipient = ?2) OR (sender = ?2 AND recipient = ?1) \
                             ORDER BY ts ASC, id ASC",
                        )
                        .map_err(StoreError::sqlite("prepare pair query"))?;
                    let rows = stmt
                        .query_map(params![user, peer], read_row)
                        .map_err(StoreError::sqlite("pair query"))?
                        .collect::<Result<Vec<_>, _>>()
                        .map_err(StoreError::sqlite("read pair row"))?;
                    rows
                }
                ConversationFilter::Participant { user } => {
                    let mut stmt = conn
                        .prepare(
                            "SELECT sender, recipient, content, ts FROM messages \
                             WHERE sender = ?1 OR recipient = ?1 \
                             ORDER BY ts ASC, id ASC",
                        )
                        .map_err(StoreError::sqlite("prepare participant query"))?;
                    let rows = stmt
                        .query_map(params![user], read_row)
                        .map_err(StoreError::sqlite("participant query"))?
                        .collect::<Result<Vec<_>, _>>()
                        .map_err(StoreError::sqlite("read participant row"))?;
                    rows
                }
            };

            rows.into_iter().map(StoredRow::into_message).collect()
        })
        .await
    }

    async fn count(&self) -> Result<usize, StoreError> {
        self.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))
                .map_err(StoreError::sqlite("count messages"))?;
            Ok(count as usize)
        })
        .await
    }
}

struct StoredRow {
    sender: String,
    recipient: String,
    content: String,
    ts: i64,
}

impl StoredRow {
    fn into_message(self) -> Result<Message, StoreError> {
        let timestamp = DateTime::<Utc>::from_timestamp_micros(self.ts)
            .ok_or_else(|| StoreError::Other(format!("timestamp out of range: {}", self.ts)))?;
        Ok(Message {
            sender: self.sender,
            recipient: self.recipient,
            content: self.content,
            timestamp,
        })
    }
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<StoredRow> {
    Ok(StoredRow {
        sender: row.get(0)?,
        recipient: row.get(1)?,
        content: row.get(2)?,
        ts: row.get(3)?,
    })
}
