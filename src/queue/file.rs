//! File-based list backend.
//!
//! Layout under the root directory:
//! - <list>/          : one directory per list key (key bytes outside
//!                      `[A-Za-z0-9_.-]` are %-escaped)
//! - <list>/<ulid>.msg: one pending item, ordered by its monotonic ULID
//!
//! Items are written as `.tmp` and renamed into place, so a reader never sees
//! a partial item. `pop` claims the head with a rename to `.claim` before
//! reading it; only one popper can win that rename.

use async_trait::async_trait;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::{MessageQueue, QueueError};

const ITEM_EXT: &str = "msg";
const TEMP_EXT: &str = "tmp";
const CLAIM_EXT: &str = "claim";

#[derive(Clone)]
pub struct FileQueue {
    root: PathBuf,
    ids: Arc<Mutex<ulid::Generator>>,
}

impl FileQueue {
    /// Open (creating if needed) a queue rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, QueueError> {
        let root = root.into();
        if !root.exists() {
            fs::create_dir_all(&root)?;
            tracing::debug!("Created queue directory: {}", root.display());
        }
        Ok(Self {
            root,
            ids: Arc::new(Mutex::new(ulid::Generator::new())),
        })
    }

    fn list_dir(&self, key: &str) -> PathBuf {
        self.root.join(escape_key(key))
    }

    fn next_id(&self) -> Result<String, QueueError> {
        let mut ids = self
            .ids
            .lock()
            .map_err(|_| QueueError::Other("id generator lock poisoned".to_string()))?;
        // Overflow only happens after 2^80 ids within one millisecond.
        let id = ids
            .generate()
            .map_err(|e| QueueError::Other(format!("id generation: {}", e)))?;
        Ok(id.to_string())
    }
}

#[async_trait]
impl MessageQueue for FileQueue {
    async fn push(&self, key: &str, value: &str) -> Result<(), QueueError> {
        let dir = self.list_dir(key);
        let id = self.next_id()?;
        let value = value.to_string();
        blocking(move || push_item(&dir, &id, &value)).await
    }

    async fn pop(&self, key: &str) -> Result<Option<String>, QueueError> {
        let dir = self.list_dir(key);
        blocking(move || pop_item(&dir)).await
    }

    async fn len(&self, key: &str) -> Result<usize, QueueError> {
        let dir = self.list_dir(key);
        blocking(move || Ok(pending_items(&dir)?.len())).await
    }

    async fn peek_all(&self, key: &str) -> Result<Vec<String>, QueueError> {
        let dir = self.list_dir(key);
        blocking(move || {
            let mut items = Vec::new();
            for path in pending_items(&dir)? {
                match fs::read(&path) {
                    Ok(bytes) => items.push(into_text(&path, bytes)?),
                    // Popped between listing and reading.
                    Err(e) if e.kind() == ErrorKind::NotFound => continue,
                    Err(e) => return Err(e.into()),
                }
            }
            Ok(items)
        })
        .await
    }
}

async fn blocking<T, F>(f: F) -> Result<T, QueueError>
where
    F: FnOnce() -> Result<T, QueueError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| QueueError::Task(e.to_string()))?
}

fn push_item(dir: &Path, id: &str, value: &str) -> Result<(), QueueError> {
    fs::create_dir_all(dir)?;

    let temp = dir.join(format!("{}.{}", id, TEMP_EXT));
    let target = dir.join(format!("{}.{}", id, ITEM_EXT));
    fs::write(&temp, value)?;
    fs::rename(&temp, &target)?;

    tracing::trace!("Pushed item {} to {}", id, dir.display());
    Ok(())
}

fn pop_item(dir: &Path) -> Result<Option<String>, QueueError> {
    for path in pending_items(dir)? {
        let claimed = path.with_extension(CLAIM_EXT);
        match fs::rename(&path, &claimed) {
            Ok(()) => {}
            // Another popper won this one; try the next.
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        }

        let bytes = fs::read(&claimed)?;
        fs::remove_file(&claimed)?;
        return into_text(&path, bytes).map(Some);
    }
    Ok(None)
}

/// Pending item paths of a list, head first.
fn pending_items(dir: &Path) -> Result<Vec<PathBuf>, QueueError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(vec![]),
        Err(e) => return Err(e.into()),
    };

    let mut items = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.extension().map_or(false, |ext| ext == ITEM_EXT) {
            items.push(path);
        }
    }
    // ULIDs sort lexicographically in creation order.
    items.sort();
    Ok(items)
}

fn into_text(path: &Path, bytes: Vec<u8>) -> Result<String, QueueError> {
    String::from_utf8(bytes).map_err(|_| {
        let id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        QueueError::Corrupt(id)
    })
}

fn escape_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'_' | b'.' | b'-') {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}
