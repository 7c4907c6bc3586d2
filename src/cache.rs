use crate::error::StoreError;
use crate::tweet_record::TweetRecord;
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

pub const DATABASE_NAME: &str = "twitterArchiveViewer";
pub const TABLE_NAME: &str = "tweets";
/// The whole timeline lives under this one key.
pub const TIMELINE_KEY: &str = "tweets";

/// A durable table of string values. Every `put` replaces the whole value.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Create `table` if it does not exist yet. Safe to call repeatedly.
    async fn open(&self, table: &str) -> Result<(), StoreError>;
    async fn get(&self, table: &str, key: &str) -> Result<Option<String>, StoreError>;
    async fn put(&self, table: &str, key: &str, value: String) -> Result<(), StoreError>;
    async fn clear(&self, table: &str) -> Result<(), StoreError>;
}

/// One directory per table, one JSON file per key.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            root: data_dir.join(DATABASE_NAME),
        }
    }

    fn table_dir(&self, table: &str) -> PathBuf {
        self.root.join(file_stem(table))
    }

    /// The table directory, or `NotOpened` when `open` never ran.
    async fn existing_table_dir(&self, table: &str) -> Result<PathBuf, StoreError> {
        let dir = self.table_dir(table);
        match tokio::fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => Ok(dir),
            Ok(_) => Err(StoreError::NotOpened(table.to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::NotOpened(table.to_string()))
            }
            Err(source) => Err(StoreError::Io { path: dir, source }),
        }
    }
}

/// Staging files are unique per write so overlapping puts never share one.
static STAGING_SEQ: AtomicU64 = AtomicU64::new(0);

/// Keys are fixed identifiers, but keep them from escaping the table directory.
fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn open(&self, table: &str) -> Result<(), StoreError> {
        let dir = self.table_dir(table);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| StoreError::Unavailable { path: dir, source })
    }

    async fn get(&self, table: &str, key: &str) -> Result<Option<String>, StoreError> {
        let path = self
            .existing_table_dir(table)
            .await?
            .join(format!("{}.json", file_stem(key)));
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    async fn put(&self, table: &str, key: &str, value: String) -> Result<(), StoreError> {
        let dir = self.existing_table_dir(table).await?;
        let path = dir.join(format!("{}.json", file_stem(key)));
        let staging = dir.join(format!(
            "{}.json.{}-{}.tmp",
            file_stem(key),
            std::process::id(),
            STAGING_SEQ.fetch_add(1, Ordering::Relaxed)
        ));

        // Readers see either the old file or the new one, never a partial write.
        tokio::fs::write(&staging, value)
            .await
            .map_err(|source| StoreError::Io {
                path: staging.clone(),
                source,
            })?;
        tokio::fs::rename(&staging, &path)
            .await
            .map_err(|source| StoreError::Io { path, source })
    }

    async fn clear(&self, table: &str) -> Result<(), StoreError> {
        let dir = self.existing_table_dir(table).await?;
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|source| StoreError::Io {
                path: dir.clone(),
                source,
            })?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|source| StoreError::Io {
                path: dir.clone(),
                source,
            })?
        {
            let path = entry.path();
            let file_type = entry
                .file_type()
                .await
                .map_err(|source| StoreError::Io {
                    path: path.clone(),
                    source,
                })?;
            if file_type.is_file() {
                tokio::fs::remove_file(&path)
                    .await
                    .map_err(|source| StoreError::Io { path, source })?;
            }
        }
        Ok(())
    }
}

/// Process-local store for tests and throwaway sessions.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_table<T>(
        &self,
        table: &str,
        f: impl FnOnce(&mut HashMap<String, String>) -> T,
    ) -> Result<T, StoreError> {
        let mut tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        let entries = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::NotOpened(table.to_string()))?;
        Ok(f(entries))
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn open(&self, table: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        tables.entry(table.to_string()).or_default();
        Ok(())
    }

    async fn get(&self, table: &str, key: &str) -> Result<Option<String>, StoreError> {
        self.with_table(table, |entries| entries.get(key).cloned())
    }

    async fn put(&self, table: &str, key: &str, value: String) -> Result<(), StoreError> {
        self.with_table(table, |entries| {
            entries.insert(key.to_string(), value);
        })
    }

    async fn clear(&self, table: &str) -> Result<(), StoreError> {
        self.with_table(table, HashMap::clear)
    }
}

/// Position of a durable write in the order it was requested.
///
/// Tickets are handed out synchronously, so a write spawned onto another
/// task keeps the place it had when it was scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct WriteTicket(u64);

#[derive(Default)]
struct WriteOrder {
    next: AtomicU64,
    /// Highest ticket that reached the store; held for the whole write.
    applied: tokio::sync::Mutex<u64>,
}

/// Typed access to the timeline table over any [`KeyValueStore`].
///
/// Puts and clears go through one writer lock and are applied in ticket
/// order. A write whose ticket is older than one already applied is dropped.
#[derive(Clone)]
pub struct PersistenceCache {
    store: Arc<dyn KeyValueStore>,
    order: Arc<WriteOrder>,
}

enum Write<'a> {
    Put { key: &'a str, raw: String },
    Clear,
}

impl PersistenceCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            order: Arc::new(WriteOrder::default()),
        }
    }

    pub fn file_backed(data_dir: &Path) -> Self {
        Self::new(Arc::new(FileStore::new(data_dir)))
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Reserve the next place in the write order.
    pub fn reserve_write(&self) -> WriteTicket {
        WriteTicket(self.order.next.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub async fn open(&self) -> Result<(), StoreError> {
        self.store.open(TABLE_NAME).await
    }

    /// `Ok(None)` when nothing was ever written under `key`.
    pub async fn get(&self, key: &str) -> Result<Option<Vec<TweetRecord>>, StoreError> {
        let Some(raw) = self.store.get(TABLE_NAME, key).await? else {
            return Ok(None);
        };
        let records = serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt {
            key: key.to_string(),
            source,
        })?;
        Ok(Some(records))
    }

    pub async fn put(&self, key: &str, records: &[TweetRecord]) -> Result<(), StoreError> {
        let ticket = self.reserve_write();
        self.put_ordered(ticket, key, records).await.map(|_| ())
    }

    /// Write under `ticket`. Returns `Ok(false)` when a later write already
    /// landed and this one was dropped.
    pub async fn put_ordered(
        &self,
        ticket: WriteTicket,
        key: &str,
        records: &[TweetRecord],
    ) -> Result<bool, StoreError> {
        let raw = serde_json::to_string(records).map_err(|source| StoreError::Serialize {
            key: key.to_string(),
            source,
        })?;
        let applied = self.apply(ticket, Write::Put { key, raw }).await?;
        if applied {
            tracing::debug!(key, count = records.len(), "cached timeline");
        }
        Ok(applied)
    }

    pub async fn clear(&self) -> Result<(), StoreError> {
        let ticket = self.reserve_write();
        self.apply(ticket, Write::Clear).await.map(|_| ())
    }

    async fn apply(&self, ticket: WriteTicket, write: Write<'_>) -> Result<bool, StoreError> {
        let mut applied = self.order.applied.lock().await;
        if ticket.0 <= *applied {
            tracing::debug!(ticket = ticket.0, applied = *applied, "dropping superseded write");
            return Ok(false);
        }
        // Claim the slot even if the write fails, so older writes stay dropped.
        *applied = ticket.0;
        match write {
            Write::Put { key, raw } => self.store.put(TABLE_NAME, key, raw).await?,
            Write::Clear => self.store.clear(TABLE_NAME).await?,
        }
        Ok(true)
    }

    /// Open the table and read the timeline key.
    pub async fn load_timeline(&self) -> Result<Option<Vec<TweetRecord>>, StoreError> {
        self.open().await?;
        self.get(TIMELINE_KEY).await
    }

    /// Open the table and overwrite the timeline key.
    pub async fn save_timeline(&self, records: &[TweetRecord]) -> Result<(), StoreError> {
        let ticket = self.reserve_write();
        self.save_timeline_ordered(ticket, records).await.map(|_| ())
    }

    /// [`save_timeline`](Self::save_timeline) under a ticket reserved earlier.
    pub async fn save_timeline_ordered(
        &self,
        ticket: WriteTicket,
        records: &[TweetRecord],
    ) -> Result<bool, StoreError> {
        self.open().await?;
        self.put_ordered(ticket, TIMELINE_KEY, records).await
    }
}
