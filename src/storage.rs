//! Bounded history of analysis results.
//!
//! The whole history lives in one named slot and is rewritten on every
//! mutation. Persistence failures are logged and never roll back the
//! in-memory state.

use anyhow::{anyhow, Result};
use chrono::{Local, Utc};
use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::detect::DetectionResult;

/// Maximum number of retained history items.
pub const HISTORY_CAPACITY: usize = 50;

pub const DEFAULT_HISTORY_SLOT: &str = "particle_history";

const HISTORY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Snapshot of one saved analysis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub id: String,
    /// Local wall-clock time of the save, human readable.
    pub timestamp: String,
    pub result: DetectionResult,
    /// Raw image payload as captured or uploaded (typically a data URL).
    pub image: String,
    pub filename: String,
}

/// Durable storage for the serialized history. One slot, overwritten
/// wholesale.
pub trait HistoryPersistence {
    /// Read the stored blob, if any.
    fn load(&mut self) -> Result<Option<String>>;

    fn save(&mut self, blob: &str) -> Result<()>;

    /// Drop the stored blob entirely.
    fn remove(&mut self) -> Result<()>;
}

/// History of results, most recent first.
pub struct HistoryStore<P: HistoryPersistence> {
    items: Vec<HistoryItem>,
    persistence: P,
}

impl<P: HistoryPersistence> HistoryStore<P> {
    /// Hydrate from persistence. Unreadable or corrupt data yields an empty
    /// store.
    pub fn open(mut persistence: P) -> Self {
        let items = match persistence.load() {
            Ok(Some(blob)) => match serde_json::from_str::<Vec<HistoryItem>>(&blob) {
                Ok(mut items) => {
                    items.truncate(HISTORY_CAPACITY);
                    items
                }
                Err(e) => {
                    log::warn!("discarding corrupt history blob: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                log::warn!("failed to load history: {}", e);
                Vec::new()
            }
        };
        log::debug!("history hydrated with {} items", items.len());
        Self { items, persistence }
    }

    /// Save a result at the front of the history, evicting the oldest
    /// entries beyond capacity.
    pub fn append(
        &mut self,
        result: DetectionResult,
        image: String,
        filename: String,
    ) -> &HistoryItem {
        let item = HistoryItem {
            id: next_history_id(),
            timestamp: Local::now().format(HISTORY_TIMESTAMP_FORMAT).to_string(),
            result,
            image,
            filename,
        };
        log::info!("saving analysis {} ({}) to history", item.id, item.filename);
        self.items.insert(0, item);
        self.items.truncate(HISTORY_CAPACITY);
        self.persist();
        &self.items[0]
    }

    /// Remove the item with `id`. Unknown ids are a no-op.
    pub fn remove(&mut self, id: &str) -> bool {
        let Some(pos) = self.items.iter().position(|item| item.id == id) else {
            return false;
        };
        self.items.remove(pos);
        self.persist();
        true
    }

    pub fn clear(&mut self) {
        self.items.clear();
        if let Err(e) = self.persistence.remove() {
            log::warn!("failed to remove persisted history: {}", e);
        }
    }

    /// Zero-based page of `size` items. Pages past the end are empty.
    pub fn page(&self, n: usize, size: usize) -> &[HistoryItem] {
        let Some(start) = n.checked_mul(size) else {
            return &[];
        };
        if size == 0 || start >= self.items.len() {
            return &[];
        }
        let end = start.saturating_add(size).min(self.items.len());
        &self.items[start..end]
    }

    pub fn page_count(&self, size: usize) -> usize {
        if size == 0 {
            return 0;
        }
        self.items.len().div_ceil(size)
    }

    pub fn get(&self, id: &str) -> Option<&HistoryItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn items(&self) -> &[HistoryItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    fn persist(&mut self) {
        let blob = match serde_json::to_string(&self.items) {
            Ok(blob) => blob,
            Err(e) => {
                log::warn!("failed to serialize history: {}", e);
                return;
            }
        };
        if let Err(e) = self.persistence.save(&blob) {
            log::warn!("failed to persist history: {}", e);
        }
    }
}

/// Millisecond timestamp plus a random suffix.
fn next_history_id() -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix: u32 = rand::thread_rng().gen();
    format!("{}-{:08x}", millis, suffix)
}

/// SQLite-backed slot table.
pub struct SqliteHistoryPersistence {
    conn: Connection,
    slot: String,
}

impl SqliteHistoryPersistence {
    pub fn open(db_path: &str, slot: &str) -> Result<Self> {
        if slot.trim().is_empty() {
            return Err(anyhow!("history slot name cannot be empty"));
        }
        let conn = Connection::open(db_path)?;
        let mut store = Self {
            conn,
            slot: slot.to_string(),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    fn ensure_schema(&mut self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;

            CREATE TABLE IF NOT EXISTS slots (
              name TEXT PRIMARY KEY,
              payload TEXT NOT NULL,
              updated_at INTEGER NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    pub fn slot(&self) -> &str {
        &self.slot
    }
}

impl HistoryPersistence for SqliteHistoryPersistence {
    fn load(&mut self) -> Result<Option<String>> {
        let payload = self
            .conn
            .query_row(
                "SELECT payload FROM slots WHERE name = ?1",
                params![self.slot],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(payload)
    }

    fn save(&mut self, blob: &str) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO slots(name, payload, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(name) DO UPDATE SET
              payload = excluded.payload,
              updated_at = excluded.updated_at
            "#,
            params![self.slot, blob, Utc::now().timestamp()],
        )?;
        Ok(())
    }

    fn remove(&mut self) -> Result<()> {
        self.conn
            .execute("DELETE FROM slots WHERE name = ?1", params![self.slot])?;
        Ok(())
    }
}

/// In-memory slot for tests and ephemeral sessions.
#[derive(Clone, Debug, Default)]
pub struct InMemoryHistoryPersistence {
    blob: Option<String>,
    fail_writes: bool,
    writes: usize,
}

impl InMemoryHistoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an existing blob, as if written by an earlier session.
    pub fn seeded(blob: impl Into<String>) -> Self {
        Self {
            blob: Some(blob.into()),
            ..Self::default()
        }
    }

    /// Make every subsequent `save`/`remove` fail.
    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn blob(&self) -> Option<&str> {
        self.blob.as_deref()
    }

    /// Number of successful writes.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl HistoryPersistence for InMemoryHistoryPersistence {
    fn load(&mut self) -> Result<Option<String>> {
        Ok(self.blob.clone())
    }

    fn save(&mut self, blob: &str) -> Result<()> {
        if self.fail_writes {
            return Err(anyhow!("history slot is read-only"));
        }
        self.blob = Some(blob.to_string());
        self.writes += 1;
        Ok(())
    }

    fn remove(&mut self) -> Result<()> {
        if self.fail_writes {
            return Err(anyhow!("history slot is read-only"));
        }
        self.blob = None;
        self.writes += 1;
        Ok(())
    }
}
