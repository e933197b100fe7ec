//! Ingestion queue repository.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::{Map, Value};

use super::{connect, map_constraint, parse_datetime, Result, StorageError};
use crate::models::{PipelineHints, QueueItem};

/// SQLite-backed repository for queue items.
pub struct QueueRepository {
    db_path: PathBuf,
}

impl QueueRepository {
    /// Create a new queue repository, initializing the schema.
    pub fn new(db_path: &Path) -> Result<Self> {
        let repo = Self {
            db_path: db_path.to_path_buf(),
        };
        repo.init_schema()?;
        Ok(repo)
    }

    fn connect(&self) -> Result<Connection> {
        connect(&self.db_path)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS ingestion_queue (
                id TEXT PRIMARY KEY,
                url TEXT NOT NULL,
                url_norm TEXT NOT NULL,
                status_code INTEGER NOT NULL,
                payload TEXT NOT NULL DEFAULT '{}',
                current_run_id TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            -- One queue row per normalized URL. The re-enrich resolver
            -- depends on this to recover from concurrent synthesis.
            CREATE UNIQUE INDEX IF NOT EXISTS idx_queue_url_norm
                ON ingestion_queue(url_norm);

            CREATE INDEX IF NOT EXISTS idx_queue_status
                ON ingestion_queue(status_code);
            "#,
        )?;
        Ok(())
    }

    /// Fetch a queue item by id.
    pub fn get(&self, id: &str) -> Result<Option<QueueItem>> {
        let conn = self.connect()?;
        let row = conn
            .query_row(
                "SELECT id, url, status_code, payload, current_run_id, created_at, updated_at
                 FROM ingestion_queue WHERE id = ?1",
                params![id],
                item_from_row,
            )
            .optional()?;
        row.map(raw_to_item).transpose()
    }

    /// Insert a new queue item.
    ///
    /// Returns `StorageError::ConstraintViolation` when the id or normalized
    /// URL collides with an existing row.
    pub fn insert(&self, item: &QueueItem) -> Result<()> {
        let conn = self.connect()?;
        let payload = serialize_payload(item)?;
        conn.execute(
            "INSERT INTO ingestion_queue
                (id, url, url_norm, status_code, payload, current_run_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                item.id,
                item.url,
                item.normalized_url(),
                item.status_code,
                payload,
                item.current_run_id,
                item.created_at.to_rfc3339(),
                item.updated_at.to_rfc3339(),
            ],
        )
        .map_err(map_constraint)?;
        Ok(())
    }

    /// Write the mutable fields of a queue item back to storage.
    pub fn update(&self, item: &QueueItem) -> Result<()> {
        let conn = self.connect()?;
        let payload = serialize_payload(item)?;
        conn.execute(
            "UPDATE ingestion_queue
             SET status_code = ?2, payload = ?3, current_run_id = ?4, updated_at = ?5
             WHERE id = ?1",
            params![
                item.id,
                item.status_code,
                payload,
                item.current_run_id,
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Look up a queue id by normalized URL (race-recovery path).
    pub fn find_id_by_url_norm(&self, url_norm: &str) -> Result<Option<String>> {
        let conn = self.connect()?;
        let id = conn
            .query_row(
                "SELECT id FROM ingestion_queue WHERE url_norm = ?1",
                params![url_norm],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    /// Count all queue items (diagnostics).
    pub fn count(&self) -> Result<i64> {
        let conn = self.connect()?;
        let count = conn.query_row("SELECT COUNT(*) FROM ingestion_queue", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Delete a queue item by id. Returns true when a row was removed.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let conn = self.connect()?;
        let changed = conn.execute("DELETE FROM ingestion_queue WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }
}

/// Raw column values before JSON decoding.
struct RawItem {
    id: String,
    url: String,
    status_code: i32,
    payload: String,
    current_run_id: Option<String>,
    created_at: String,
    updated_at: String,
}

fn item_from_row(row: &Row) -> rusqlite::Result<RawItem> {
    Ok(RawItem {
        id: row.get(0)?,
        url: row.get(1)?,
        status_code: row.get(2)?,
        payload: row.get(3)?,
        current_run_id: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn raw_to_item(raw: RawItem) -> Result<QueueItem> {
    let value: Value = serde_json::from_str(&raw.payload)
        .map_err(|e| StorageError::Corrupt(format!("queue payload for {}: {e}", raw.id)))?;
    let mut payload = match value {
        Value::Object(map) => map,
        other => {
            return Err(StorageError::Corrupt(format!(
                "queue payload for {} is not an object: {other}",
                raw.id
            )))
        }
    };
    let hints = PipelineHints::extract(&mut payload);
    Ok(QueueItem {
        id: raw.id,
        url: raw.url,
        status_code: raw.status_code,
        payload,
        hints,
        current_run_id: raw.current_run_id,
        created_at: parse_datetime(&raw.created_at),
        updated_at: parse_datetime(&raw.updated_at),
    })
}

fn serialize_payload(item: &QueueItem) -> Result<String> {
    let merged: Map<String, Value> = item.payload_with_hints();
    serde_json::to_string(&Value::Object(merged))
        .map_err(|e| StorageError::Corrupt(format!("queue payload for {}: {e}", item.id)))
}
