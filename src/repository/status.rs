//! Status lookup repository.
//!
//! The status table is a small versioned configuration artifact: seeded
//! before first use, read once per process, additive-only afterwards.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, Row};

use super::{connect, Result, StorageError};
use crate::models::{Phase, StatusEntry};

/// SQLite-backed repository for the status lookup table.
pub struct StatusLookupRepository {
    db_path: PathBuf,
}

impl StatusLookupRepository {
    /// Create a new status lookup repository, initializing the schema.
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
            CREATE TABLE IF NOT EXISTS status_lookup (
                code INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                phase TEXT NOT NULL,
                is_terminal INTEGER NOT NULL DEFAULT 0
            );
            "#,
        )?;
        Ok(())
    }

    /// Seed entries, skipping codes that already exist (additive-only).
    ///
    /// Returns the number of rows inserted.
    pub fn seed(&self, entries: &[StatusEntry]) -> Result<usize> {
        let conn = self.connect()?;
        let mut inserted = 0;
        for entry in entries {
            inserted += conn.execute(
                "INSERT OR IGNORE INTO status_lookup (code, name, phase, is_terminal)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    entry.code,
                    entry.name,
                    entry.phase.as_str(),
                    entry.is_terminal as i32
                ],
            )?;
        }
        Ok(inserted)
    }

    /// Load the full table in code order.
    pub fn load(&self) -> Result<Vec<StatusEntry>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT code, name, phase, is_terminal FROM status_lookup ORDER BY code",
        )?;
        let rows = stmt.query_map([], entry_from_row)?;
        let mut entries = Vec::new();
        for row in rows {
            let (code, name, phase, is_terminal) = row?;
            let phase = Phase::from_str(&phase).ok_or_else(|| {
                StorageError::Corrupt(format!("status {code} has unknown phase: {phase}"))
            })?;
            entries.push(StatusEntry {
                code,
                name,
                phase,
                is_terminal,
            });
        }
        Ok(entries)
    }
}

fn entry_from_row(row: &Row) -> rusqlite::Result<(i32, String, String, bool)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}
