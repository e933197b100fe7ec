//! Repository layer for SQLite persistence.
//!
//! Repositories hold a database path and open a connection per call. Each
//! repository owns its table and creates it on construction. The partial
//! unique index on running pipeline runs and the unique index on normalized
//! URLs back the invariants the pipeline layer relies on.

mod publication;
mod queue;
mod runs;
mod status;

pub use publication::PublicationRepository;
pub use queue::QueueRepository;
pub use runs::RunRepository;
pub use status::StatusLookupRepository;

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use thiserror::Error;

/// Errors surfaced by the repository layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A unique constraint was violated on insert. The detail names the
    /// constrained column so callers can recover from specific races.
    #[error("unique constraint violated: {detail}")]
    ConstraintViolation { detail: String },

    #[error("stored value is corrupt: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Open a connection to the database file.
pub(crate) fn connect(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "busy_timeout", 5000)?;
    Ok(conn)
}

/// Map an insert error, surfacing unique-constraint violations distinctly.
pub(crate) fn map_constraint(err: rusqlite::Error) -> StorageError {
    match err {
        rusqlite::Error::SqliteFailure(ffi, message)
            if ffi.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StorageError::ConstraintViolation {
                detail: message.unwrap_or_else(|| "constraint violation".to_string()),
            }
        }
        other => StorageError::Sqlite(other),
    }
}

/// Parse a datetime string from the database, defaulting to Unix epoch on error.
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Parse an optional datetime string from the database.
pub(crate) fn parse_datetime_opt(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    })
}
