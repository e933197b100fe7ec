//! Publication repository.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{connect, map_constraint, Result};
use crate::models::Publication;

/// SQLite-backed repository for publications.
pub struct PublicationRepository {
    db_path: PathBuf,
}

impl PublicationRepository {
    /// Create a new publication repository, initializing the schema.
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
            CREATE TABLE IF NOT EXISTS publication (
                id TEXT PRIMARY KEY,
                origin_queue_id TEXT,
                title TEXT NOT NULL,
                source_url TEXT NOT NULL,
                published_at TEXT
            );
            "#,
        )?;
        Ok(())
    }

    /// Fetch a publication by id.
    pub fn get(&self, id: &str) -> Result<Option<Publication>> {
        let conn = self.connect()?;
        let row = conn
            .query_row(
                "SELECT id, origin_queue_id, title, source_url, published_at
                 FROM publication WHERE id = ?1",
                params![id],
                publication_from_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Insert a new publication.
    pub fn insert(&self, publication: &Publication) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO publication (id, origin_queue_id, title, source_url, published_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                publication.id,
                publication.origin_queue_id,
                publication.title,
                publication.source_url,
                publication.published_at,
            ],
        )
        .map_err(map_constraint)?;
        Ok(())
    }

    /// Back-fill the queue linkage on a publication.
    pub fn set_origin_queue_id(&self, publication_id: &str, queue_id: &str) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "UPDATE publication SET origin_queue_id = ?2 WHERE id = ?1",
            params![publication_id, queue_id],
        )?;
        Ok(())
    }
}

fn publication_from_row(row: &Row) -> rusqlite::Result<Publication> {
    Ok(Publication {
        id: row.get(0)?,
        origin_queue_id: row.get(1)?,
        title: row.get(2)?,
        source_url: row.get(3)?,
        published_at: row.get(4)?,
    })
}
