//! Pipeline run repository.
//!
//! Run rows are an append-only audit trail; only `status` and
//! `completed_at` ever change after insert. A partial unique index enforces
//! the single-running-run invariant at the storage layer, so two truly
//! concurrent starts cannot both commit a `running` row.

use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::{params, Connection, Row};

use super::{connect, map_constraint, parse_datetime, parse_datetime_opt, Result, StorageError};
use crate::models::{PipelineRun, RunStatus, RunTrigger};

/// SQLite-backed repository for pipeline runs.
pub struct RunRepository {
    db_path: PathBuf,
}

impl RunRepository {
    /// Create a new run repository, initializing the schema.
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
            CREATE TABLE IF NOT EXISTS pipeline_run (
                id TEXT PRIMARY KEY,
                queue_id TEXT NOT NULL,
                "trigger" TEXT NOT NULL,
                status TEXT NOT NULL,
                created_by TEXT NOT NULL,
                created_at TEXT NOT NULL,
                completed_at TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_run_queue
                ON pipeline_run(queue_id);

            -- At most one running attempt per item
            CREATE UNIQUE INDEX IF NOT EXISTS idx_run_single_running
                ON pipeline_run(queue_id) WHERE status = 'running';
            "#,
        )?;
        Ok(())
    }

    /// Insert a new run row.
    pub fn insert(&self, run: &PipelineRun) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            r#"INSERT INTO pipeline_run
                (id, queue_id, "trigger", status, created_by, created_at, completed_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
            params![
                run.id,
                run.queue_id,
                run.trigger.as_str(),
                run.status.as_str(),
                run.created_by,
                run.created_at.to_rfc3339(),
                run.completed_at.map(|dt| dt.to_rfc3339()),
            ],
        )
        .map_err(map_constraint)?;
        Ok(())
    }

    /// Cancel every running attempt for a queue item.
    ///
    /// Idempotent; returns the number of rows cancelled.
    pub fn cancel_running(&self, queue_id: &str) -> Result<usize> {
        let conn = self.connect()?;
        let changed = conn.execute(
            "UPDATE pipeline_run SET status = 'cancelled', completed_at = ?2
             WHERE queue_id = ?1 AND status = 'running'",
            params![queue_id, Utc::now().to_rfc3339()],
        )?;
        Ok(changed)
    }

    /// Mark a run finished with a terminal status.
    ///
    /// Returns false when the run id does not exist.
    pub fn complete(&self, run_id: &str, status: RunStatus) -> Result<bool> {
        let conn = self.connect()?;
        let changed = conn.execute(
            "UPDATE pipeline_run SET status = ?2, completed_at = ?3 WHERE id = ?1",
            params![run_id, status.as_str(), Utc::now().to_rfc3339()],
        )?;
        Ok(changed > 0)
    }

    /// Run history for a queue item, newest first.
    pub fn list_for_queue(&self, queue_id: &str) -> Result<Vec<PipelineRun>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            r#"SELECT id, queue_id, "trigger", status, created_by, created_at, completed_at
               FROM pipeline_run WHERE queue_id = ?1
               ORDER BY created_at DESC, id DESC"#,
        )?;
        let rows = stmt.query_map(params![queue_id], run_from_row)?;
        let mut runs = Vec::new();
        for row in rows {
            runs.push(row?.try_into_run()?);
        }
        Ok(runs)
    }

    /// Number of running attempts for a queue item.
    pub fn running_count(&self, queue_id: &str) -> Result<i64> {
        let conn = self.connect()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM pipeline_run WHERE queue_id = ?1 AND status = 'running'",
            params![queue_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

struct RawRun {
    id: String,
    queue_id: String,
    trigger: String,
    status: String,
    created_by: String,
    created_at: String,
    completed_at: Option<String>,
}

impl RawRun {
    fn try_into_run(self) -> Result<PipelineRun> {
        let trigger = RunTrigger::from_str(&self.trigger).ok_or_else(|| {
            StorageError::Corrupt(format!("run {} has unknown trigger: {}", self.id, self.trigger))
        })?;
        let status = RunStatus::from_str(&self.status).ok_or_else(|| {
            StorageError::Corrupt(format!("run {} has unknown status: {}", self.id, self.status))
        })?;
        Ok(PipelineRun {
            id: self.id,
            queue_id: self.queue_id,
            trigger,
            status,
            created_by: self.created_by,
            created_at: parse_datetime(&self.created_at),
            completed_at: parse_datetime_opt(self.completed_at),
        })
    }
}

fn run_from_row(row: &Row) -> rusqlite::Result<RawRun> {
    Ok(RawRun {
        id: row.get(0)?,
        queue_id: row.get(1)?,
        trigger: row.get(2)?,
        status: row.get(3)?,
        created_by: row.get(4)?,
        created_at: row.get(5)?,
        completed_at: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn repo() -> (tempfile::TempDir, RunRepository) {
        let dir = tempdir().unwrap();
        let repo = RunRepository::new(&dir.path().join("test.db")).unwrap();
        (dir, repo)
    }

    #[test]
    fn test_insert_and_list() {
        let (_dir, repo) = repo();
        let run = PipelineRun::new("q1", RunTrigger::Manual, "tester");
        repo.insert(&run).unwrap();

        let runs = repo.list_for_queue("q1").unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].id, run.id);
        assert_eq!(runs[0].trigger, RunTrigger::Manual);
        assert_eq!(runs[0].status, RunStatus::Running);
    }

    #[test]
    fn test_cancel_running_is_idempotent() {
        let (_dir, repo) = repo();
        assert_eq!(repo.cancel_running("q1").unwrap(), 0);

        repo.insert(&PipelineRun::new("q1", RunTrigger::Reenrich, "tester"))
            .unwrap();
        assert_eq!(repo.cancel_running("q1").unwrap(), 1);
        assert_eq!(repo.cancel_running("q1").unwrap(), 0);
        assert_eq!(repo.running_count("q1").unwrap(), 0);
    }

    #[test]
    fn test_second_running_row_rejected_by_index() {
        let (_dir, repo) = repo();
        repo.insert(&PipelineRun::new("q1", RunTrigger::Discovery, "tester"))
            .unwrap();
        let err = repo
            .insert(&PipelineRun::new("q1", RunTrigger::Retry, "tester"))
            .unwrap_err();
        assert!(matches!(err, StorageError::ConstraintViolation { .. }));
    }

    #[test]
    fn test_complete_sets_terminal_status() {
        let (_dir, repo) = repo();
        let run = PipelineRun::new("q1", RunTrigger::Discovery, "tester");
        repo.insert(&run).unwrap();

        assert!(repo.complete(&run.id, RunStatus::Completed).unwrap());
        let runs = repo.list_for_queue("q1").unwrap();
        assert_eq!(runs[0].status, RunStatus::Completed);
        assert!(runs[0].completed_at.is_some());

        assert!(!repo.complete("missing", RunStatus::Failed).unwrap());
    }
}
