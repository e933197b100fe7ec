//! Run tracker: lifecycle management for pipeline run records.
//!
//! Cancelling before starting is what keeps the single-active-run invariant
//! under fast sequential requests; truly concurrent starts are caught by the
//! storage layer's partial unique index on running runs.

use std::sync::Arc;

use tracing::{debug, info};

use crate::models::{PipelineRun, RunOutcome, RunTrigger};
use crate::repository::RunRepository;

use super::Result;

/// Manages pipeline run records, enforcing at most one running attempt per
/// queue item.
pub struct RunTracker {
    runs: Arc<RunRepository>,
}

impl RunTracker {
    pub fn new(runs: Arc<RunRepository>) -> Self {
        Self { runs }
    }

    /// Start a new run for an item, cancelling any running attempt first.
    ///
    /// The cancel must succeed before the insert is issued; a cancel failure
    /// aborts the caller's operation so a dangling running record is never
    /// mistaken for an active attempt later.
    pub fn start_run(&self, queue_id: &str, trigger: RunTrigger, actor: &str) -> Result<String> {
        let cancelled = self.cancel_running(queue_id)?;
        if cancelled > 0 {
            info!(queue_id, cancelled, "superseded running pipeline run");
        }
        let run = PipelineRun::new(queue_id, trigger, actor);
        self.runs.insert(&run)?;
        debug!(queue_id, run_id = %run.id, trigger = trigger.as_str(), "started pipeline run");
        Ok(run.id)
    }

    /// Cancel any running attempt for an item. Idempotent.
    pub fn cancel_running(&self, queue_id: &str) -> Result<usize> {
        Ok(self.runs.cancel_running(queue_id)?)
    }

    /// Mark a run finished. Called on behalf of the remote worker; tolerates
    /// racing a newer `start_run` because run history is append-only.
    pub fn complete_run(&self, run_id: &str, outcome: RunOutcome) -> Result<bool> {
        Ok(self.runs.complete(run_id, outcome.as_status())?)
    }

    /// Run history for an item, newest first.
    pub fn history(&self, queue_id: &str) -> Result<Vec<PipelineRun>> {
        Ok(self.runs.list_for_queue(queue_id)?)
    }
}
