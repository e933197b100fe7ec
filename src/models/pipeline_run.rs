//! Pipeline runs: one tracked execution attempt per row.
//!
//! Runs form an append-only audit trail. At most one run per queue item may
//! be `running` at any time; older attempts are cancelled before a new one
//! starts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What caused a pipeline run to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunTrigger {
    Discovery,
    Manual,
    #[serde(rename = "re-enrich")]
    Reenrich,
    Retry,
}

impl RunTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discovery => "discovery",
            Self::Manual => "manual",
            Self::Reenrich => "re-enrich",
            Self::Retry => "retry",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "discovery" => Some(Self::Discovery),
            "manual" => Some(Self::Manual),
            "re-enrich" => Some(Self::Reenrich),
            "retry" => Some(Self::Retry),
            _ => None,
        }
    }
}

/// Lifecycle state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Terminal outcome reported when a run finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Failed,
}

impl RunOutcome {
    pub fn as_status(&self) -> RunStatus {
        match self {
            Self::Completed => RunStatus::Completed,
            Self::Failed => RunStatus::Failed,
        }
    }
}

/// One execution attempt of the enrichment pipeline for one item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: String,
    pub queue_id: String,
    pub trigger: RunTrigger,
    pub status: RunStatus,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl PipelineRun {
    /// Create a new running attempt.
    pub fn new(queue_id: &str, trigger: RunTrigger, created_by: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            queue_id: queue_id.to_string(),
            trigger,
            status: RunStatus::Running,
            created_by: created_by.to_string(),
            created_at: Utc::now(),
            completed_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_round_trip() {
        for trigger in [
            RunTrigger::Discovery,
            RunTrigger::Manual,
            RunTrigger::Reenrich,
            RunTrigger::Retry,
        ] {
            assert_eq!(RunTrigger::from_str(trigger.as_str()), Some(trigger));
        }
        assert_eq!(RunTrigger::from_str("re-tag"), None);
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            RunStatus::Running,
            RunStatus::Completed,
            RunStatus::Cancelled,
            RunStatus::Failed,
        ] {
            assert_eq!(RunStatus::from_str(status.as_str()), Some(status));
        }
    }

    #[test]
    fn test_new_run_is_running() {
        let run = PipelineRun::new("q1", RunTrigger::Reenrich, "system");
        assert_eq!(run.status, RunStatus::Running);
        assert!(run.completed_at.is_none());
    }
}
