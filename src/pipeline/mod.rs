//! Pipeline core: transition guard, run tracking, step execution, and
//! re-enrich reconciliation.

mod executor;
mod flags;
mod guard;
mod reenrich;
mod runs;

pub use executor::{ReenrichStarted, StepExecutor, StepResult};
pub use flags::{compute_review_flags, ReviewFlags};
pub use guard::{Decision, TransitionGuard};
pub use reenrich::{ReenrichResolver, Resolved};
pub use runs::RunTracker;

use thiserror::Error;

use crate::repository::StorageError;

/// Errors surfaced by pipeline operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Unknown status name or code: a deployment/schema mismatch, never a
    /// user error. Must reach operators, not be swallowed.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Transition guard denial without override; a user-facing rejection.
    #[error("invalid transition {from} -> {to}: {reason}")]
    InvalidTransition { from: i32, to: i32, reason: String },

    /// Remote step-execution service unreachable or returned malformed
    /// output. Retryable by the caller; never retried here.
    #[error("step service unavailable: {message}")]
    ServiceUnavailable {
        status: Option<u16>,
        message: String,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl PipelineError {
    pub fn not_found(entity: &'static str, id: &str) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
