//! Step executor: dispatches single enrichment steps and full re-enrichment.
//!
//! The executor owns the ordering that keeps state coherent: the run record
//! is superseded before the queue row is touched, and the queue row is
//! written before the remote worker is called. The remote response passes
//! through verbatim; only transport failures are rewrapped.

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use crate::agent::StepService;
use crate::models::{EnrichStep, Phase, RunTrigger};
use crate::registry::{NamedCodes, StatusRegistry};
use crate::repository::QueueRepository;

use super::{PipelineError, ReenrichResolver, Result, RunTracker, TransitionGuard};

/// Outcome of dispatching a step to the remote agent.
#[derive(Debug)]
pub enum StepResult {
    /// The agent answered; its status and body are relayed unchanged.
    Completed { status: u16, body: Value },
    /// The agent was unreachable or returned something unusable. The queue
    /// row and run record were already written; the worker may still pick
    /// the item up, so the caller decides whether to retry.
    ServiceUnavailable {
        status: Option<u16>,
        message: String,
    },
}

/// Result of kicking off a full re-enrichment.
#[derive(Debug)]
pub struct ReenrichStarted {
    pub queue_id: String,
    pub run_id: String,
}

/// Coordinates queue updates, run tracking, and remote dispatch for
/// enrichment work.
pub struct StepExecutor {
    queue: Arc<QueueRepository>,
    tracker: RunTracker,
    resolver: ReenrichResolver,
    guard: TransitionGuard,
    registry: Arc<StatusRegistry>,
    codes: NamedCodes,
    agent: Arc<dyn StepService>,
}

impl StepExecutor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        queue: Arc<QueueRepository>,
        tracker: RunTracker,
        resolver: ReenrichResolver,
        guard: TransitionGuard,
        registry: Arc<StatusRegistry>,
        codes: NamedCodes,
        agent: Arc<dyn StepService>,
    ) -> Self {
        Self {
            queue,
            tracker,
            resolver,
            guard,
            registry,
            codes,
            agent,
        }
    }

    /// Run a single enrichment step against an item.
    ///
    /// Items still in the enrichment phase are moved to the step's queued
    /// status so the worker resumes the linear progression afterwards.
    /// Items already in review or published keep their status untouched;
    /// override hints tell the worker to land back at pending_review.
    pub async fn run_step(
        &self,
        step: EnrichStep,
        item_id: &str,
        actor: &str,
    ) -> Result<StepResult> {
        let resolved = self.resolver.resolve(item_id)?;
        let mut item = resolved.item;
        let queue_id = resolved.queue_id;

        let phase = self
            .registry
            .phase_of(item.status_code)
            .ok_or_else(|| {
                PipelineError::Configuration(format!("unknown status code: {}", item.status_code))
            })?;

        if phase == Phase::Enrichment {
            item.status_code = self.registry.code_for(step.queued_status_name())?;
            item.hints.return_status = None;
            item.hints.manual_override = false;
        } else {
            // Past enrichment: leave status_code alone and route the worker
            // back to review when the step finishes.
            item.hints.return_status = Some(self.codes.pending_review);
            item.hints.manual_override = true;
        }
        item.hints.single_step = Some(step.as_str().to_string());

        // Cancel-then-start must land before the queue mutation.
        let run_id = self.tracker.start_run(&queue_id, RunTrigger::Reenrich, actor)?;
        item.current_run_id = Some(run_id.clone());
        self.queue.update(&item)?;

        info!(queue_id = %queue_id, step = step.as_str(), run_id = %run_id,
            "dispatching single enrichment step");

        match self.agent.execute(&queue_id, step).await {
            Ok(response) => Ok(StepResult::Completed {
                status: response.status,
                body: response.body,
            }),
            Err(PipelineError::ServiceUnavailable { status, message }) => {
                warn!(queue_id = %queue_id, run_id = %run_id, %message,
                    "step service unavailable, marking run failed");
                self.tracker
                    .complete_run(&run_id, crate::models::RunOutcome::Failed)?;
                Ok(StepResult::ServiceUnavailable { status, message })
            }
            Err(other) => Err(other),
        }
    }

    /// Reset an item for a full re-enrichment pass.
    ///
    /// The item goes back to pending_enrichment. Anything but the trivial
    /// cases is a backward jump, so the reset goes through the guard as a
    /// deliberate override; published items additionally get worker hints
    /// so they land back at review instead of resuming the linear
    /// progression.
    pub fn reenrich(&self, item_id: &str, actor: &str) -> Result<ReenrichStarted> {
        let resolved = self.resolver.resolve(item_id)?;
        let mut item = resolved.item;
        let queue_id = resolved.queue_id;

        let phase = self
            .registry
            .phase_of(item.status_code)
            .ok_or_else(|| {
                PipelineError::Configuration(format!("unknown status code: {}", item.status_code))
            })?;

        self.guard
            .check(item.status_code, self.codes.pending_enrichment, true)?;

        let was_published = phase == Phase::Published;
        item.status_code = self.codes.pending_enrichment;
        item.hints.single_step = None;
        item.hints.manual_override = was_published;
        item.hints.return_status = was_published.then_some(self.codes.pending_review);

        let run_id = self.tracker.start_run(&queue_id, RunTrigger::Reenrich, actor)?;
        item.current_run_id = Some(run_id.clone());
        self.queue.update(&item)?;

        info!(queue_id = %queue_id, run_id = %run_id, was_published,
            "started full re-enrichment");

        Ok(ReenrichStarted { queue_id, run_id })
    }
}
