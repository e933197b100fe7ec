//! End-to-end pipeline flow tests against a temporary SQLite database and a
//! stubbed step service.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use tempfile::tempdir;

use curator::agent::{AgentResponse, StepService};
use curator::config::Settings;
use curator::context::PipelineContext;
use curator::models::{EnrichStep, Publication, QueueItem, RunStatus};
use curator::pipeline::{compute_review_flags, PipelineError, StepResult};

struct RecordingService {
    calls: Mutex<Vec<(String, EnrichStep)>>,
}

impl RecordingService {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl StepService for RecordingService {
    async fn execute(
        &self,
        item_id: &str,
        step: EnrichStep,
    ) -> Result<AgentResponse, PipelineError> {
        self.calls.lock().unwrap().push((item_id.to_string(), step));
        Ok(AgentResponse {
            status: 200,
            body: json!({"accepted": true}),
        })
    }
}

fn open(agent: Arc<dyn StepService>) -> (tempfile::TempDir, PipelineContext) {
    let dir = tempdir().unwrap();
    let settings = Settings {
        data_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    let ctx = PipelineContext::open_with_agent(&settings, agent).unwrap();
    (dir, ctx)
}

#[tokio::test]
async fn step_on_pending_item_advances_to_queued_status() {
    let agent = RecordingService::new();
    let (_dir, ctx) = open(agent.clone());

    let item = QueueItem::new("https://example.com/article", ctx.codes.pending_enrichment);
    ctx.queue.insert(&item).unwrap();

    let result = ctx
        .executor
        .run_step(EnrichStep::Summarize, &item.id, "test")
        .await
        .unwrap();
    assert!(matches!(result, StepResult::Completed { status: 200, .. }));

    let updated = ctx.queue.get(&item.id).unwrap().unwrap();
    assert_eq!(
        updated.status_code,
        ctx.registry.code_for("to_summarize").unwrap()
    );
    assert!(!updated.hints.manual_override);
    assert_eq!(updated.hints.return_status, None);
    assert_eq!(updated.hints.single_step.as_deref(), Some("summarize"));

    let calls = agent.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0], (item.id.clone(), EnrichStep::Summarize));
}

#[tokio::test]
async fn step_on_published_item_uses_hints_only() {
    let agent = RecordingService::new();
    let (_dir, ctx) = open(agent);

    let item = QueueItem::new("https://example.com/published", ctx.codes.published);
    ctx.queue.insert(&item).unwrap();

    ctx.executor
        .run_step(EnrichStep::Tag, &item.id, "test")
        .await
        .unwrap();

    let updated = ctx.queue.get(&item.id).unwrap().unwrap();
    assert_eq!(updated.status_code, ctx.codes.published);
    assert!(updated.hints.manual_override);
    assert_eq!(updated.hints.return_status, Some(ctx.codes.pending_review));

    // The stored payload carries the hint keys for the remote worker
    let payload = updated.payload_with_hints();
    assert_eq!(payload.get("_manual_override"), Some(&json!(true)));
    assert_eq!(
        payload.get("_return_status"),
        Some(&json!(ctx.codes.pending_review))
    );
}

#[tokio::test]
async fn publication_with_dead_origin_synthesizes_once() {
    let agent = RecordingService::new();
    let (_dir, ctx) = open(agent);

    let mut publication = Publication::new("Lost row", "https://example.com/lost");
    publication.origin_queue_id = Some("deleted-queue-row".to_string());
    ctx.publications.insert(&publication).unwrap();

    ctx.executor
        .run_step(EnrichStep::Thumbnail, &publication.id, "test")
        .await
        .unwrap();
    ctx.executor
        .run_step(EnrichStep::Thumbnail, &publication.id, "test")
        .await
        .unwrap();

    // One synthesized row, reusing the recorded origin id
    assert_eq!(ctx.queue.count().unwrap(), 1);
    let item = ctx.queue.get("deleted-queue-row").unwrap().unwrap();
    assert_eq!(item.url, "https://example.com/lost");
}

#[tokio::test]
async fn rapid_dispatches_leave_one_running_run() {
    let agent = RecordingService::new();
    let (_dir, ctx) = open(agent);

    let item = QueueItem::new("https://example.com/busy", ctx.codes.pending_enrichment);
    ctx.queue.insert(&item).unwrap();

    ctx.executor
        .run_step(EnrichStep::Summarize, &item.id, "test")
        .await
        .unwrap();
    ctx.executor
        .run_step(EnrichStep::Tag, &item.id, "test")
        .await
        .unwrap();
    let started = ctx.executor.reenrich(&item.id, "test").unwrap();

    assert_eq!(ctx.runs.running_count(&item.id).unwrap(), 1);
    let history = ctx.tracker.history(&item.id).unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].id, started.run_id);
    assert_eq!(history[0].status, RunStatus::Running);
    assert!(history[1..]
        .iter()
        .all(|run| run.status == RunStatus::Cancelled));
}

#[tokio::test]
async fn reenrich_published_item_resets_with_review_return() {
    let agent = RecordingService::new();
    let (_dir, ctx) = open(agent);

    let item = QueueItem::new("https://example.com/redo", ctx.codes.published);
    ctx.queue.insert(&item).unwrap();

    ctx.executor.reenrich(&item.id, "test").unwrap();

    let updated = ctx.queue.get(&item.id).unwrap().unwrap();
    assert_eq!(updated.status_code, ctx.codes.pending_enrichment);
    assert!(updated.hints.manual_override);
    assert_eq!(updated.hints.return_status, Some(ctx.codes.pending_review));
    assert_eq!(updated.hints.single_step, None);
}

#[tokio::test]
async fn guard_denies_backward_jump_and_accepts_override() {
    let agent = RecordingService::new();
    let (_dir, ctx) = open(agent);

    let to_tag = ctx.registry.code_for("to_tag").unwrap();
    let err = ctx
        .guard
        .check(ctx.codes.enriched, to_tag, false)
        .unwrap_err();
    match err {
        PipelineError::InvalidTransition { reason, .. } => {
            assert!(reason.contains("legal next states"), "{reason}");
        }
        other => panic!("expected invalid transition, got {other}"),
    }
    assert!(ctx.guard.check(ctx.codes.enriched, to_tag, true).is_ok());

    // Scenario: resurrecting a failed item is an explicit override
    assert!(ctx
        .guard
        .check(ctx.codes.failed, ctx.codes.pending_enrichment, false)
        .is_err());
    assert!(ctx
        .guard
        .check(ctx.codes.failed, ctx.codes.pending_enrichment, true)
        .is_ok());
}

#[tokio::test]
async fn flags_follow_status_progression() {
    let agent = RecordingService::new();
    let (_dir, ctx) = open(agent);

    let review = compute_review_flags(ctx.codes.pending_review, &ctx.codes);
    assert!(review.show_approve_reject);
    assert!(review.is_editable);

    let published = compute_review_flags(ctx.codes.published, &ctx.codes);
    assert!(!published.is_editable);
    assert!(published.show_reenrich);
    assert!(published.show_approved_note);
}

#[tokio::test]
async fn status_table_survives_reopen() {
    let dir = tempdir().unwrap();
    let settings = Settings {
        data_dir: dir.path().to_path_buf(),
        ..Default::default()
    };

    let first = PipelineContext::open_with_agent(&settings, RecordingService::new()).unwrap();
    let count = first.registry.entries().count();
    drop(first);

    let second = PipelineContext::open_with_agent(&settings, RecordingService::new()).unwrap();
    assert_eq!(second.registry.entries().count(), count);
    assert_eq!(second.codes.dead_letter, 550);
}
