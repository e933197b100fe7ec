//! HTTP request handlers for the API server.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use crate::models::EnrichStep;
use crate::pipeline::{compute_review_flags, Decision, PipelineError, StepResult};

use super::AppState;

/// Pipeline errors translated to HTTP responses.
pub(crate) struct ApiError(PipelineError);

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        Self(err)
    }
}

impl From<crate::repository::StorageError> for ApiError {
    fn from(err: crate::repository::StorageError) -> Self {
        Self(PipelineError::Storage(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            PipelineError::NotFound { .. } => StatusCode::NOT_FOUND,
            PipelineError::InvalidTransition { .. } => StatusCode::CONFLICT,
            PipelineError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            PipelineError::Configuration(_) | PipelineError::Storage(_) => {
                error!(error = %self.0, "internal pipeline error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

fn default_actor() -> String {
    "api".to_string()
}

#[derive(Debug, Deserialize)]
pub struct EnrichStepRequest {
    pub id: String,
    pub step: String,
    #[serde(default = "default_actor")]
    pub actor: String,
}

/// Dispatch a single enrichment step; relays the agent's response.
pub async fn enrich_step(
    State(state): State<AppState>,
    Json(req): Json<EnrichStepRequest>,
) -> Result<Response, ApiError> {
    let Some(step) = EnrichStep::from_str(&req.step) else {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": format!("unknown step: {}", req.step) })),
        )
            .into_response());
    };

    match state.ctx.executor.run_step(step, &req.id, &req.actor).await? {
        StepResult::Completed { status, body } => {
            let code = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
            Ok((code, Json(body)).into_response())
        }
        StepResult::ServiceUnavailable { status, message } => Ok((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": message, "agent_status": status })),
        )
            .into_response()),
    }
}

#[derive(Debug, Deserialize)]
pub struct ReenrichRequest {
    #[serde(default = "default_actor")]
    pub actor: String,
}

/// Reset an item (by queue or publication id) for full re-enrichment.
pub async fn reenrich(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<ReenrichRequest>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let actor = body.map(|Json(b)| b.actor).unwrap_or_else(default_actor);
    let started = state.ctx.executor.reenrich(&id, &actor)?;
    Ok(Json(json!({
        "queue_id": started.queue_id,
        "run_id": started.run_id,
    })))
}

/// Review-surface flags for a status code.
pub async fn review_flags(
    State(state): State<AppState>,
    Path(code): Path<i32>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if state.ctx.registry.entry(code).is_none() {
        return Err(PipelineError::not_found("status code", &code.to_string()).into());
    }
    let flags = compute_review_flags(code, &state.ctx.codes);
    Ok(Json(serde_json::to_value(flags).unwrap_or_default()))
}

#[derive(Debug, Deserialize)]
pub struct CheckTransitionParams {
    pub from: i32,
    pub to: i32,
    #[serde(default, rename = "override")]
    pub manual_override: bool,
}

#[derive(Debug, Serialize)]
pub struct CheckTransitionResponse {
    pub allowed: bool,
    pub forced: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Dry-run a status transition through the guard.
pub async fn check_transition(
    State(state): State<AppState>,
    Query(params): Query<CheckTransitionParams>,
) -> Result<Json<CheckTransitionResponse>, ApiError> {
    let decision = state
        .ctx
        .guard
        .decide(params.from, params.to, params.manual_override)?;
    let response = match decision {
        Decision::Allowed { forced } => CheckTransitionResponse {
            allowed: true,
            forced,
            reason: None,
        },
        Decision::Denied { reason } => CheckTransitionResponse {
            allowed: false,
            forced: false,
            reason: Some(reason),
        },
    };
    Ok(Json(response))
}

/// The full seeded status table.
pub async fn status_codes(State(state): State<AppState>) -> Json<serde_json::Value> {
    let entries: Vec<_> = state.ctx.registry.entries().collect();
    Json(serde_json::to_value(entries).unwrap_or_default())
}

/// Run history for a queue item, newest first.
pub async fn run_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if state.ctx.queue.get(&id)?.is_none() {
        return Err(PipelineError::not_found("queue item", &id).into());
    }
    let runs = state.ctx.tracker.history(&id)?;
    Ok(Json(serde_json::to_value(runs).unwrap_or_default()))
}
