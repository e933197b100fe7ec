//! Queue items: the unit of work moving through the pipeline.
//!
//! An item's enrichment output lives in an open JSON payload. The pipeline
//! also communicates with remote workers through a small fixed set of hint
//! keys inside that payload (`_single_step`, `_return_status`,
//! `_manual_override`). In memory the hints are a typed struct so the state
//! machine never pattern-matches on string keys; they are merged back into
//! the payload blob at the storage boundary.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// Payload key for the step a worker should execute in isolation.
const SINGLE_STEP_KEY: &str = "_single_step";
/// Payload key for the status a worker should transition to when done.
const RETURN_STATUS_KEY: &str = "_return_status";
/// Payload key telling the transition guard to permit a forced jump.
const MANUAL_OVERRIDE_KEY: &str = "_manual_override";

/// Normalize a URL for dedup lookups: lowercase, query and fragment stripped.
pub fn normalize_url(url: &str) -> String {
    let lowered = url.to_lowercase();
    match lowered.find(['?', '#']) {
        Some(idx) => lowered[..idx].to_string(),
        None => lowered,
    }
}

/// Transient pipeline control hints carried in the payload blob.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineHints {
    /// Name of the single step to execute in isolation; cleared by the
    /// consuming worker.
    pub single_step: Option<String>,
    /// Status code the worker should transition to after finishing, when the
    /// normal linear progression does not apply.
    pub return_status: Option<i32>,
    /// Permit a transition the phase-ordering rules would otherwise reject.
    pub manual_override: bool,
}

impl PipelineHints {
    pub fn is_empty(&self) -> bool {
        self.single_step.is_none() && self.return_status.is_none() && !self.manual_override
    }

    /// Remove hint keys from a raw payload document and return them typed.
    pub fn extract(payload: &mut Map<String, Value>) -> Self {
        let single_step = payload
            .remove(SINGLE_STEP_KEY)
            .and_then(|v| v.as_str().map(String::from));
        let return_status = payload
            .remove(RETURN_STATUS_KEY)
            .and_then(|v| v.as_i64())
            .map(|v| v as i32);
        let manual_override = payload
            .remove(MANUAL_OVERRIDE_KEY)
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        Self {
            single_step,
            return_status,
            manual_override,
        }
    }

    /// Merge the hints back into a payload document for storage.
    ///
    /// Unset hints are absent from the result, so a cleared hint disappears
    /// from the blob instead of lingering as null.
    pub fn apply(&self, payload: &mut Map<String, Value>) {
        payload.remove(SINGLE_STEP_KEY);
        payload.remove(RETURN_STATUS_KEY);
        payload.remove(MANUAL_OVERRIDE_KEY);
        if let Some(step) = &self.single_step {
            payload.insert(SINGLE_STEP_KEY.to_string(), Value::from(step.clone()));
        }
        if let Some(code) = self.return_status {
            payload.insert(RETURN_STATUS_KEY.to_string(), Value::from(code));
        }
        if self.manual_override {
            payload.insert(MANUAL_OVERRIDE_KEY.to_string(), Value::from(true));
        }
    }
}

/// A queue item moving through the enrichment pipeline.
#[derive(Debug, Clone)]
pub struct QueueItem {
    /// Stable identity (UUID string).
    pub id: String,
    /// Source URL as submitted.
    pub url: String,
    /// Current status code; must always name a known status.
    pub status_code: i32,
    /// Open enrichment-output document, hint keys excluded.
    pub payload: Map<String, Value>,
    /// Transient pipeline control hints.
    pub hints: PipelineHints,
    /// Pipeline run presently associated with this item, if any.
    pub current_run_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QueueItem {
    /// Create a new queue item with an empty payload.
    pub fn new(url: &str, status_code: i32) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            url: url.to_string(),
            status_code,
            payload: Map::new(),
            hints: PipelineHints::default(),
            current_run_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Normalized form of the item's URL, used for dedup lookups.
    pub fn normalized_url(&self) -> String {
        normalize_url(&self.url)
    }

    /// Full payload document including hint keys, as stored and as consumed
    /// by remote workers.
    pub fn payload_with_hints(&self) -> Map<String, Value> {
        let mut merged = self.payload.clone();
        self.hints.apply(&mut merged);
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_url_strips_query_and_fragment() {
        assert_eq!(
            normalize_url("https://Example.com/Post?utm=1"),
            "https://example.com/post"
        );
        assert_eq!(
            normalize_url("https://example.com/post#section"),
            "https://example.com/post"
        );
        assert_eq!(
            normalize_url("https://example.com/post"),
            "https://example.com/post"
        );
    }

    #[test]
    fn test_hints_extract_removes_keys() {
        let mut payload = Map::new();
        payload.insert("title".to_string(), json!("A title"));
        payload.insert("_single_step".to_string(), json!("tag"));
        payload.insert("_return_status".to_string(), json!(300));
        payload.insert("_manual_override".to_string(), json!(true));

        let hints = PipelineHints::extract(&mut payload);
        assert_eq!(hints.single_step.as_deref(), Some("tag"));
        assert_eq!(hints.return_status, Some(300));
        assert!(hints.manual_override);
        assert_eq!(payload.len(), 1);
        assert!(payload.contains_key("title"));
    }

    #[test]
    fn test_hints_apply_round_trip() {
        let hints = PipelineHints {
            single_step: Some("summarize".to_string()),
            return_status: Some(300),
            manual_override: true,
        };
        let mut payload = Map::new();
        hints.apply(&mut payload);
        let extracted = PipelineHints::extract(&mut payload);
        assert_eq!(extracted, hints);
        assert!(payload.is_empty());
    }

    #[test]
    fn test_cleared_hints_disappear_from_payload() {
        let mut payload = Map::new();
        payload.insert("_manual_override".to_string(), json!(true));
        payload.insert("_return_status".to_string(), json!(300));

        PipelineHints::default().apply(&mut payload);
        assert!(payload.is_empty());
    }

    #[test]
    fn test_payload_with_hints_merges() {
        let mut item = QueueItem::new("https://example.com/a", 200);
        item.payload.insert("title".to_string(), json!("t"));
        item.hints.manual_override = true;
        let merged = item.payload_with_hints();
        assert_eq!(merged.get("_manual_override"), Some(&json!(true)));
        assert_eq!(merged.get("title"), Some(&json!("t")));
        // The typed payload is untouched
        assert!(!item.payload.contains_key("_manual_override"));
    }
}
