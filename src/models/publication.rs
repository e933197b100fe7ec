//! Publications: the terminal artifact for items that reached `published`.

use serde::{Deserialize, Serialize};

/// A published item.
///
/// `origin_queue_id` is a weak, lookup-only back-reference to the queue item
/// that produced this publication. It may be null for publications that
/// predate queue linkage, and may point at a queue row that no longer
/// exists; the re-enrich resolver repairs both cases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Publication {
    pub id: String,
    pub origin_queue_id: Option<String>,
    pub title: String,
    pub source_url: String,
    pub published_at: Option<String>,
}

impl Publication {
    pub fn new(title: &str, source_url: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            origin_queue_id: None,
            title: title.to_string(),
            source_url: source_url.to_string(),
            published_at: None,
        }
    }
}
