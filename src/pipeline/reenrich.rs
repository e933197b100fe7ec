//! Re-enrich resolver: reconciles queue-item and publication identity.
//!
//! Once an item is published its queue row may be archived or absent, but
//! operators still ask to re-enrich "this published thing" by whichever id
//! they have. The resolver accepts either identity, lazily reconstructs a
//! queue row when needed, and stays idempotent under retries and concurrent
//! synthesis.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::models::{normalize_url, Publication, QueueItem};
use crate::registry::NamedCodes;
use crate::repository::{PublicationRepository, QueueRepository, StorageError};

use super::{PipelineError, Result};

/// A queue row the pipeline can operate on.
#[derive(Debug)]
pub struct Resolved {
    pub queue_id: String,
    pub item: QueueItem,
}

/// Resolves an arbitrary entity id to a workable queue row.
pub struct ReenrichResolver {
    queue: Arc<QueueRepository>,
    publications: Arc<PublicationRepository>,
    codes: NamedCodes,
}

impl ReenrichResolver {
    pub fn new(
        queue: Arc<QueueRepository>,
        publications: Arc<PublicationRepository>,
        codes: NamedCodes,
    ) -> Self {
        Self {
            queue,
            publications,
            codes,
        }
    }

    /// Resolve a queue-item or publication id to a queue row.
    pub fn resolve(&self, id: &str) -> Result<Resolved> {
        if let Some(item) = self.queue.get(id)? {
            return Ok(Resolved {
                queue_id: id.to_string(),
                item,
            });
        }

        let publication = self
            .publications
            .get(id)?
            .ok_or_else(|| PipelineError::not_found("item", id))?;

        let queue_id = self.ensure_queue_item(&publication)?;
        let item = self
            .queue
            .get(&queue_id)?
            .ok_or_else(|| PipelineError::not_found("queue item", &queue_id))?;

        Ok(Resolved { queue_id, item })
    }

    fn ensure_queue_item(&self, publication: &Publication) -> Result<String> {
        if let Some(origin) = &publication.origin_queue_id {
            if self.queue.get(origin)?.is_some() {
                debug!(publication_id = %publication.id, queue_id = %origin,
                    "re-enrich resolved via origin linkage");
                return Ok(origin.clone());
            }
        }

        let queue_id = self.synthesize(publication)?;

        // Back-fill the linkage so future resolutions take the fast path
        if publication.origin_queue_id.is_none() {
            self.publications
                .set_origin_queue_id(&publication.id, &queue_id)?;
        }

        Ok(queue_id)
    }

    /// Reconstruct a queue row for a publication with no live queue row.
    ///
    /// The row starts at pending_enrichment with override hints telling the
    /// remote worker to return to pending_review rather than resuming the
    /// linear progression. Reuses the publication's origin id when present
    /// so lookups by that id keep working.
    fn synthesize(&self, publication: &Publication) -> Result<String> {
        let mut item = QueueItem::new(&publication.source_url, self.codes.pending_enrichment);
        if let Some(origin) = &publication.origin_queue_id {
            item.id = origin.clone();
        }
        item.payload
            .insert("title".to_string(), Value::from(publication.title.clone()));
        item.payload.insert(
            "published_at".to_string(),
            publication
                .published_at
                .clone()
                .map(Value::from)
                .unwrap_or(Value::Null),
        );
        item.hints.manual_override = true;
        item.hints.return_status = Some(self.codes.pending_review);

        match self.queue.insert(&item) {
            Ok(()) => {
                info!(publication_id = %publication.id, queue_id = %item.id,
                    "synthesized queue row for re-enrichment");
                Ok(item.id)
            }
            Err(StorageError::ConstraintViolation { detail }) if detail.contains("url_norm") => {
                // Another resolver call or worker created a row for this URL
                // between our lookup and the insert; hand back that row.
                let url_norm = normalize_url(&publication.source_url);
                self.queue
                    .find_id_by_url_norm(&url_norm)?
                    .ok_or(PipelineError::Storage(StorageError::ConstraintViolation {
                        detail,
                    }))
            }
            Err(other) => Err(other.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::StatusRegistry;
    use tempfile::tempdir;

    struct Fixture {
        _dir: tempfile::TempDir,
        queue: Arc<QueueRepository>,
        publications: Arc<PublicationRepository>,
        resolver: ReenrichResolver,
    }

    fn fixture() -> Fixture {
        let dir = tempdir().unwrap();
        let db = dir.path().join("test.db");
        let queue = Arc::new(QueueRepository::new(&db).unwrap());
        let publications = Arc::new(PublicationRepository::new(&db).unwrap());
        let codes = NamedCodes::resolve(&StatusRegistry::seeded()).unwrap();
        let resolver = ReenrichResolver::new(queue.clone(), publications.clone(), codes);
        Fixture {
            _dir: dir,
            queue,
            publications,
            resolver,
        }
    }

    #[test]
    fn test_direct_queue_lookup() {
        let f = fixture();
        let item = QueueItem::new("https://example.com/a", 200);
        f.queue.insert(&item).unwrap();

        let resolved = f.resolver.resolve(&item.id).unwrap();
        assert_eq!(resolved.queue_id, item.id);
        assert_eq!(resolved.item.url, "https://example.com/a");
    }

    #[test]
    fn test_unknown_id_is_not_found() {
        let f = fixture();
        assert!(matches!(
            f.resolver.resolve("missing"),
            Err(PipelineError::NotFound { .. })
        ));
    }

    #[test]
    fn test_publication_with_live_origin_row() {
        let f = fixture();
        let item = QueueItem::new("https://example.com/b", 400);
        f.queue.insert(&item).unwrap();
        let mut publication = Publication::new("B", "https://example.com/b");
        publication.origin_queue_id = Some(item.id.clone());
        f.publications.insert(&publication).unwrap();

        let resolved = f.resolver.resolve(&publication.id).unwrap();
        assert_eq!(resolved.queue_id, item.id);
    }

    #[test]
    fn test_synthesis_backfills_origin() {
        let f = fixture();
        let mut publication = Publication::new("C", "https://example.com/c");
        publication.published_at = Some("2026-01-15".to_string());
        f.publications.insert(&publication).unwrap();

        let resolved = f.resolver.resolve(&publication.id).unwrap();
        assert_eq!(resolved.item.status_code, 200);
        assert!(resolved.item.hints.manual_override);
        assert_eq!(resolved.item.hints.return_status, Some(300));
        assert_eq!(
            resolved.item.payload.get("title").and_then(|v| v.as_str()),
            Some("C")
        );

        let reloaded = f.publications.get(&publication.id).unwrap().unwrap();
        assert_eq!(reloaded.origin_queue_id.as_deref(), Some(resolved.queue_id.as_str()));
    }

    #[test]
    fn test_synthesis_is_idempotent() {
        let f = fixture();
        let publication = Publication::new("D", "https://example.com/d");
        f.publications.insert(&publication).unwrap();

        let first = f.resolver.resolve(&publication.id).unwrap();
        let second = f.resolver.resolve(&publication.id).unwrap();
        assert_eq!(first.queue_id, second.queue_id);
        assert_eq!(f.queue.count().unwrap(), 1);
    }

    #[test]
    fn test_dangling_origin_reuses_id() {
        let f = fixture();
        let mut publication = Publication::new("E", "https://example.com/e");
        publication.origin_queue_id = Some("gone-queue-id".to_string());
        f.publications.insert(&publication).unwrap();

        let resolved = f.resolver.resolve(&publication.id).unwrap();
        assert_eq!(resolved.queue_id, "gone-queue-id");

        // Second resolve takes the fast path, no extra row
        let again = f.resolver.resolve(&publication.id).unwrap();
        assert_eq!(again.queue_id, "gone-queue-id");
        assert_eq!(f.queue.count().unwrap(), 1);
    }

    #[test]
    fn test_url_race_recovers_existing_row() {
        let f = fixture();
        // A row for the same normalized URL appears before synthesis
        let existing = QueueItem::new("https://example.com/f?utm=1", 200);
        f.queue.insert(&existing).unwrap();

        let publication = Publication::new("F", "https://EXAMPLE.com/f");
        f.publications.insert(&publication).unwrap();

        let resolved = f.resolver.resolve(&publication.id).unwrap();
        assert_eq!(resolved.queue_id, existing.id);
        assert_eq!(f.queue.count().unwrap(), 1);
    }
}
