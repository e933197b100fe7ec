//! Authoritative status-code registry.
//!
//! The registry is the single source of truth mapping numeric status codes
//! to symbolic names, phases, and terminal-ness. It is seeded once at system
//! setup, loaded once per process, and passed explicitly into every
//! component that needs it; there is no global.
//!
//! An unknown status name indicates a deployment/schema mismatch, not a user
//! error, so lookups by name fail fast with a configuration error.

use std::collections::{BTreeMap, HashMap};

use crate::models::{Phase, StatusEntry};
use crate::pipeline::PipelineError;

/// The canonical status table seeded at system setup.
///
/// Additions are additive-only in production; removing or renumbering a code
/// referenced by historical rows is a breaking migration.
pub fn seed_entries() -> Vec<StatusEntry> {
    use Phase::*;
    vec![
        StatusEntry::new(100, "discovered", Discovery, false),
        StatusEntry::new(110, "to_fetch", Discovery, false),
        StatusEntry::new(111, "fetching", Discovery, false),
        StatusEntry::new(120, "to_score", Discovery, false),
        StatusEntry::new(121, "scoring", Discovery, false),
        StatusEntry::new(200, "pending_enrichment", Enrichment, false),
        StatusEntry::new(210, "to_summarize", Enrichment, false),
        StatusEntry::new(211, "summarizing", Enrichment, false),
        StatusEntry::new(220, "to_tag", Enrichment, false),
        StatusEntry::new(221, "tagging", Enrichment, false),
        StatusEntry::new(230, "to_thumbnail", Enrichment, false),
        StatusEntry::new(231, "thumbnailing", Enrichment, false),
        StatusEntry::new(240, "enriched", Enrichment, false),
        StatusEntry::new(300, "pending_review", Review, false),
        StatusEntry::new(310, "approved", Review, false),
        StatusEntry::new(400, "published", Published, false),
        StatusEntry::new(500, "failed", Terminal, true),
        StatusEntry::new(510, "irrelevant", Terminal, true),
        StatusEntry::new(540, "rejected", Terminal, true),
        StatusEntry::new(550, "dead_letter", Terminal, true),
    ]
}

/// Immutable in-memory view of the status lookup table.
#[derive(Debug, Clone)]
pub struct StatusRegistry {
    by_code: BTreeMap<i32, StatusEntry>,
    by_name: HashMap<String, i32>,
}

impl StatusRegistry {
    /// Build a registry from loaded entries, rejecting duplicates.
    pub fn new(entries: Vec<StatusEntry>) -> Result<Self, PipelineError> {
        if entries.is_empty() {
            return Err(PipelineError::Configuration(
                "status lookup table is empty; run `curator seed-status`".to_string(),
            ));
        }
        let mut by_code = BTreeMap::new();
        let mut by_name = HashMap::new();
        for entry in entries {
            if by_name.insert(entry.name.clone(), entry.code).is_some() {
                return Err(PipelineError::Configuration(format!(
                    "duplicate status name: {}",
                    entry.name
                )));
            }
            if by_code.insert(entry.code, entry).is_some() {
                return Err(PipelineError::Configuration(
                    "duplicate status code in lookup table".to_string(),
                ));
            }
        }
        Ok(Self { by_code, by_name })
    }

    /// Registry built from the canonical seed table (tests, tooling).
    pub fn seeded() -> Self {
        Self::new(seed_entries()).expect("seed table is internally consistent")
    }

    /// Resolve a status name to its code, failing fast on unknown names.
    pub fn code_for(&self, name: &str) -> Result<i32, PipelineError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| PipelineError::Configuration(format!("unknown status name: {name}")))
    }

    pub fn entry(&self, code: i32) -> Option<&StatusEntry> {
        self.by_code.get(&code)
    }

    pub fn name_of(&self, code: i32) -> Option<&str> {
        self.entry(code).map(|e| e.name.as_str())
    }

    pub fn phase_of(&self, code: i32) -> Option<Phase> {
        self.entry(code).map(|e| e.phase)
    }

    pub fn is_terminal(&self, code: i32) -> bool {
        self.entry(code).map(|e| e.is_terminal).unwrap_or(false)
    }

    /// The next code in the same phase's fixed linear order, if any.
    pub fn next_in_phase(&self, code: i32) -> Option<i32> {
        let phase = self.phase_of(code)?;
        self.by_code
            .range(code + 1..)
            .take_while(|(_, e)| e.phase == phase)
            .map(|(c, _)| *c)
            .next()
    }

    /// Canonical entry code for a phase (its lowest code).
    pub fn phase_entry(&self, phase: Phase) -> Option<i32> {
        self.by_code
            .values()
            .find(|e| e.phase == phase)
            .map(|e| e.code)
    }

    /// All entries in code order.
    pub fn entries(&self) -> impl Iterator<Item = &StatusEntry> {
        self.by_code.values()
    }
}

/// Well-known codes resolved once per process.
///
/// Components that make decisions against specific statuses (the executor,
/// the review flags) resolve the names they need up front, so a missing name
/// surfaces at startup rather than mid-operation.
#[derive(Debug, Clone, Copy)]
pub struct NamedCodes {
    pub pending_enrichment: i32,
    pub enriched: i32,
    pub pending_review: i32,
    pub approved: i32,
    pub published: i32,
    pub failed: i32,
    pub rejected: i32,
    pub dead_letter: i32,
}

impl NamedCodes {
    pub fn resolve(registry: &StatusRegistry) -> Result<Self, PipelineError> {
        Ok(Self {
            pending_enrichment: registry.code_for("pending_enrichment")?,
            enriched: registry.code_for("enriched")?,
            pending_review: registry.code_for("pending_review")?,
            approved: registry.code_for("approved")?,
            published: registry.code_for("published")?,
            failed: registry.code_for("failed")?,
            rejected: registry.code_for("rejected")?,
            dead_letter: registry.code_for("dead_letter")?,
        })
    }
}
