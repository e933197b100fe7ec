//! Transition guard: the pure decision function over status transitions.
//!
//! Phases are ordered and generally monotonic (discovery, enrichment,
//! review, published), but operational needs require deliberate jumps
//! backward or sideways. The override flag makes every such jump explicit
//! and traceable rather than allowing silent arbitrary code writes.

use std::sync::Arc;

use tracing::warn;

use crate::registry::StatusRegistry;

use super::{PipelineError, Result};

/// Outcome of a transition check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allowed {
        /// True when the transition only passed because of an override.
        forced: bool,
    },
    Denied {
        reason: String,
    },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

/// Decides which status transitions are legal.
pub struct TransitionGuard {
    registry: Arc<StatusRegistry>,
}

impl TransitionGuard {
    pub fn new(registry: Arc<StatusRegistry>) -> Self {
        Self { registry }
    }

    /// Decide whether `from -> to` is legal.
    ///
    /// Unknown codes are a configuration error, not a denial.
    pub fn decide(&self, from: i32, to: i32, manual_override: bool) -> Result<Decision> {
        let from_entry = self
            .registry
            .entry(from)
            .ok_or_else(|| PipelineError::Configuration(format!("unknown status code: {from}")))?;
        let to_entry = self
            .registry
            .entry(to)
            .ok_or_else(|| PipelineError::Configuration(format!("unknown status code: {to}")))?;

        // Idempotent no-op
        if from == to {
            return Ok(Decision::Allowed { forced: false });
        }

        // Failure can happen at any stage
        if to_entry.is_terminal {
            return Ok(Decision::Allowed { forced: false });
        }

        // Next step in the phase's fixed linear order
        if from_entry.phase == to_entry.phase && self.registry.next_in_phase(from) == Some(to) {
            return Ok(Decision::Allowed { forced: false });
        }

        // Entry into a later phase via its canonical entry code
        if to_entry.phase > from_entry.phase
            && self.registry.phase_entry(to_entry.phase) == Some(to)
        {
            return Ok(Decision::Allowed { forced: false });
        }

        if manual_override {
            warn!(from, to, "transition forced via manual override");
            return Ok(Decision::Allowed { forced: true });
        }

        Ok(Decision::Denied {
            reason: self.denial_reason(from, to),
        })
    }

    /// Like `decide`, but maps a denial to an error for mutating callers.
    pub fn check(&self, from: i32, to: i32, manual_override: bool) -> Result<()> {
        match self.decide(from, to, manual_override)? {
            Decision::Allowed { .. } => Ok(()),
            Decision::Denied { reason } => Err(PipelineError::InvalidTransition { from, to, reason }),
        }
    }

    /// Codes reachable from `from` without an override.
    pub fn legal_targets(&self, from: i32) -> Vec<i32> {
        self.registry
            .entries()
            .filter(|e| {
                e.code != from
                    && matches!(
                        self.decide(from, e.code, false),
                        Ok(Decision::Allowed { .. })
                    )
            })
            .map(|e| e.code)
            .collect()
    }

    fn denial_reason(&self, from: i32, to: i32) -> String {
        let from_name = self.registry.name_of(from).unwrap_or("?");
        let to_name = self.registry.name_of(to).unwrap_or("?");
        let legal: Vec<String> = self
            .legal_targets(from)
            .into_iter()
            .map(|code| {
                format!(
                    "{} ({code})",
                    self.registry.name_of(code).unwrap_or("?")
                )
            })
            .collect();
        format!(
            "{from_name} ({from}) -> {to_name} ({to}) breaks phase ordering; \
             legal next states: [{}]",
            legal.join(", ")
        )
    }
}
