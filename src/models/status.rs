//! Status codes and pipeline phases.
//!
//! Every queue item carries a numeric status code. Codes are grouped into
//! coarse phases by numeric range, but calling code never does range
//! arithmetic itself; the registry is the only place that maps codes to
//! phases.

use serde::{Deserialize, Serialize};

/// Coarse grouping of status codes, ordered by pipeline progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Discovery,
    Enrichment,
    Review,
    Published,
    Terminal,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discovery => "discovery",
            Self::Enrichment => "enrichment",
            Self::Review => "review",
            Self::Published => "published",
            Self::Terminal => "terminal",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "discovery" => Some(Self::Discovery),
            "enrichment" => Some(Self::Enrichment),
            "review" => Some(Self::Review),
            "published" => Some(Self::Published),
            "terminal" => Some(Self::Terminal),
            _ => None,
        }
    }
}

/// One row of the status lookup table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    /// Numeric status code, unique across the table.
    pub code: i32,
    /// Symbolic name, unique across the table.
    pub name: String,
    /// Phase this code belongs to.
    pub phase: Phase,
    /// Whether the code is a dead end (failed, rejected, ...).
    pub is_terminal: bool,
}

impl StatusEntry {
    pub fn new(code: i32, name: &str, phase: Phase, is_terminal: bool) -> Self {
        Self {
            code,
            name: name.to_string(),
            phase,
            is_terminal,
        }
    }
}
