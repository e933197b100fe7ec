//! Enrichment steps executable in isolation.

use serde::{Deserialize, Serialize};

/// A single enrichment step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrichStep {
    Summarize,
    Tag,
    Thumbnail,
}

impl EnrichStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Summarize => "summarize",
            Self::Tag => "tag",
            Self::Thumbnail => "thumbnail",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "summarize" => Some(Self::Summarize),
            "tag" => Some(Self::Tag),
            "thumbnail" => Some(Self::Thumbnail),
            _ => None,
        }
    }

    /// Status name an item is parked at while this step is queued.
    pub fn queued_status_name(&self) -> &'static str {
        match self {
            Self::Summarize => "to_summarize",
            Self::Tag => "to_tag",
            Self::Thumbnail => "to_thumbnail",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_round_trip() {
        for step in [EnrichStep::Summarize, EnrichStep::Tag, EnrichStep::Thumbnail] {
            assert_eq!(EnrichStep::from_str(step.as_str()), Some(step));
        }
        assert_eq!(EnrichStep::from_str("score"), None);
    }

    #[test]
    fn test_queued_status_names() {
        assert_eq!(EnrichStep::Summarize.queued_status_name(), "to_summarize");
        assert_eq!(EnrichStep::Tag.queued_status_name(), "to_tag");
        assert_eq!(EnrichStep::Thumbnail.queued_status_name(), "to_thumbnail");
    }
}
