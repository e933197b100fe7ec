//! Data models for the enrichment pipeline.

mod pipeline_run;
mod publication;
mod queue_item;
mod status;
mod step;

pub use pipeline_run::{PipelineRun, RunOutcome, RunStatus, RunTrigger};
pub use publication::Publication;
pub use queue_item::{normalize_url, PipelineHints, QueueItem};
pub use status::{Phase, StatusEntry};
pub use step::EnrichStep;
