//! Curator - content enrichment pipeline core.
//!
//! Items enter an ingestion queue, move through an asynchronous enrichment
//! pipeline (summarize, tag, thumbnail) executed by a remote agent service,
//! pass human review, and are published. This crate owns the status-code
//! state machine, the pipeline-run concurrency layer, and the reconciliation
//! logic for re-enriching items that have already been published.

pub mod agent;
pub mod cli;
pub mod config;
pub mod context;
pub mod models;
pub mod pipeline;
pub mod registry;
pub mod repository;
pub mod server;
