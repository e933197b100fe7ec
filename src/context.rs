//! Wiring: opens the database and assembles the pipeline components.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;
use tracing::{debug, info};

use crate::agent::{AgentClient, AgentConfig, StepService};
use crate::config::Settings;
use crate::pipeline::{ReenrichResolver, RunTracker, StepExecutor, TransitionGuard};
use crate::registry::{seed_entries, NamedCodes, StatusRegistry};
use crate::repository::{
    PublicationRepository, QueueRepository, RunRepository, StatusLookupRepository,
};

/// Everything a command or request handler needs, wired once at startup.
pub struct PipelineContext {
    pub queue: Arc<QueueRepository>,
    pub runs: Arc<RunRepository>,
    pub publications: Arc<PublicationRepository>,
    pub registry: Arc<StatusRegistry>,
    pub codes: NamedCodes,
    pub guard: TransitionGuard,
    pub tracker: RunTracker,
    pub executor: StepExecutor,
}

impl PipelineContext {
    /// Open the database, seed the status lookup table on first run, and
    /// build the pipeline components around a real agent client.
    pub fn open(settings: &Settings) -> anyhow::Result<Self> {
        let agent = Arc::new(AgentClient::new(settings.agent.clone())?);
        Self::open_with_agent(settings, agent)
    }

    /// Like `open`, but with a caller-supplied step service.
    pub fn open_with_agent(
        settings: &Settings,
        agent: Arc<dyn StepService>,
    ) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&settings.data_dir).with_context(|| {
            format!("failed to create data dir {}", settings.data_dir.display())
        })?;
        let db_path = settings.database_path();
        debug!(db = %db_path.display(), "opening pipeline database");

        let status_lookup = StatusLookupRepository::new(&db_path)?;
        let registry = Arc::new(load_registry(&status_lookup)?);
        let codes = NamedCodes::resolve(&registry)?;

        let queue = Arc::new(QueueRepository::new(&db_path)?);
        let runs = Arc::new(RunRepository::new(&db_path)?);
        let publications = Arc::new(PublicationRepository::new(&db_path)?);

        let guard = TransitionGuard::new(registry.clone());
        let tracker = RunTracker::new(runs.clone());
        let resolver = ReenrichResolver::new(queue.clone(), publications.clone(), codes);
        let executor = StepExecutor::new(
            queue.clone(),
            RunTracker::new(runs.clone()),
            resolver,
            TransitionGuard::new(registry.clone()),
            registry.clone(),
            codes,
            agent,
        );

        Ok(Self {
            queue,
            runs,
            publications,
            registry,
            codes,
            guard,
            tracker,
            executor,
        })
    }

    /// Convenience for tests and offline commands that never dispatch steps.
    pub fn open_offline(settings: &Settings) -> anyhow::Result<Self> {
        // The client is still constructed; it just never gets called.
        let agent = Arc::new(AgentClient::new(AgentConfig::default())?);
        Self::open_with_agent(settings, agent)
    }
}

/// Load the status registry from the lookup table, seeding the canonical
/// rows on an empty database.
fn load_registry(repo: &StatusLookupRepository) -> anyhow::Result<StatusRegistry> {
    let seeded = repo.seed(&seed_entries())?;
    if seeded > 0 {
        info!(seeded, "seeded status lookup table");
    }
    let entries = repo.load()?;
    let registry = StatusRegistry::new(entries)
        .context("status lookup table is inconsistent; re-seed with `curator seed-status`")?;
    Ok(registry)
}

/// Seed (or top up) the status lookup table at `db_path`.
pub fn seed_status_table(db_path: &Path) -> anyhow::Result<usize> {
    let repo = StatusLookupRepository::new(db_path)?;
    Ok(repo.seed(&seed_entries())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_seeds_registry() {
        let dir = tempdir().unwrap();
        let settings = Settings {
            data_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let ctx = PipelineContext::open_offline(&settings).unwrap();
        assert_eq!(ctx.registry.code_for("pending_review").unwrap(), 300);
        assert_eq!(ctx.codes.published, 400);

        // Reopening finds the rows already present
        let again = PipelineContext::open_offline(&settings).unwrap();
        assert_eq!(again.registry.entries().count(), ctx.registry.entries().count());
    }
}
