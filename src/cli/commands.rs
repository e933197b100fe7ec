//! CLI commands implementation.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::style;

use crate::config::Settings;
use crate::context::{seed_status_table, PipelineContext};
use crate::models::{EnrichStep, QueueItem};
use crate::pipeline::{StepResult, TransitionGuard};
use crate::registry::StatusRegistry;
use crate::server;

#[derive(Parser)]
#[command(name = "curator")]
#[command(about = "Content enrichment pipeline: status state machine and run control")]
#[command(version)]
pub struct Cli {
    /// Config file path (default: curator.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve,

    /// Seed (or top up) the status lookup table
    SeedStatus,

    /// Add a URL to the ingestion queue
    Add {
        /// URL to enqueue
        url: String,
        /// Initial status code (default: pending_enrichment)
        #[arg(short, long)]
        status: Option<i32>,
    },

    /// Run a single enrichment step against an item
    RunStep {
        /// Queue item or publication id
        id: String,
        /// Step to run: summarize, tag, or thumbnail
        step: String,
    },

    /// Reset an item for full re-enrichment
    Reenrich {
        /// Queue item or publication id
        id: String,
    },

    /// Show run history for a queue item
    Runs {
        /// Queue item id
        id: String,
    },

    /// Dump the legal transition table
    Transitions {
        /// Emit a Mermaid state diagram instead of a table
        #[arg(long)]
        mermaid: bool,
    },
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve => server::serve(&settings).await,
        Commands::SeedStatus => cmd_seed_status(&settings),
        Commands::Add { url, status } => cmd_add(&settings, &url, status),
        Commands::RunStep { id, step } => cmd_run_step(&settings, &id, &step).await,
        Commands::Reenrich { id } => cmd_reenrich(&settings, &id),
        Commands::Runs { id } => cmd_runs(&settings, &id),
        Commands::Transitions { mermaid } => cmd_transitions(mermaid),
    }
}

fn cmd_seed_status(settings: &Settings) -> anyhow::Result<()> {
    std::fs::create_dir_all(&settings.data_dir)?;
    let seeded = seed_status_table(&settings.database_path())?;
    if seeded > 0 {
        println!("{} seeded {} status rows", style("✓").green(), seeded);
    } else {
        println!("{} status table already seeded", style("·").dim());
    }
    Ok(())
}

fn cmd_add(settings: &Settings, url: &str, status: Option<i32>) -> anyhow::Result<()> {
    let ctx = PipelineContext::open_offline(settings)?;
    let code = match status {
        Some(code) => {
            let Some(entry) = ctx.registry.entry(code) else {
                anyhow::bail!("unknown status code: {code}");
            };
            entry.code
        }
        None => ctx.codes.pending_enrichment,
    };
    let item = QueueItem::new(url, code);
    ctx.queue.insert(&item)?;
    println!(
        "{} queued {} at {} ({})",
        style("✓").green(),
        item.id,
        code,
        ctx.registry.name_of(code).unwrap_or("?")
    );
    Ok(())
}

async fn cmd_run_step(settings: &Settings, id: &str, step: &str) -> anyhow::Result<()> {
    let Some(step) = EnrichStep::from_str(step) else {
        anyhow::bail!("unknown step: {step} (expected summarize, tag, or thumbnail)");
    };
    let ctx = PipelineContext::open(settings)?;

    match ctx.executor.run_step(step, id, "cli").await? {
        StepResult::Completed { status, body } => {
            println!(
                "{} agent responded {}",
                if (200..300).contains(&status) {
                    style("✓").green()
                } else {
                    style("!").yellow()
                },
                status
            );
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        StepResult::ServiceUnavailable { status, message } => {
            println!("{} step service unavailable: {}", style("✗").red(), message);
            if let Some(status) = status {
                println!("  agent status: {status}");
            }
        }
    }
    Ok(())
}

fn cmd_reenrich(settings: &Settings, id: &str) -> anyhow::Result<()> {
    let ctx = PipelineContext::open_offline(settings)?;
    let started = ctx.executor.reenrich(id, "cli")?;
    println!(
        "{} re-enrichment started: queue={} run={}",
        style("✓").green(),
        started.queue_id,
        started.run_id
    );
    Ok(())
}

fn cmd_runs(settings: &Settings, id: &str) -> anyhow::Result<()> {
    let ctx = PipelineContext::open_offline(settings)?;
    let runs = ctx.tracker.history(id)?;
    if runs.is_empty() {
        println!("{} no runs for {}", style("·").dim(), id);
        return Ok(());
    }
    println!(
        "{:<38} {:<10} {:<10} {:<12} {}",
        style("RUN").bold(),
        style("TRIGGER").bold(),
        style("STATUS").bold(),
        style("BY").bold(),
        style("STARTED").bold()
    );
    for run in runs {
        println!(
            "{:<38} {:<10} {:<10} {:<12} {}",
            run.id,
            run.trigger.as_str(),
            run.status.as_str(),
            run.created_by,
            run.created_at
        );
    }
    Ok(())
}

fn cmd_transitions(mermaid: bool) -> anyhow::Result<()> {
    let registry = std::sync::Arc::new(StatusRegistry::seeded());
    let guard = TransitionGuard::new(registry.clone());

    if mermaid {
        println!("stateDiagram-v2");
        for entry in registry.entries() {
            for target in guard.legal_targets(entry.code) {
                let target_name = registry.name_of(target).unwrap_or("?");
                println!("    {} --> {}", entry.name, target_name);
            }
            if entry.is_terminal {
                println!("    {} --> [*]", entry.name);
            }
        }
        return Ok(());
    }

    for entry in registry.entries() {
        let targets: Vec<String> = guard
            .legal_targets(entry.code)
            .into_iter()
            .map(|code| format!("{} ({code})", registry.name_of(code).unwrap_or("?")))
            .collect();
        println!(
            "{} {}",
            style(format!("{} ({})", entry.name, entry.code)).bold(),
            if entry.is_terminal {
                style("[terminal]").red().to_string()
            } else {
                String::new()
            }
        );
        if targets.is_empty() {
            println!("    (no legal transitions without override)");
        } else {
            println!("    -> {}", targets.join(", "));
        }
    }
    Ok(())
}
