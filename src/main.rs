//! # Briefcast — Multi-Tenant Content Pipeline Orchestrator
//!
//! Per-tenant recurring triggers drive a fetch → select → research →
//! generate → refine → render → publish pipeline, with per-platform
//! failure isolation and an append-only run history.
//!
//! Usage:
//!   briefcast serve                      # Run the scheduler loop
//!   briefcast run --tenant acme          # One-shot pipeline for a tenant
//!   briefcast run --tenant acme --dry-run
//!   briefcast schedule set --tenant acme --times 09:00,18:00 --timezone UTC
//!   briefcast agent status --tenant acme
//!   briefcast history --tenant acme

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use briefcast_core::config::{BriefcastConfig, TenantsFile};
use briefcast_core::types::{RunOverrides, TenantId};
use briefcast_history::HistoryStore;
use briefcast_pipeline::Orchestrator;
use briefcast_scheduler::{
    AgentRuntime, ScheduleRegistry, ScheduleStore, SchedulerEngine, SystemClock, spawn_scheduler,
};

#[derive(Parser)]
#[command(name = "briefcast", version, about = "Multi-tenant scheduled content pipeline")]
struct Cli {
    /// Config file path (default: ~/.briefcast/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Tenants file path (default: ~/.briefcast/tenants.toml)
    #[arg(long)]
    tenants: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the scheduler loop, firing each tenant's pipeline on schedule
    Serve,
    /// Run the pipeline once for one tenant
    Run {
        #[arg(long)]
        tenant: String,
        /// Print the draft instead of publishing (chart still renders)
        #[arg(long)]
        dry_run: bool,
        /// Replace the generated text before the publish stage
        #[arg(long)]
        text: Option<String>,
    },
    /// Manage a tenant's recurring post times
    Schedule {
        #[command(subcommand)]
        action: ScheduleAction,
    },
    /// Start/stop/query a tenant's agent
    Agent {
        #[command(subcommand)]
        action: AgentAction,
    },
    /// Show recent runs and publish attempts for a tenant
    History {
        #[arg(long)]
        tenant: String,
        #[arg(long, default_value = "10")]
        limit: usize,
    },
}

#[derive(Subcommand)]
enum ScheduleAction {
    /// Replace the tenant's schedule (comma-separated HH:MM times)
    Set {
        #[arg(long)]
        tenant: String,
        #[arg(long)]
        times: String,
        #[arg(long, default_value = "America/Los_Angeles")]
        timezone: String,
    },
    /// Remove all of the tenant's scheduled times
    Clear {
        #[arg(long)]
        tenant: String,
    },
    /// Show the tenant's schedule and next fire time
    Show {
        #[arg(long)]
        tenant: String,
    },
}

#[derive(Subcommand)]
enum AgentAction {
    Start {
        #[arg(long)]
        tenant: String,
    },
    Stop {
        #[arg(long)]
        tenant: String,
    },
    Status {
        #[arg(long)]
        tenant: String,
    },
}

fn build_orchestrator(cli: &Cli) -> Result<Arc<Orchestrator>> {
    let config = match &cli.config {
        Some(path) => BriefcastConfig::load_from(path)?,
        None => BriefcastConfig::load()?,
    };
    let tenants = match &cli.tenants {
        Some(path) => TenantsFile::load_from(path)?,
        None => TenantsFile::load()?,
    };

    let clock = Arc::new(SystemClock);
    let store = ScheduleStore::new(&ScheduleStore::default_path());
    let registry = Arc::new(ScheduleRegistry::with_store(clock, store));
    let runtime = Arc::new(AgentRuntime::new());

    let db_path = shellexpand::tilde(&config.history.db_path).into_owned();
    let history = Arc::new(HistoryStore::open(std::path::Path::new(&db_path))?);

    Ok(Arc::new(Orchestrator::new(
        config, tenants, registry, runtime, history,
    )))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let orchestrator = build_orchestrator(&cli)?;

    match cli.command {
        Command::Serve => serve(orchestrator).await,
        Command::Run {
            tenant,
            dry_run,
            text,
        } => run_once(orchestrator, &tenant, dry_run, text).await,
        Command::Schedule { action } => schedule(orchestrator, action),
        Command::Agent { action } => agent(orchestrator, action),
        Command::History { tenant, limit } => history(orchestrator, &tenant, limit),
    }
}

async fn serve(orchestrator: Arc<Orchestrator>) -> Result<()> {
    let tick_secs = orchestrator.config().scheduler.tick_secs;

    println!("Briefcast v{}", env!("CARGO_PKG_VERSION"));
    let started = orchestrator.start_all_eligible();
    println!("   Agents started: {started}");
    for tenant in orchestrator.runtime().active_tenants() {
        let next = orchestrator
            .next_fire(&tenant)
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "none".into());
        println!("   {tenant}: next fire {next}");
    }

    let engine = Arc::new(SchedulerEngine::new(
        orchestrator.registry().clone(),
        orchestrator.runtime().clone(),
        Arc::new(SystemClock),
    ));

    let orch = orchestrator.clone();
    spawn_scheduler(engine, tick_secs, move |key| {
        let orch = orch.clone();
        async move {
            orch.run_scheduled(key).await;
        }
    })
    .await;

    Ok(())
}

async fn run_once(
    orchestrator: Arc<Orchestrator>,
    tenant: &str,
    dry_run: bool,
    text: Option<String>,
) -> Result<()> {
    let tenant = TenantId::new(tenant);
    let overrides = RunOverrides { text, dry_run };
    let report = orchestrator.run_now(&tenant, overrides).await?;

    if let Some(artifact) = &report.artifact {
        println!("\n{}", "=".repeat(60));
        if dry_run {
            println!("DRY RUN — post would be published:");
        } else {
            println!("Post ({:?}):", report.run.outcome);
        }
        println!("{}", "=".repeat(60));
        println!("{}", artifact.text);
        println!("{}", "-".repeat(60));
        println!("Characters: {}", artifact.text.chars().count());
        if let Some(path) = &artifact.chart_path {
            println!("Chart: {}", path.display());
        }
        println!("{}", "=".repeat(60));
    }

    for attempt in &report.attempts {
        match &attempt.post_id {
            Some(id) => println!("{}: posted ({id})", attempt.platform),
            None => println!(
                "{}: failed ({})",
                attempt.platform,
                attempt.error.as_deref().unwrap_or("unknown")
            ),
        }
    }

    if report.run.outcome == briefcast_core::types::RunOutcome::Failed {
        anyhow::bail!(
            "run failed: {}",
            report.run.error.as_deref().unwrap_or("unknown")
        );
    }
    Ok(())
}

fn schedule(orchestrator: Arc<Orchestrator>, action: ScheduleAction) -> Result<()> {
    match action {
        ScheduleAction::Set {
            tenant,
            times,
            timezone,
        } => {
            let tenant = TenantId::new(tenant);
            let times: Vec<String> = times.split(',').map(|s| s.trim().to_string()).collect();
            orchestrator.set_schedule(&tenant, &times, &timezone)?;
            println!("Schedule set for {tenant}: {} ({timezone})", times.join(", "));
        }
        ScheduleAction::Clear { tenant } => {
            let tenant = TenantId::new(tenant);
            orchestrator.clear_schedule(&tenant);
            println!("Schedule cleared for {tenant}");
        }
        ScheduleAction::Show { tenant } => {
            let tenant = TenantId::new(tenant);
            let entries = orchestrator.registry().describe(&tenant);
            if entries.is_empty() {
                println!("No schedule for {tenant}");
            } else {
                for entry in entries {
                    println!("{entry}");
                }
                if let Some(next) = orchestrator.next_fire(&tenant) {
                    println!("Next fire: {}", next.to_rfc3339());
                }
            }
        }
    }
    Ok(())
}

fn agent(orchestrator: Arc<Orchestrator>, action: AgentAction) -> Result<()> {
    match action {
        AgentAction::Start { tenant } => {
            let tenant = TenantId::new(tenant);
            orchestrator.start_agent(&tenant)?;
            let next = orchestrator
                .next_fire(&tenant)
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "none".into());
            println!("Agent started for {tenant}, next fire {next}");
        }
        AgentAction::Stop { tenant } => {
            let tenant = TenantId::new(tenant);
            orchestrator.stop_agent(&tenant);
            println!("Agent stopped for {tenant}");
        }
        AgentAction::Status { tenant } => {
            let tenant = TenantId::new(tenant);
            let active = orchestrator.is_agent_active(&tenant);
            println!("Agent {tenant}: {}", if active { "running" } else { "stopped" });
            if let Some(next) = orchestrator.next_fire(&tenant) {
                println!("Next fire: {}", next.to_rfc3339());
            }
        }
    }
    Ok(())
}

fn history(orchestrator: Arc<Orchestrator>, tenant: &str, limit: usize) -> Result<()> {
    let tenant = TenantId::new(tenant);
    let runs = orchestrator.recent_runs(&tenant, limit)?;
    if runs.is_empty() {
        println!("No runs recorded for {tenant}");
        return Ok(());
    }

    for run in runs {
        println!(
            "{} [{:?}] {} {}",
            run.finished_at.to_rfc3339(),
            run.outcome,
            run.story_title.as_deref().unwrap_or("-"),
            run.error.as_deref().unwrap_or("")
        );
        for attempt in orchestrator.attempts(&run.id)? {
            match &attempt.post_id {
                Some(id) => println!("    {}: success ({id})", attempt.platform),
                None => println!(
                    "    {}: failed ({})",
                    attempt.platform,
                    attempt.error.as_deref().unwrap_or("unknown")
                ),
            }
        }
    }
    Ok(())
}
