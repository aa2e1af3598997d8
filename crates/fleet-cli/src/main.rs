//! `fleet` — run a fleet of agent workers over a configured task batch.

mod echo;

use clap::{Parser, Subcommand};
use echo::EchoCapability;
use fleet_core::{AgentRole, CapabilityRegistry, TaskKind, TaskPriority, TaskSpec};
use fleet_orchestrator::{MessageBus, Orchestrator, OrchestratorConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fleet", about = "Fleet — multi-agent task coordination")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "fleet.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the configured task batch to completion and print statistics
    Run {
        /// Seconds to wait for the batch before giving up (overrides config)
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// List the built-in agent roles
    Roles,
}

#[derive(Deserialize)]
struct FleetConfig {
    /// Agent roles to start workers for.
    #[serde(default = "default_agents")]
    agents: Vec<String>,
    #[serde(default = "default_poll_ms")]
    poll_interval_ms: u64,
    #[serde(default = "default_cleanup_secs")]
    cleanup_interval_secs: u64,
    #[serde(default = "default_retain_secs")]
    retain_completed_secs: i64,
    #[serde(default = "default_timeout_secs")]
    run_timeout_secs: u64,
    #[serde(default)]
    tasks: Vec<TaskEntry>,
}

#[derive(Deserialize)]
struct TaskEntry {
    description: String,
    kind: TaskKind,
    #[serde(default)]
    priority: Option<TaskPriority>,
    #[serde(default)]
    assigned_agent: Option<String>,
}

fn default_agents() -> Vec<String> {
    AgentRole::all().iter().map(ToString::to_string).collect()
}
fn default_poll_ms() -> u64 {
    200
}
fn default_cleanup_secs() -> u64 {
    60
}
fn default_retain_secs() -> i64 {
    300
}
fn default_timeout_secs() -> u64 {
    60
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { timeout } => run(&cli.config, timeout).await,
        Commands::Roles => {
            println!("Built-in agent roles:");
            for role in AgentRole::all() {
                println!("  {role}");
            }
            Ok(())
        }
    }
}

async fn run(config_path: &Path, timeout_override: Option<u64>) -> anyhow::Result<()> {
    let config_str = tokio::fs::read_to_string(config_path).await.map_err(|e| {
        anyhow::anyhow!(
            "Failed to read config file '{}': {}",
            config_path.display(),
            e
        )
    })?;
    let config: FleetConfig = toml::from_str(&config_str)?;

    let mut registry = CapabilityRegistry::new();
    for agent in &config.agents {
        let role: AgentRole = agent.parse()?;
        registry.register(Arc::new(EchoCapability::new(role)));
    }
    info!(agents = registry.len(), "Capabilities registered");

    if config.tasks.is_empty() {
        warn!("No [[tasks]] configured; nothing to run");
        return Ok(());
    }

    let orchestrator = Orchestrator::with_config(
        registry,
        OrchestratorConfig {
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            bus_capacity: MessageBus::DEFAULT_CAPACITY,
            cleanup_interval: Duration::from_secs(config.cleanup_interval_secs),
            retain_terminal_for: chrono::Duration::seconds(config.retain_completed_secs),
        },
    );

    let total = config.tasks.len();
    for entry in config.tasks {
        let mut spec = TaskSpec::new(entry.description, entry.kind);
        if let Some(priority) = entry.priority {
            spec = spec.with_priority(priority);
        }
        if let Some(agent) = entry.assigned_agent {
            spec = spec.assigned_to(agent);
        }
        let task = orchestrator.create_task_from_spec(spec).await?;
        info!(task_id = %task.id, priority = %task.priority, "Task queued");
    }

    orchestrator.start().await;

    let timeout = Duration::from_secs(timeout_override.unwrap_or(config.run_timeout_secs));
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let stats = orchestrator.get_queue_statistics().await;
        if stats.completed >= total {
            break;
        }
        if tokio::time::Instant::now() >= deadline {
            warn!(
                pending = stats.pending,
                processing = stats.processing,
                "Timed out waiting for the task batch"
            );
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    let report = serde_json::json!({
        "tasks": orchestrator.get_tasks().await,
        "queue": orchestrator.get_queue_statistics().await,
        "bus": orchestrator.get_bus_statistics(),
        "workers": orchestrator.get_workers_status().await,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    orchestrator.stop().await;
    Ok(())
}
