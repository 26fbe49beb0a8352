use anyhow::{Context, Result};
use cim_lib::domain::entities::{AuthSession, DrainTrigger};
use cim_lib::infrastructure::jobs::SyncAgentHandle;
use cim_lib::{AppConfig, AppState, init_logging};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "cim-sync")]
#[command(about = "CIM point-of-sale offline sync agent", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding the local database (defaults to the platform data dir)
    #[arg(long, env = "CIM_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Signed-in user stamped on replayed rows
    #[arg(long, env = "CIM_USER_ID")]
    user_id: Option<Uuid>,

    /// Organization whose queue is drained
    #[arg(long, env = "CIM_ORGANIZATION_ID")]
    organization_id: Option<Uuid>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", env = "LOG_LEVEL")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "JSON_LOGS")]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the background sync agent until Ctrl-C
    Run {
        /// Start in offline mode; type `online` on stdin once the network is back
        #[arg(long)]
        offline: bool,
    },
    /// Run a single drain pass and print its report
    Drain,
    /// Print the pending queue
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level, cli.json_logs)?;

    info!("Starting cim-sync v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(cli.data_dir.as_ref());
    let state = AppState::new(config)
        .await
        .context("failed to initialize local store")?;

    match (cli.user_id, cli.organization_id) {
        (Some(user_id), Some(organization_id)) => {
            state
                .session
                .sign_in(AuthSession::new(user_id, organization_id));
        }
        _ => warn!("no session configured; drains will be skipped"),
    }

    match cli.command {
        Commands::Run { offline } => run_agent(&state, offline).await?,
        Commands::Drain => {
            let report = state.sync_engine.drain(DrainTrigger::Manual).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Status => print_status(&state).await?,
    }

    state.pool.close().await;
    Ok(())
}

fn load_config(data_dir: Option<&PathBuf>) -> AppConfig {
    let default_dir = dirs::data_local_dir().map(|dir| dir.join("cim-pos"));
    AppConfig::from_lookup(|key| match key {
        "CIM_DATA_DIR" => data_dir
            .or(default_dir.as_ref())
            .map(|dir| dir.to_string_lossy().into_owned()),
        other => std::env::var(other).ok(),
    })
}

/// Commands read from stdin while the agent runs.
#[derive(Debug, PartialEq, Eq)]
enum Control {
    Online,
    Offline,
    Sync,
    Status,
}

fn parse_control(line: &str) -> Option<Control> {
    match line.trim().to_ascii_lowercase().as_str() {
        "online" | "up" => Some(Control::Online),
        "offline" | "down" => Some(Control::Offline),
        "sync" => Some(Control::Sync),
        "status" => Some(Control::Status),
        _ => None,
    }
}

async fn run_agent(state: &AppState, offline: bool) -> Result<()> {
    if offline {
        state.connectivity.became_unreachable();
    }
    let agent = state.start_sync_agent();
    info!("Agent running; type online, offline, sync or status. Ctrl-C stops it");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for Ctrl-C")?;
                break;
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => handle_control(state, &agent, &line).await?,
                Ok(None) => stdin_open = false,
                Err(err) => {
                    warn!(error = %err, "stopped reading stdin");
                    stdin_open = false;
                }
            },
        }
    }
    info!("Shutting down sync agent");

    let status = agent.status().await?;
    agent.shutdown().await;
    info!(
        pending = status.pending_count,
        "sync agent stopped"
    );
    Ok(())
}

async fn handle_control(state: &AppState, agent: &SyncAgentHandle, line: &str) -> Result<()> {
    match parse_control(line) {
        Some(Control::Online) => state.connectivity.became_reachable(),
        Some(Control::Offline) => state.connectivity.became_unreachable(),
        Some(Control::Sync) => agent.request_drain(DrainTrigger::Manual)?,
        Some(Control::Status) => {
            println!("{}", serde_json::to_string_pretty(&agent.status().await?)?);
        }
        None if line.trim().is_empty() => {}
        None => warn!(
            input = line.trim(),
            "unknown command; expected online, offline, sync or status"
        ),
    }
    Ok(())
}

async fn print_status(state: &AppState) -> Result<()> {
    let pending = state.offline_store.pending_entries().await?;
    let entries: Vec<_> = pending
        .iter()
        .map(|entry| {
            json!({
                "id": entry.id,
                "kind": entry.kind,
                "organizationId": entry.organization_id,
                "createdAt": entry.created_at,
            })
        })
        .collect();
    let output = json!({
        "pendingCount": pending.len(),
        "entries": entries,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
