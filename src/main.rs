//! `redactlens`: drive the sanitization pipeline from the terminal or
//! serve the dashboard API.
//!
//! - `redactlens run <prompt...>`: one run, printed as a text dashboard
//! - `redactlens serve`: dashboard API until Ctrl-C
//! - `redactlens health`: probe the backend
//! - `redactlens backend-logs`: print the backend audit log

use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};

use redactlens_lib::commands;
use redactlens_lib::config::{self, DashboardConfig};
use redactlens_lib::core_state::CoreState;

#[derive(Parser)]
#[command(name = "redactlens", about = "Prompt-sanitization pipeline dashboard", version)]
struct Cli {
    /// Backend base URL (overrides REDACTLENS_BACKEND_URL).
    #[arg(long, global = true)]
    backend: Option<String>,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the pipeline once and print the dashboard.
    Run {
        /// Prompt text; multiple words are joined with spaces.
        #[arg(required = true, num_args = 1..)]
        prompt: Vec<String>,
    },

    /// Serve the dashboard API until Ctrl-C.
    Serve {
        /// Bind address (overrides REDACTLENS_BIND).
        #[arg(long)]
        bind: Option<String>,
    },

    /// Probe the backend's /health endpoint.
    Health,

    /// Print the backend's audit log.
    BackendLogs {
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    redactlens_lib::init_tracing(cli.verbose);

    let mut config = DashboardConfig::from_env().context("Invalid environment configuration")?;
    if let Some(url) = &cli.backend {
        config = config.with_backend_url(url)?;
    }
    if let Command::Serve { bind: Some(bind) } = &cli.command {
        config = config.with_bind_addr(bind)?;
    }

    tracing::debug!(
        app = config::APP_NAME,
        version = config::APP_VERSION,
        backend = %config.backend_url,
        "Configuration resolved"
    );

    let state = Arc::new(CoreState::new(config).context("Failed to build backend client")?);

    match cli.command {
        Command::Run { prompt } => {
            let prompt = prompt.join(" ");
            let report = commands::run_prompt(&state, &prompt)
                .await
                .map_err(|e| anyhow!(e))?;
            print!("{}", report.rendered);
            if !report.succeeded() {
                std::process::exit(1);
            }
        }
        Command::Serve { .. } => {
            commands::serve_until_ctrl_c(&state)
                .await
                .map_err(|e| anyhow!(e))?;
        }
        Command::Health => {
            let status = commands::check_backend(&state).await;
            match (&status.status, &status.error) {
                (Some(s), _) => println!("{}: {s}", status.backend_url),
                (None, Some(e)) => println!("{}: unreachable ({e})", status.backend_url),
                (None, None) => println!("{}: unknown", status.backend_url),
            }
            if !status.is_healthy() {
                std::process::exit(1);
            }
        }
        Command::BackendLogs { limit } => {
            let records = commands::fetch_backend_logs(&state, limit)
                .await
                .map_err(|e| anyhow!(e))?;
            print!("{}", commands::format_records(&records));
        }
    }

    Ok(())
}
