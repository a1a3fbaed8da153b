//! CLI entry point for vmwatch.
//!
//! This binary lists and watches virtual machines through a property
//! collector subscription, printing every delivered update as a JSON line.
//! The endpoint is a simulated collector serving an inventory document.
//!
//! # Usage
//!
//! ```bash
//! vmwatch [OPTIONS] --inventory <FILE> <COMMAND>
//!
//! # Print every VM once
//! vmwatch --inventory inventory.json list
//!
//! # Follow changes until Ctrl-C
//! vmwatch --inventory inventory.json watch --max-wait 30
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

mod output;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use vw_core::{Config, ConfigError, WatchConfig};
use vw_sim::{Inventory, Simulator};
use vw_watcher::{ChangeWatcher, WatchMode, WatchSummary};

use crate::output::JsonLinesSink;

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Lists and watches virtual machine inventory changes.
#[derive(Parser)]
#[command(name = "vmwatch", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    command: Commands,

    /// JSON configuration file.
    #[arg(short, long, global = true, env = "VMWATCH_CONFIG")]
    config: Option<Utf8PathBuf>,

    /// Inventory document served by the simulated endpoint.
    #[arg(short, long, global = true, env = "VMWATCH_INVENTORY")]
    inventory: Option<Utf8PathBuf>,

    /// Endpoint host name (overrides the configuration file).
    #[arg(long, global = true, env = "VMWATCH_HOST")]
    host: Option<String>,

    /// User name (overrides the configuration file).
    #[arg(short, long, global = true, env = "VMWATCH_USER")]
    user: Option<String>,

    /// Password (overrides the configuration file).
    #[arg(long, global = true, env = "VMWATCH_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Print a complete snapshot of every VM, then exit.
    List(PollArgs),

    /// Print the snapshot, then every change until interrupted.
    Watch(PollArgs),
}

/// Poll options shared by both subcommands.
#[derive(Args)]
struct PollArgs {
    /// Seconds each wait may block with nothing to report.
    #[arg(long, conflicts_with = "no_max_wait")]
    max_wait: Option<u32>,

    /// Block each wait until a change arrives.
    #[arg(long)]
    no_max_wait: bool,

    /// Maximum object updates per response.
    #[arg(long)]
    page_size: Option<u32>,
}

impl PollArgs {
    fn apply(&self, watch: &mut WatchConfig) {
        if self.no_max_wait {
            watch.max_wait_seconds = None;
        } else if let Some(seconds) = self.max_wait {
            watch.max_wait_seconds = Some(seconds);
        }
        if self.page_size.is_some() {
            watch.max_object_updates = self.page_size;
        }
    }
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// Respects the `RUST_LOG` environment variable if set. Otherwise, uses
/// `debug` level if `--verbose` is set, or `info` level by default. Logs go
/// to stderr so stdout carries only JSON lines.
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!("{level},tokio=warn"))
    });

    // Check if colors should be disabled (flag or NO_COLOR env var)
    let use_ansi = !no_color && std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(use_ansi)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

/// Builds a [`Config`] from the configuration file and CLI overrides.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the result is invalid.
fn build_config(cli: &Cli, poll: &PollArgs) -> Result<Config, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => Config::from_json_file(path)?,
        None => Config::default(),
    };

    if let Some(host) = &cli.host {
        config.connection.host.clone_from(host);
    }
    if let Some(user) = &cli.user {
        config.connection.user.clone_from(user);
    }
    if let Some(password) = &cli.password {
        config.connection.password.clone_from(password);
    }
    if config.connection.host.is_empty() {
        config.connection.host = "simulator".to_owned();
    }

    poll.apply(&mut config.watch);
    config.watch.validate()?;
    Ok(config)
}

/// Loads the inventory served by the simulated endpoint.
fn load_simulator(cli: &Cli) -> color_eyre::Result<Simulator> {
    let Some(path) = &cli.inventory else {
        return Err(color_eyre::eyre::eyre!(
            "no inventory given; pass --inventory or set VMWATCH_INVENTORY"
        ));
    };
    let inventory = Inventory::from_json_file(path)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to load inventory {path}: {e}"))?;
    info!(path = %path, objects = inventory.len(), "Inventory loaded");
    Ok(Simulator::new(inventory))
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

/// Cancels `cancel` on Ctrl-C, or on SIGTERM on Unix.
fn spawn_signal_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};

            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => info!("Received Ctrl-C, stopping"),
                        _ = sigterm.recv() => info!("Received SIGTERM, stopping"),
                    }
                }
                Err(error) => {
                    tracing::warn!(%error, "SIGTERM handler unavailable");
                    let _ = tokio::signal::ctrl_c().await;
                    info!("Received Ctrl-C, stopping");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received Ctrl-C, stopping");
        }

        cancel.cancel();
    });
}

/// Runs a list or watch against the simulated endpoint.
///
/// # Errors
///
/// Returns an error if the session cannot be opened, the watch fails, or
/// stdout cannot be written.
async fn run(sim: &Simulator, config: Config, mode: WatchMode) -> color_eyre::Result<WatchSummary> {
    let credentials = config.connection.credentials();
    info!(host = %credentials.host, ?mode, "Starting");

    let watcher = ChangeWatcher::connect(&sim.connector(), &credentials, config.watch).await?;

    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    let mut sink = JsonLinesSink::new(std::io::stdout());
    let summary = watcher.run(mode, &mut sink, &cancel).await?;
    let written = sink.written();
    sink.finish()?;

    info!(
        outcome = ?summary.outcome,
        version = %summary.version,
        reconciled = summary.reconciled,
        lines = written,
        "Finished"
    );
    Ok(summary)
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    // 1. Install color-eyre FIRST (before any potential panics)
    color_eyre::install()?;

    // 2. Parse CLI arguments
    let cli = Cli::parse();

    // 3. Initialize tracing (handles --no-color for log output)
    init_tracing(cli.verbose, cli.no_color);

    // 4. Route to appropriate command
    let (mode, poll) = match &cli.command {
        Commands::List(poll) => (WatchMode::List, poll),
        Commands::Watch(poll) => (WatchMode::Watch, poll),
    };
    let config = build_config(&cli, poll)?;
    let sim = load_simulator(&cli)?;

    run(&sim, config, mode).await?;
    Ok(())
}
