// SPDX-FileCopyrightText: 2026 Spike Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Spike - root key custody server and operator CLI.
//!
//! `spike serve` runs the server. The `operator` subcommands talk to a
//! running server to export recovery shards, submit shards for restore and
//! toggle the emergency lock.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod operator;
mod prompt;
mod serve;
mod shutdown;
mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use spike_config::SpikeConfig;

/// Spike - root key custody server and operator CLI.
#[derive(Parser, Debug)]
#[command(name = "spike", version, about, long_about = None)]
struct Cli {
    /// Configuration file. Defaults to the standard search path.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the Spike server. Without `--bootstrap` it waits for restore.
    Serve {
        /// Generate a new root key. Refused while recovery shard files exist.
        #[arg(long)]
        bootstrap: bool,
    },
    /// Break-glass operator commands.
    Operator {
        #[command(subcommand)]
        action: OperatorCommands,
    },
    /// Show server readiness, lock state and restore progress.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
        /// Disable colors.
        #[arg(long)]
        plain: bool,
    },
}

#[derive(Subcommand, Debug)]
enum OperatorCommands {
    /// Export the root key shards to one file per shard.
    Recover {
        /// Output directory. Defaults to `recovery.directory`.
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Submit one shard to a server awaiting restore.
    ///
    /// The shard is read from `SPIKE_SHARD` or prompted for without echo.
    Restore,
    /// Block mutating operations on the server.
    Lock,
    /// Lift the emergency lock.
    Unlock,
}

fn load_config(path: Option<&std::path::Path>) -> SpikeConfig {
    let loaded = match path {
        Some(path) => spike_config::load_and_validate_path(path),
        None => spike_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            spike_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());

    let result = match cli.command {
        Commands::Serve { bootstrap } => serve::run_serve(config, bootstrap).await,
        Commands::Operator { action } => {
            serve::init_tracing("warn");
            match action {
                OperatorCommands::Recover { dir } => operator::run_recover(&config, dir).await,
                OperatorCommands::Restore => operator::run_restore(&config).await,
                OperatorCommands::Lock => operator::run_set_lock(&config, true).await,
                OperatorCommands::Unlock => operator::run_set_lock(&config, false).await,
            }
        }
        Commands::Status { json, plain } => status::run_status(&config, json, plain).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
