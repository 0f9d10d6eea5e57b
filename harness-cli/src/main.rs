//! # cloudtest
//!
//! Command-line front end for the cloudtest harness.
//!
//! ## Commands
//!
//! - `info`: Show the declared topology
//! - `resolve`: Print the hosts carrying a role
//! - `lookup`: Find a node by hostname fragment
//! - `watch`: Tail component logs from several hosts and save them
//!
//! ## Example
//!
//! ```bash
//! # Which host runs the cloud controller?
//! cloudtest --config harness.toml resolve clc
//!
//! # Tail the cloud, cluster and node controller logs for five minutes
//! cloudtest watch --role clc --role cc00 --role nc00 --duration 300 --prefix run-42-
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use harness_core::TopologyStore;
use harness_types::Role;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::{info, lookup, resolve, watch};
use config::Config;

/// Topology inspection and multi-host log capture for cloud test runs.
#[derive(Parser, Debug)]
#[command(name = "cloudtest")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Harness configuration file
    #[arg(long, short, global = true, default_value = "harness.toml")]
    config: PathBuf,

    /// Enable debug logging (overrides RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the declared topology
    Info,

    /// Print every host carrying a role
    Resolve {
        /// Role tag (clc, ws, scNN, ccNN, ncNN)
        role: Role,
    },

    /// Find the first node whose hostname contains a pattern
    Lookup {
        /// Hostname fragment
        pattern: String,
    },

    /// Tail logs for the given roles until stopped, then save them
    Watch {
        /// Role to watch (repeatable)
        #[arg(long = "role", short, required = true)]
        roles: Vec<Role>,

        /// Stop after this many seconds (default: wait for Ctrl-C)
        #[arg(long, short)]
        duration: Option<u64>,

        /// Output file prefix (default: from config)
        #[arg(long, short)]
        prefix: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::from_file(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    let store = TopologyStore::new(config.topology.clone()).context("Invalid topology")?;

    match cli.command {
        Commands::Info => {
            info::run(&store).await?;
        }
        Commands::Resolve { role } => {
            resolve::run(&store, role).await?;
        }
        Commands::Lookup { pattern } => {
            lookup::run(&store, &pattern).await?;
        }
        Commands::Watch {
            roles,
            duration,
            prefix,
        } => {
            let prefix = prefix.unwrap_or_else(|| config.logs.prefix.clone());
            watch::run(
                &config,
                &store,
                &roles,
                duration.map(Duration::from_secs),
                &prefix,
            )
            .await?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
