// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tally - record product views in SQLite.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::error;

/// Tally - record product views in SQLite.
#[derive(Parser, Debug)]
#[command(name = "tally", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Create the database and its tables.
    Init,
    /// Add a product with a zero view counter.
    AddProduct {
        #[arg(long)]
        id: i64,
        #[arg(long, default_value = "")]
        name: String,
    },
    /// Record that a user viewed a product.
    Record {
        #[arg(long)]
        user: i64,
        #[arg(long)]
        product: i64,
    },
    /// Show view counters, and the viewers of one product with --product.
    Views {
        #[arg(long)]
        product: Option<i64>,
    },
    /// Check that the configured database is reachable and has its tables.
    Doctor,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match cli.config.as_deref() {
        Some(path) => tally_config::load_and_validate_path(path),
        None => tally_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            tally_config::render_errors(errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.log.level);

    let mut stdout = std::io::stdout();
    if let Err(e) = commands::run(cli.command, &config, &mut stdout).await {
        error!(error = %e, "command failed");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("tally={log_level},tally_storage={log_level},warn"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
