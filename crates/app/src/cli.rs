use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level parser for the `tactile` binary.
#[derive(Debug, Parser)]
#[command(name = "tactile", version, about = "Student progress tracker for the tactile shape board")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Config file (defaults to ./tactile.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Database URL or path, overrides `database.url`
    #[arg(long, global = true)]
    pub db: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the HTTP API until interrupted
    Serve {
        /// Listen address, overrides `server.host` and `server.port`
        #[arg(long)]
        bind: Option<String>,
    },
    /// Create missing tables and report schema status
    Migrate,
    /// Register demo students with some learning and assessment history
    Seed,
}
