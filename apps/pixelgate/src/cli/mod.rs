//! # pixelgate CLI Module
//!
//! This module implements the CLI interface for pixelgate.
//!
//! ## Available Commands
//!
//! - `run` - Run a graph with dry-run device providers
//! - `validate` - Load a graph document and report its schedule
//! - `inspect` - Print the node table and execution order
//! - `init` - Write a starter graph containing every node type

mod commands;

use crate::config::AppConfig;
use clap::{Parser, Subcommand};
use pixelgate_core::PixelgateError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// pixelgate - screen automation as function block diagrams
///
/// Graphs of input, logic, timer and output blocks evaluated at a fixed rate.
#[derive(Parser, Debug)]
#[command(name = "pixelgate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to ./pixelgate.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Tick rate override in Hz
    #[arg(long, global = true)]
    pub hz: Option<u32>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a graph until Ctrl+C, a tick count or a duration
    Run {
        /// Graph document to run
        #[arg(short, long)]
        graph: PathBuf,

        /// Stop after this many ticks
        #[arg(short, long, conflicts_with = "duration_ms")]
        ticks: Option<u64>,

        /// Stop after this many milliseconds
        #[arg(short, long)]
        duration_ms: Option<u64>,
    },

    /// Check a graph document and report its schedule
    Validate {
        /// Graph document to check
        #[arg(short, long)]
        graph: PathBuf,
    },

    /// Show the nodes and execution order of a graph
    Inspect {
        /// Graph document to inspect
        #[arg(short, long)]
        graph: PathBuf,
    },

    /// Write a starter graph
    Init {
        /// Output file path
        #[arg(short, long, default_value = "graph.json")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments and the loaded configuration.
pub async fn execute(cli: Cli, mut config: AppConfig) -> Result<(), PixelgateError> {
    if let Some(hz) = cli.hz {
        config.engine.target_hz = hz;
        config.engine.validate()?;
    }
    let json_mode = cli.json_mode;

    match cli.command {
        Commands::Run {
            graph,
            ticks,
            duration_ms,
        } => cmd_run(&graph, &config, json_mode, ticks, duration_ms).await,
        Commands::Validate { graph } => cmd_validate(&graph, json_mode),
        Commands::Inspect { graph } => cmd_inspect(&graph, json_mode),
        Commands::Init { output, force } => cmd_init(&output, force),
    }
}
