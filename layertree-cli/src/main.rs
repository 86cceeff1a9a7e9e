//! LayerTree CLI - command-line harness for the layer-tree engine.
//!
//! Loads a layer-switcher configuration and a registry fixture, runs the
//! engine against them, and lets you inspect the merged tree or replay a
//! script of dispatch operations. A thin consumer of the `layertree`
//! library; no engine logic lives here.

mod commands;
mod error;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::error::CliError;

#[derive(Debug, Parser)]
#[command(name = "layertree", version, about = "Inspect and drive a layer-tree synchronization engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the merged layer tree and current snapshots
    Inspect(commands::inspect::InspectArgs),
    /// Replay a script of dispatch operations and report snapshot changes
    Simulate(commands::simulate::SimulateArgs),
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Inspect(args) => commands::inspect::run(args),
        Command::Simulate(args) => commands::simulate::run(args),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    if let Err(error) = run(Cli::parse()) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}
