//! Titan: game launcher with preloads and playtime tracking.
//!
//! # Usage
//!
//! ```text
//! titan list [--json]
//! titan add <title> [--location <path>] [--arg <arg>]... [--preload <preload>]...
//! titan edit <title> [--rename <title>] [--location <path>] [--arg <arg>]...
//!            [--preload <preload>]... [--clear-args] [--clear-preloads]
//! titan remove <title>
//! titan start <title>
//! titan stats [title] [--json]
//! titan log [--lines <n>]
//! ```

mod commands;
mod console;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use titan_runner::Notifier;

use commands::{
    entry::{AddArgs, EditArgs, RemoveArgs},
    list::ListArgs,
    log::LogArgs,
    start::StartArgs,
    stats::StatsArgs,
};
use console::TerminalNotifier;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "titan",
    version,
    about = "Launch games with their preloads and keep track of playtime",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List registered entries.
    List(ListArgs),

    /// Register a new entry.
    Add(AddArgs),

    /// Change an existing entry.
    Edit(EditArgs),

    /// Remove an entry and its stats.
    Remove(RemoveArgs),

    /// Launch an entry with its preloads and track its playtime.
    Start(StartArgs),

    /// Show playtime statistics.
    Stats(StatsArgs),

    /// Print the tail of the launch diagnostics log.
    Log(LogArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::List(args) => args.run(),
        Commands::Add(args) => args.run(),
        Commands::Edit(args) => args.run(),
        Commands::Remove(args) => args.run(),
        Commands::Start(args) => args.run(),
        Commands::Stats(args) => args.run(),
        Commands::Log(args) => args.run(),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            TerminalNotifier::stdio().error(&format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
