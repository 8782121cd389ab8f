mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::rollup::{ComputeArgs, SolveArgs, ValidateTiersArgs};

/// Deterministic margin roll-up for quotation calculations
#[derive(Parser)]
#[command(
    name = "rollup",
    version,
    about = "Deterministic margin roll-up for quotation calculations",
    long_about = "Rolls group totals up through the global margin, the user margin and \
                  the overall total with exact decimal arithmetic. Can check and enforce \
                  a minimum overall margin."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log lookups and adjustments to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Roll up a calculation snapshot
    Compute(ComputeArgs),
    /// Solve the user margin needed to meet a minimum overall margin
    Solve(SolveArgs),
    /// Check a margin tier file for overlapping or inverted ranges
    ValidateTiers(ValidateTiersArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Compute(args) => commands::rollup::run_compute(args),
        Commands::Solve(args) => commands::rollup::run_solve(args),
        Commands::ValidateTiers(args) => commands::rollup::run_validate_tiers(args),
        Commands::Version => {
            println!("rollup {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            tracing::debug!(error = %e, "command failed");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
