//! Glasshouse CLI - Main Entry Point
//!
//! Runs browser test suites, builds the self-contained HTML report, and
//! exports results as CSV.

use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{export, report, run};

/// Glasshouse - browser test harness with self-contained HTML reporting
#[derive(Parser)]
#[command(name = "glasshouse")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a test suite and generate the report
    Run(run::RunArgs),

    /// Build the HTML report from an existing results directory
    Report(report::ReportArgs),

    /// Export a results directory as CSV
    Export(export::ExportArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run(args) => run::execute(args).await?,
        Commands::Report(args) => report::execute(args)?,
        Commands::Export(args) => export::execute(args)?,
    }

    Ok(())
}
