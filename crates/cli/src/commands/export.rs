//! `glasshouse export` - CSV export of a results directory.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use glasshouse_report::{aggregate_results, export_csv};

use crate::output::print_success;

#[derive(Args)]
pub struct ExportArgs {
    /// Directory holding the worker result sinks
    #[arg(long, default_value = "test-results")]
    results_dir: PathBuf,

    /// CSV output path
    #[arg(long, default_value = "test-results/results.csv")]
    output: PathBuf,
}

pub fn execute(args: ExportArgs) -> Result<()> {
    let results = aggregate_results(&args.results_dir)
        .with_context(|| format!("failed to read {}", args.results_dir.display()))?;
    if results.is_empty() {
        bail!("no results found in {}", args.results_dir.display());
    }

    if let Some(parent) = args.output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&args.output, export_csv(&results))
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    print_success(&format!(
        "Exported {} result(s) to {}",
        results.len(),
        args.output.display()
    ));
    Ok(())
}
