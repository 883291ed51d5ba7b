//! `glasshouse report` - build the HTML report from existing sinks.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use glasshouse_report::{aggregate_results, ReportConfig, ReportRenderer, RunStats};

use crate::output::{print_success, print_summary};

#[derive(Args)]
pub struct ReportArgs {
    /// Directory holding the worker result sinks
    #[arg(long, default_value = "test-results")]
    results_dir: PathBuf,

    /// Report output path
    #[arg(long, default_value = "test-results/report.html")]
    output: PathBuf,

    /// Report title
    #[arg(long, default_value = "Glasshouse Test Report")]
    title: String,
}

pub fn execute(args: ReportArgs) -> Result<()> {
    let results = aggregate_results(&args.results_dir)
        .with_context(|| format!("failed to read {}", args.results_dir.display()))?;

    if !results.is_empty() {
        print_summary(&RunStats::compute(&results));
    }

    let renderer = ReportRenderer::new(ReportConfig {
        title: args.title,
        output_path: args.output,
    });
    let path = renderer.write(&results).context("report generation failed")?;
    print_success(&format!(
        "Report for {} result(s) written to {}",
        results.len(),
        path.display()
    ));
    Ok(())
}
