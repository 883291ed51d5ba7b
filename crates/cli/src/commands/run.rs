//! `glasshouse run` - execute a test suite and build the report.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;

use glasshouse_harness::{BrowserConfig, BrowserKind, RunnerConfig, TestRunner};
use glasshouse_report::{ReportConfig, ReportRenderer, RunStats};

use crate::output::{event_line, print_failure, print_success, print_summary};

#[derive(Args)]
pub struct RunArgs {
    /// Directory holding the YAML test specs
    #[arg(long, default_value = "specs")]
    specs: PathBuf,

    /// Page object registry file
    #[arg(long)]
    pages: Option<PathBuf>,

    /// Only run specs carrying this tag
    #[arg(long)]
    tag: Option<String>,

    /// Number of parallel workers
    #[arg(short, long, default_value_t = 1)]
    workers: usize,

    /// Failing attempts recorded as reruns before the outcome sticks
    #[arg(long, default_value_t = 0)]
    max_reruns: u32,

    /// Per-test timeout in seconds
    #[arg(long, default_value_t = 120)]
    timeout: u64,

    /// Browser engine (chromium, firefox, webkit)
    #[arg(long, default_value = "chromium")]
    browser: String,

    /// Base URL the specs navigate relative to
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    base_url: String,

    /// Run with a visible browser window
    #[arg(long)]
    headed: bool,

    /// Directory for worker result sinks
    #[arg(long, default_value = "test-results")]
    results_dir: PathBuf,

    /// Report output path
    #[arg(long, default_value = "test-results/report.html")]
    report: PathBuf,

    /// Report title
    #[arg(long, default_value = "Glasshouse Test Report")]
    title: String,

    /// Skip report generation
    #[arg(long)]
    no_report: bool,
}

pub async fn execute(args: RunArgs) -> Result<()> {
    let browser = BrowserKind::from_str(&args.browser)?;
    let results_dir = args.results_dir.clone();

    let config = RunnerConfig {
        specs_dir: args.specs.clone(),
        pages_file: args.pages.clone(),
        results_dir: results_dir.clone(),
        workers: args.workers,
        max_reruns: args.max_reruns,
        default_timeout_secs: args.timeout,
        tag: args.tag.clone(),
        browser: BrowserConfig {
            base_url: args.base_url.clone(),
            browser,
            headless: !args.headed,
            screenshot_dir: results_dir.join("screenshots"),
            ..BrowserConfig::default()
        },
        ..RunnerConfig::default()
    };

    // Progress lines arrive per finished attempt; the spinner keeps the
    // terminal alive between them.
    let (tx, mut rx) = mpsc::unbounded_channel();
    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::with_template("{spinner} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    progress.enable_steady_tick(std::time::Duration::from_millis(120));
    let reporter = {
        let progress = progress.clone();
        tokio::spawn(async move {
            let mut finished = 0usize;
            while let Some(event) = rx.recv().await {
                finished += 1;
                progress.println(event_line(&event));
                progress.set_message(format!("{} attempt(s) finished", finished));
            }
        })
    };

    let runner = TestRunner::new(config);
    let results = runner
        .run_all(Some(tx))
        .await
        .context("test run failed")?;
    let _ = reporter.await;
    progress.finish_and_clear();

    let stats = RunStats::compute(&results);
    print_summary(&stats);

    if !args.no_report {
        let renderer = ReportRenderer::new(ReportConfig {
            title: args.title.clone(),
            output_path: args.report.clone(),
        });
        let path = renderer
            .write(&results)
            .context("report generation failed")?;
        print_success(&format!("Report written to {}", path.display()));
    }

    if stats.has_failures() {
        print_failure(&format!(
            "{} failed, {} errored",
            stats.failed, stats.error
        ));
        std::process::exit(1);
    }
    Ok(())
}
