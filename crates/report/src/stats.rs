//! Run statistics.

use std::collections::HashMap;

use serde::Serialize;

use glasshouse_common::{Outcome, TestResult};

/// Tests slower than this land in the slow-test section.
pub const SLOW_TEST_THRESHOLD_SECS: f64 = 120.0;

/// Step timings slower than this feed the slow-function ranking.
pub const SLOW_FUNCTION_THRESHOLD_SECS: f64 = 10.0;

/// A function must be slow this many times before it is reported.
const SLOW_FUNCTION_MIN_OCCURRENCES: usize = 3;

/// Log line prefix written by the execution timing log.
const FUNCTION_LINE_PREFIX: &str = "function - ";

/// Aggregate statistics over one run's result set.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStats {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub error: usize,
    pub skipped: usize,
    pub xfailed: usize,
    pub xpassed: usize,
    pub rerun: usize,
    /// Passed over total, as a percentage rounded to 2 decimals
    pub success_rate: f64,
    /// Earliest start timestamp (unix seconds)
    pub start_time: f64,
    /// Latest end timestamp (unix seconds)
    pub end_time: f64,
    /// Wall-clock span of the run in seconds
    pub wall_duration: f64,
    pub p50: f64,
    pub p90: f64,
    pub p95: f64,
    /// Slowest executed test, with its duration
    pub slowest: Option<(String, f64)>,
    /// Fastest executed test, with its duration
    pub fastest: Option<(String, f64)>,
    /// Tests over [`SLOW_TEST_THRESHOLD_SECS`], slowest first
    pub slow_tests: Vec<(String, f64)>,
    pub slow_functions: Vec<SlowFunction>,
}

/// A step/function that was repeatedly slow across the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlowFunction {
    pub name: String,
    pub occurrences: usize,
    pub total_secs: f64,
    pub max_secs: f64,
    pub avg_secs: f64,
}

impl RunStats {
    /// Compute statistics for a result set. An empty set yields the
    /// all-zero default.
    pub fn compute(results: &[TestResult]) -> Self {
        if results.is_empty() {
            return Self::default();
        }

        let mut stats = Self {
            total: results.len(),
            ..Self::default()
        };

        for result in results {
            match result.outcome {
                Outcome::Passed => stats.passed += 1,
                Outcome::Failed => stats.failed += 1,
                Outcome::Error => stats.error += 1,
                Outcome::Skipped => stats.skipped += 1,
                Outcome::Xfailed => stats.xfailed += 1,
                Outcome::Xpassed => stats.xpassed += 1,
                Outcome::Rerun => stats.rerun += 1,
            }
        }

        stats.success_rate = round2(stats.passed as f64 / stats.total as f64 * 100.0);

        stats.start_time = results
            .iter()
            .map(|r| r.timestamp)
            .fold(f64::INFINITY, f64::min);
        stats.end_time = results
            .iter()
            .map(|r| r.end_timestamp())
            .fold(f64::NEG_INFINITY, f64::max);
        stats.wall_duration = (stats.end_time - stats.start_time).max(0.0);

        // Duration distribution over executed attempts; skipped tests
        // never ran and would drag every quantile toward zero.
        let executed: Vec<&TestResult> = results
            .iter()
            .filter(|r| r.outcome != Outcome::Skipped)
            .collect();

        let mut durations: Vec<f64> = executed.iter().map(|r| r.duration).collect();
        durations.sort_by(f64::total_cmp);
        stats.p50 = percentile(&durations, 50);
        stats.p90 = percentile(&durations, 90);
        stats.p95 = percentile(&durations, 95);

        stats.slowest = executed
            .iter()
            .max_by(|a, b| a.duration.total_cmp(&b.duration))
            .map(|r| (r.test_id.clone(), r.duration));
        stats.fastest = executed
            .iter()
            .min_by(|a, b| a.duration.total_cmp(&b.duration))
            .map(|r| (r.test_id.clone(), r.duration));

        stats.slow_tests = executed
            .iter()
            .filter(|r| r.duration > SLOW_TEST_THRESHOLD_SECS)
            .map(|r| (r.test_id.clone(), r.duration))
            .collect();
        stats
            .slow_tests
            .sort_by(|a, b| b.1.total_cmp(&a.1));

        stats.slow_functions = slow_functions(results, SLOW_FUNCTION_THRESHOLD_SECS);

        stats
    }

    /// Count per outcome.
    pub fn count(&self, outcome: Outcome) -> usize {
        match outcome {
            Outcome::Passed => self.passed,
            Outcome::Failed => self.failed,
            Outcome::Error => self.error,
            Outcome::Skipped => self.skipped,
            Outcome::Xfailed => self.xfailed,
            Outcome::Xpassed => self.xpassed,
            Outcome::Rerun => self.rerun,
        }
    }

    /// Whether the run had any failing outcome left after retries.
    pub fn has_failures(&self) -> bool {
        self.failed > 0 || self.error > 0
    }
}

/// Rank functions that were slow (over `threshold` seconds) at least
/// [`SLOW_FUNCTION_MIN_OCCURRENCES`] times across the run, most frequent
/// first.
///
/// Parses the `function - <name>: <secs> seconds` lines written by the
/// harness execution log.
pub fn slow_functions(results: &[TestResult], threshold: f64) -> Vec<SlowFunction> {
    let mut samples: HashMap<String, Vec<f64>> = HashMap::new();

    for result in results {
        for line in &result.logs {
            if let Some((name, secs)) = parse_function_line(line) {
                if secs > threshold {
                    samples.entry(name).or_default().push(secs);
                }
            }
        }
    }

    let mut ranked: Vec<SlowFunction> = samples
        .into_iter()
        .filter(|(_, secs)| secs.len() >= SLOW_FUNCTION_MIN_OCCURRENCES)
        .map(|(name, secs)| {
            let total: f64 = secs.iter().sum();
            let max = secs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            SlowFunction {
                name,
                occurrences: secs.len(),
                total_secs: total,
                max_secs: max,
                avg_secs: total / secs.len() as f64,
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.occurrences
            .cmp(&a.occurrences)
            .then(b.total_secs.total_cmp(&a.total_secs))
    });
    ranked
}

/// Parse one `function - <name>: <secs> seconds` log line.
fn parse_function_line(line: &str) -> Option<(String, f64)> {
    let rest = line.trim_start().strip_prefix(FUNCTION_LINE_PREFIX)?;
    let (name, timing) = rest.rsplit_once(": ")?;
    let secs = timing.strip_suffix(" seconds")?.trim().parse::<f64>().ok()?;
    Some((name.to_string(), secs))
}

/// Nearest-rank percentile over sorted values.
fn percentile(sorted: &[f64], p: usize) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (p as f64 / 100.0 * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
