//! Per-step execution timing log.
//!
//! Step timings are emitted by the generated browser script as
//! `[TIMING] <seconds> <name>` lines on stdout and collected here into the
//! log attached to each result record. The rendered form,
//! `function - <name>: <seconds> seconds`, is what the slow-function
//! analysis in the report pipeline parses back.

use tracing::warn;

/// Marker prefix for timing lines in subprocess stdout.
pub const TIMING_PREFIX: &str = "[TIMING] ";

/// Chatty selector-level actions only logged when they exceed this.
const NOISY_THRESHOLD_SECS: f64 = 5.0;

/// Anything slower than this raises a warning.
const SLOW_WARN_SECS: f64 = 10.0;

/// Actions too frequent to log at normal speed.
const NOISY_ACTIONS: &[&str] = &[
    "click", "fill", "wait", "press", "check", "select", "navigate",
];

/// Execution log for one test attempt.
#[derive(Debug, Default)]
pub struct ExecutionLog {
    lines: Vec<String>,
}

impl ExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one timed step. Noisy actions (click, fill, ...) are dropped
    /// unless slow enough to matter.
    pub fn record(&mut self, name: &str, seconds: f64) {
        let action = name.split(':').next().unwrap_or(name);
        let noisy = NOISY_ACTIONS.contains(&action);
        if noisy && seconds <= NOISY_THRESHOLD_SECS {
            return;
        }
        if seconds > SLOW_WARN_SECS {
            warn!("{} took over {}s to execute: {:.4}s", name, SLOW_WARN_SECS, seconds);
        }
        self.lines
            .push(format!("function - {}: {:.4} seconds", name, seconds));
    }

    /// Record a free-form message.
    pub fn message(&mut self, text: impl Into<String>) {
        self.lines.push(text.into());
    }

    /// Ingest `[TIMING]` lines from subprocess stdout; other lines are
    /// ignored.
    pub fn ingest_stdout(&mut self, stdout: &str) {
        for line in stdout.lines() {
            if let Some(rest) = line.strip_prefix(TIMING_PREFIX) {
                if let Some((secs, name)) = rest.split_once(' ') {
                    if let Ok(seconds) = secs.parse::<f64>() {
                        self.record(name, seconds);
                    }
                }
            }
        }
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}
