//! Core test result data model.
//!
//! A [`TestResult`] is created by the harness when all phases of a test have
//! completed and is immutable from that point on; the report pipeline only
//! ever reads these records.

use serde::{Deserialize, Serialize};

use crate::environment::EnvironmentInfo;

/// Terminal outcome of a single test attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Passed,
    Failed,
    /// Infrastructure failure (browser spawn, script crash, timeout)
    /// as opposed to an assertion failure.
    Error,
    Skipped,
    /// Expected failure that did fail.
    Xfailed,
    /// Expected failure that unexpectedly passed.
    Xpassed,
    /// Non-final failing attempt of a test that was retried.
    Rerun,
}

impl Outcome {
    /// All outcomes, in report display order.
    pub const ALL: [Outcome; 7] = [
        Outcome::Passed,
        Outcome::Failed,
        Outcome::Error,
        Outcome::Skipped,
        Outcome::Xfailed,
        Outcome::Xpassed,
        Outcome::Rerun,
    ];

    /// String representation used in sinks and the report payload.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Error => "error",
            Self::Skipped => "skipped",
            Self::Xfailed => "xfailed",
            Self::Xpassed => "xpassed",
            Self::Rerun => "rerun",
        }
    }

    /// Parse from string representation. Unknown strings map to `Error`
    /// so a malformed record never invents a passing outcome.
    pub fn parse(s: &str) -> Self {
        match s {
            "passed" => Self::Passed,
            "failed" => Self::Failed,
            "error" => Self::Error,
            "skipped" => Self::Skipped,
            "xfailed" => Self::Xfailed,
            "xpassed" => Self::Xpassed,
            "rerun" => Self::Rerun,
            _ => Self::Error,
        }
    }

    /// Whether this outcome counts against the run (fails the CLI exit code).
    pub fn is_failing(&self) -> bool {
        matches!(self, Self::Failed | Self::Error)
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Test execution phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Setup,
    Call,
    Teardown,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Call => "call",
            Self::Teardown => "teardown",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-phase durations in seconds. Negative inputs are clamped to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseDurations {
    pub setup: f64,
    pub call: f64,
    pub teardown: f64,
}

impl PhaseDurations {
    pub fn new(setup: f64, call: f64, teardown: f64) -> Self {
        Self {
            setup: setup.max(0.0),
            call: call.max(0.0),
            teardown: teardown.max(0.0),
        }
    }

    /// Record the duration of one phase.
    pub fn set(&mut self, phase: Phase, seconds: f64) {
        let seconds = seconds.max(0.0);
        match phase {
            Phase::Setup => self.setup = seconds,
            Phase::Call => self.call = seconds,
            Phase::Teardown => self.teardown = seconds,
        }
    }

    /// Total duration across all phases.
    pub fn total(&self) -> f64 {
        self.setup + self.call + self.teardown
    }
}

/// Test case metadata surfaced in the report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestMeta {
    /// Case id in the external test management system
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_id: Option<String>,
    /// Human-readable case title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_title: Option<String>,
    /// Link to the case definition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_link: Option<String>,
    /// URL the page ended on when the test finished or failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_url: Option<String>,
    /// Reason attached to an xfail marker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xfail_reason: Option<String>,
}

/// One record per executed test attempt.
///
/// Built by the harness once all phases for the attempt have completed;
/// treated as read-only by the aggregation and rendering pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    /// Stable test identifier (spec name)
    pub test_id: String,
    /// Terminal outcome of this attempt
    pub outcome: Outcome,
    /// Unix timestamp (seconds) at which the attempt started
    pub timestamp: f64,
    /// Total duration in seconds
    pub duration: f64,
    /// Durations broken down by phase
    pub phase_durations: PhaseDurations,
    /// Spec description
    #[serde(default)]
    pub description: String,
    /// Spec tags
    #[serde(default)]
    pub tags: Vec<String>,
    /// Case metadata
    #[serde(default)]
    pub meta: TestMeta,
    /// Error text when the attempt did not pass
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Phase in which the failure occurred
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_phase: Option<Phase>,
    /// Short classification of the failure (e.g. "AssertionFailed")
    #[serde(default)]
    pub exception_type: String,
    /// Reason when the test was skipped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
    /// Execution log lines (step timings, harness messages)
    #[serde(default)]
    pub logs: Vec<String>,
    /// Captured stdout of the browser subprocess
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capstdout: Option<String>,
    /// Captured stderr of the browser subprocess
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capstderr: Option<String>,
    /// Base64-encoded JPEG screenshot taken on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    /// Worker that executed the attempt
    pub worker_id: String,
    /// 1-based attempt number
    #[serde(default = "default_execution_count")]
    pub execution_count: u32,
    /// Environment snapshot at execution time
    #[serde(default)]
    pub environment: EnvironmentInfo,
}

fn default_execution_count() -> u32 {
    1
}

impl TestResult {
    /// Key used to dedupe results when merging worker sinks.
    ///
    /// The timestamp participates as its bit pattern so retried attempts of
    /// the same test stay distinct without relying on float equality.
    pub fn dedupe_key(&self) -> (String, u64) {
        (self.test_id.clone(), self.timestamp.to_bits())
    }

    /// End timestamp of the attempt.
    pub fn end_timestamp(&self) -> f64 {
        self.timestamp + self.duration.max(0.0)
    }

    /// Verify the record invariants: non-negative durations and phase
    /// durations summing to the total within tolerance.
    pub fn check_invariants(&self) -> bool {
        self.duration >= 0.0
            && self.phase_durations.setup >= 0.0
            && self.phase_durations.call >= 0.0
            && self.phase_durations.teardown >= 0.0
            && (self.phase_durations.total() - self.duration).abs() < 1e-6
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("passed", Outcome::Passed)]
    #[test_case("failed", Outcome::Failed)]
    #[test_case("error", Outcome::Error)]
    #[test_case("skipped", Outcome::Skipped)]
    #[test_case("xfailed", Outcome::Xfailed)]
    #[test_case("xpassed", Outcome::Xpassed)]
    #[test_case("rerun", Outcome::Rerun)]
    fn outcome_round_trips(s: &str, outcome: Outcome) {
        assert_eq!(Outcome::parse(s), outcome);
        assert_eq!(outcome.as_str(), s);
    }

    #[test]
    fn unknown_outcome_maps_to_error() {
        assert_eq!(Outcome::parse("exploded"), Outcome::Error);
    }

    #[test]
    fn outcome_serializes_lowercase() {
        let json = serde_json::to_string(&Outcome::Xfailed).unwrap();
        assert_eq!(json, "\"xfailed\"");
        let back: Outcome = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Outcome::Xfailed);
    }

    #[test]
    fn phase_durations_clamp_negative() {
        let d = PhaseDurations::new(-1.0, 2.0, 0.5);
        assert_eq!(d.setup, 0.0);
        assert!((d.total() - 2.5).abs() < 1e-9);
    }

    fn sample_result() -> TestResult {
        TestResult {
            test_id: "checkout-flow".to_string(),
            outcome: Outcome::Passed,
            timestamp: 1_700_000_000.25,
            duration: 3.5,
            phase_durations: PhaseDurations::new(1.0, 2.0, 0.5),
            description: "Full checkout".to_string(),
            tags: vec!["shop".to_string()],
            meta: TestMeta::default(),
            error: None,
            error_phase: None,
            exception_type: String::new(),
            skip_reason: None,
            logs: vec![],
            capstdout: None,
            capstderr: None,
            screenshot: None,
            worker_id: "gw0".to_string(),
            execution_count: 1,
            environment: EnvironmentInfo::default(),
        }
    }

    #[test]
    fn result_invariants_hold() {
        let result = sample_result();
        assert!(result.check_invariants());
        assert!((result.end_timestamp() - 1_700_000_003.75).abs() < 1e-6);
    }

    #[test]
    fn result_json_round_trips() {
        let result = sample_result();
        let json = serde_json::to_string(&result).unwrap();
        let back: TestResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.test_id, result.test_id);
        assert_eq!(back.outcome, result.outcome);
        assert_eq!(back.phase_durations, result.phase_durations);
        assert_eq!(back.dedupe_key(), result.dedupe_key());
    }

    #[test]
    fn dedupe_key_distinguishes_attempts() {
        let mut a = sample_result();
        let mut b = sample_result();
        a.timestamp = 100.0;
        b.timestamp = 100.000001;
        assert_ne!(a.dedupe_key(), b.dedupe_key());
    }
}
