//! Parallel test runner.
//!
//! Specs are loaded once, resolved against the page registry, and pushed
//! onto a shared queue. Each worker pulls specs until the queue drains,
//! drives the browser for every phase, resolves a terminal outcome per
//! attempt and appends the record to its own sink file. Workers share no
//! state during the run apart from the failure-screenshot budget; results
//! only meet again when the report pipeline merges the sinks.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use glasshouse_common::{
    EnvironmentInfo, Error, Outcome, Phase, PhaseDurations, Result, TestResult,
};
use glasshouse_report::ResultSink;

use crate::browser::{BrowserConfig, PlaywrightHandle, ScriptOutcome};
use crate::outcome::{self, PhaseOutcome, PhaseStatus};
use crate::page::PageRegistry;
use crate::soft_assert::SoftAssert;
use crate::spec::TestSpec;
use crate::timing::ExecutionLog;

/// Default call-phase timeout, in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default cap on embedded failure screenshots per run.
const DEFAULT_SCREENSHOT_CAP: usize = 5;

/// Runner configuration.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Directory holding the YAML test specs
    pub specs_dir: PathBuf,
    /// Optional page registry file
    pub pages_file: Option<PathBuf>,
    /// Directory for per-worker sink files
    pub results_dir: PathBuf,
    /// Number of parallel workers
    pub workers: usize,
    /// Failing attempts recorded as reruns before the outcome sticks
    pub max_reruns: u32,
    /// Call-phase timeout applied when a spec does not set its own
    pub default_timeout_secs: u64,
    /// Only run specs carrying this tag
    pub tag: Option<String>,
    /// Run-wide cap on embedded failure screenshots
    pub screenshot_cap: usize,
    /// Browser configuration shared by all workers
    pub browser: BrowserConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            specs_dir: PathBuf::from("specs"),
            pages_file: None,
            results_dir: glasshouse_common::default_results_dir(),
            workers: 4,
            max_reruns: 0,
            default_timeout_secs: DEFAULT_TIMEOUT_SECS,
            tag: None,
            screenshot_cap: DEFAULT_SCREENSHOT_CAP,
            browser: BrowserConfig::default(),
        }
    }
}

/// Progress event emitted once per recorded attempt.
#[derive(Debug, Clone)]
pub struct TestEvent {
    pub test_id: String,
    pub outcome: Outcome,
    pub duration: f64,
    pub worker_id: String,
}

/// Parallel test runner.
pub struct TestRunner {
    config: RunnerConfig,
}

impl TestRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    /// Run every matching spec and return all recorded attempts, ordered
    /// by start time.
    ///
    /// When `events` is given, one [`TestEvent`] is sent per recorded
    /// attempt (reruns included) as it happens.
    pub async fn run_all(&self, events: Option<UnboundedSender<TestEvent>>) -> Result<Vec<TestResult>> {
        let mut specs = TestSpec::load_all(&self.config.specs_dir)?;

        if let Some(tag) = &self.config.tag {
            specs = TestSpec::filter_by_tag(specs, tag);
        }

        if let Some(pages_file) = &self.config.pages_file {
            let registry = PageRegistry::from_file(pages_file)?;
            for spec in &mut specs {
                spec.resolve_pages(&registry)?;
            }
        }

        if specs.is_empty() {
            warn!("No test specs matched in {}", self.config.specs_dir.display());
            return Ok(Vec::new());
        }

        self.prepare_results_dir()?;

        let worker_count = self.config.workers.max(1).min(specs.len());
        info!(
            "Running {} test(s) on {} worker(s)",
            specs.len(),
            worker_count
        );

        // Shared browser version probe; one npx invocation for the run.
        let browser_version = PlaywrightHandle::version().unwrap_or_default();
        let environment = EnvironmentInfo::capture()
            .with_browser(self.config.browser.browser.display_name(), &browser_version);

        let queue: Arc<Mutex<VecDeque<TestSpec>>> = Arc::new(Mutex::new(specs.into()));
        let screenshot_budget = Arc::new(AtomicUsize::new(self.config.screenshot_cap));

        let mut handles = Vec::with_capacity(worker_count);
        for i in 0..worker_count {
            let worker_id = format!("gw{}", i);
            let queue = Arc::clone(&queue);
            let budget = Arc::clone(&screenshot_budget);
            let config = self.config.clone();
            let environment = environment.clone();
            let events = events.clone();

            handles.push(tokio::spawn(async move {
                worker_loop(worker_id, queue, budget, config, environment, events).await
            }));
        }

        let mut results = Vec::new();
        for (i, handle) in handles.into_iter().enumerate() {
            let worker_results = handle
                .await
                .map_err(|e| Error::Worker(format!("gw{}", i), e.to_string()))??;
            results.extend(worker_results);
        }

        results.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        Ok(results)
    }

    /// Create the results directory and drop sink files from earlier runs
    /// so stale records never merge into this run's report.
    fn prepare_results_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.config.results_dir)?;
        for entry in std::fs::read_dir(&self.config.results_dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with("worker_") && name.ends_with(".jsonl") {
                std::fs::remove_file(entry.path())?;
            }
        }
        Ok(())
    }
}

async fn worker_loop(
    worker_id: String,
    queue: Arc<Mutex<VecDeque<TestSpec>>>,
    screenshot_budget: Arc<AtomicUsize>,
    config: RunnerConfig,
    environment: EnvironmentInfo,
    events: Option<UnboundedSender<TestEvent>>,
) -> Result<Vec<TestResult>> {
    let handle = PlaywrightHandle::new(config.browser.clone())?;
    let mut sink = ResultSink::new(&config.results_dir, &worker_id)?;
    let mut results = Vec::new();

    loop {
        let spec = match queue.lock().await.pop_front() {
            Some(spec) => spec,
            None => break,
        };

        debug!(worker = %worker_id, test = %spec.name, "starting test");

        if let Some(reason) = spec.skip.clone() {
            let result = skipped_result(&spec, &worker_id, &environment, &reason);
            sink.write(&result)?;
            emit(&events, &result);
            results.push(result);
            continue;
        }

        // Retry loop: failing attempts within the rerun budget are
        // recorded and the test starts over from setup.
        let mut execution_count: u32 = 1;
        loop {
            let result = run_attempt(
                &handle,
                &spec,
                &worker_id,
                &environment,
                &screenshot_budget,
                &config,
                execution_count,
            )
            .await;
            let outcome = result.outcome;
            sink.write(&result)?;
            emit(&events, &result);
            results.push(result);

            if outcome == Outcome::Rerun {
                execution_count += 1;
            } else {
                break;
            }
        }
    }

    Ok(results)
}

fn emit(events: &Option<UnboundedSender<TestEvent>>, result: &TestResult) {
    if let Some(tx) = events {
        // A dropped receiver only means nobody is watching progress.
        let _ = tx.send(TestEvent {
            test_id: result.test_id.clone(),
            outcome: result.outcome,
            duration: result.duration,
            worker_id: result.worker_id.clone(),
        });
    }
}

/// Result record for a spec skipped before any phase runs.
fn skipped_result(
    spec: &TestSpec,
    worker_id: &str,
    environment: &EnvironmentInfo,
    reason: &str,
) -> TestResult {
    TestResult {
        test_id: spec.name.clone(),
        outcome: Outcome::Skipped,
        timestamp: now_unix(),
        duration: 0.0,
        phase_durations: PhaseDurations::default(),
        description: spec.description.clone(),
        tags: spec.tags.clone(),
        meta: spec.meta.to_test_meta(spec.xfail.as_deref()),
        error: None,
        error_phase: None,
        exception_type: String::new(),
        skip_reason: Some(reason.to_string()),
        logs: Vec::new(),
        capstdout: None,
        capstderr: None,
        screenshot: None,
        worker_id: worker_id.to_string(),
        execution_count: 1,
        environment: environment.clone(),
    }
}

/// Execute one attempt of a spec: setup, call, teardown.
async fn run_attempt(
    handle: &PlaywrightHandle,
    spec: &TestSpec,
    worker_id: &str,
    environment: &EnvironmentInfo,
    screenshot_budget: &AtomicUsize,
    config: &RunnerConfig,
    execution_count: u32,
) -> TestResult {
    let handle = handle.with_viewport(spec.viewport.width, spec.viewport.height);
    let timestamp = now_unix();

    let mut status = PhaseStatus::default();
    let mut durations = PhaseDurations::default();
    let mut log = ExecutionLog::new();
    let mut soft = SoftAssert::new();
    let mut capstdout = String::new();
    let mut capstderr = String::new();
    let mut error: Option<String> = None;
    let mut exception_type = String::new();
    let mut end_url: Option<String> = None;
    let mut screenshot: Option<String> = None;

    // Setup phase. A failing setup skips the call and teardown.
    if !spec.setup.is_empty() {
        let started = Instant::now();
        let script = handle.run_steps(&spec.setup).await;
        durations.set(Phase::Setup, started.elapsed().as_secs_f64());
        let phase = absorb_phase(
            Phase::Setup,
            script,
            &mut log,
            &mut soft,
            &mut capstdout,
            &mut capstderr,
            &mut end_url,
            &mut screenshot,
        );
        // Setup never fails an assertion from the test's point of view;
        // anything wrong before the test body is an infrastructure error.
        let phase = match phase {
            PhaseResult::Failed(msg) | PhaseResult::Errored(msg) => {
                error = Some(msg);
                exception_type = "SetupError".to_string();
                PhaseOutcome::Error
            }
            PhaseResult::Passed => PhaseOutcome::Passed,
        };
        status.set(Phase::Setup, phase);
    }

    let setup_ok = status.setup.is_none() || status.setup == Some(PhaseOutcome::Passed);

    // Call phase, under the spec's timeout.
    if setup_ok {
        let timeout_secs = spec.timeout_secs.unwrap_or(config.default_timeout_secs);
        let started = Instant::now();
        let script = tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            handle.run_steps(&spec.steps),
        )
        .await;
        durations.set(Phase::Call, started.elapsed().as_secs_f64());

        match script {
            Err(_elapsed) => {
                status.set(Phase::Call, PhaseOutcome::Error);
                error = Some(Error::Timeout { seconds: timeout_secs }.to_string());
                exception_type = "Timeout".to_string();
                log.message(format!("call phase timed out after {}s", timeout_secs));
            }
            Ok(script) => {
                let phase = absorb_phase(
                    Phase::Call,
                    script,
                    &mut log,
                    &mut soft,
                    &mut capstdout,
                    &mut capstderr,
                    &mut end_url,
                    &mut screenshot,
                );
                match phase {
                    PhaseResult::Passed => status.set(Phase::Call, PhaseOutcome::Passed),
                    PhaseResult::Failed(msg) => {
                        status.set(Phase::Call, PhaseOutcome::Failed);
                        error = Some(msg);
                        exception_type = "AssertionFailed".to_string();
                    }
                    PhaseResult::Errored(msg) => {
                        status.set(Phase::Call, PhaseOutcome::Error);
                        error = Some(msg);
                        exception_type = "PlaywrightError".to_string();
                    }
                }
            }
        }
    }

    // Teardown runs whenever setup completed, even after a failed call.
    if setup_ok && !spec.teardown.is_empty() {
        let started = Instant::now();
        let script = handle.run_steps(&spec.teardown).await;
        durations.set(Phase::Teardown, started.elapsed().as_secs_f64());
        let phase = absorb_phase(
            Phase::Teardown,
            script,
            &mut log,
            &mut soft,
            &mut capstdout,
            &mut capstderr,
            &mut end_url,
            &mut screenshot,
        );
        match phase {
            PhaseResult::Passed => status.set(Phase::Teardown, PhaseOutcome::Passed),
            PhaseResult::Failed(msg) => {
                status.set(Phase::Teardown, PhaseOutcome::Failed);
                if error.is_none() {
                    error = Some(msg);
                    exception_type = "AssertionFailed".to_string();
                }
            }
            PhaseResult::Errored(msg) => {
                status.set(Phase::Teardown, PhaseOutcome::Error);
                if error.is_none() {
                    error = Some(msg);
                    exception_type = "TeardownError".to_string();
                }
            }
        }
    }

    // Soft-assert failures become the error text when nothing harder
    // already failed.
    if soft.has_failures() && error.is_none() {
        error = soft.summary();
        exception_type = "SoftAssertionFailed".to_string();
    }

    let resolved = outcome::resolve(&status, spec.xfail.is_some(), soft.has_failures());
    let outcome = outcome::apply_rerun(resolved.outcome, execution_count, config.max_reruns);

    if outcome == Outcome::Rerun {
        log.message(format!(
            "attempt {} failed, retrying ({} rerun(s) allowed)",
            execution_count, config.max_reruns
        ));
    }

    // Screenshots are only embedded for terminal failures, under the
    // run-wide budget. Rerun attempts never consume it.
    if !outcome.is_failing() || !take_screenshot_slot(screenshot_budget) {
        screenshot = None;
    }

    let mut meta = spec.meta.to_test_meta(spec.xfail.as_deref());
    meta.end_url = end_url;

    TestResult {
        test_id: spec.name.clone(),
        outcome,
        timestamp,
        duration: durations.total(),
        phase_durations: durations,
        description: spec.description.clone(),
        tags: spec.tags.clone(),
        meta,
        error,
        error_phase: resolved.error_phase,
        exception_type,
        skip_reason: None,
        logs: log.into_lines(),
        capstdout: non_empty(capstdout),
        capstderr: non_empty(capstderr),
        screenshot,
        worker_id: worker_id.to_string(),
        execution_count,
        environment: environment.clone(),
    }
}

/// Result of one phase's script run, with the failure message attached.
enum PhaseResult {
    Passed,
    /// Assertion failure
    Failed(String),
    /// Infrastructure failure
    Errored(String),
}

/// Fold a phase's script outcome into the attempt's accumulators.
#[allow(clippy::too_many_arguments)]
fn absorb_phase(
    phase: Phase,
    script: Result<ScriptOutcome>,
    log: &mut ExecutionLog,
    soft: &mut SoftAssert,
    capstdout: &mut String,
    capstderr: &mut String,
    end_url: &mut Option<String>,
    screenshot: &mut Option<String>,
) -> PhaseResult {
    let script = match script {
        Ok(script) => script,
        // Spawn-level failure: node missing, temp dir gone.
        Err(e) => return PhaseResult::Errored(e.to_string()),
    };

    log.ingest_stdout(&script.stdout);
    append_capture(capstdout, phase, &script.stdout);
    append_capture(capstderr, phase, &script.stderr);

    for failure in &script.soft_failures {
        soft.record(failure.clone());
    }
    if script.end_url.is_some() {
        *end_url = script.end_url.clone();
    }
    if screenshot.is_none() {
        *screenshot = script.screenshot.clone();
    }

    if script.success {
        return PhaseResult::Passed;
    }

    let mut message = script
        .error
        .unwrap_or_else(|| "browser script failed".to_string());
    if let Some(step) = &script.failed_step {
        message = format!("{} (at step {})", message, step);
        log.message(format!("{} phase failed at step {}", phase, step));
    }

    if script.assertion_failure {
        PhaseResult::Failed(message)
    } else {
        PhaseResult::Errored(message)
    }
}

/// Append one phase's captured output under a phase marker.
fn append_capture(buffer: &mut String, phase: Phase, text: &str) {
    if text.trim().is_empty() {
        return;
    }
    if !buffer.is_empty() {
        buffer.push('\n');
    }
    buffer.push_str(&format!("----- {} -----\n{}", phase, text.trim_end()));
}

/// Claim one slot from the run-wide screenshot budget.
fn take_screenshot_slot(budget: &AtomicUsize) -> bool {
    budget
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

fn now_unix() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
