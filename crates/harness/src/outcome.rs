//! Terminal outcome resolution.
//!
//! Folds per-phase results, the spec markers (skip/xfail) and soft-assert
//! state into exactly one terminal [`Outcome`] per attempt.

use glasshouse_common::{Outcome, Phase};

/// How a single phase finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseOutcome {
    Passed,
    /// Assertion failure
    Failed,
    /// Infrastructure failure (spawn, script crash, timeout)
    Error,
}

/// Phase results for one attempt. `None` means the phase did not run.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhaseStatus {
    pub setup: Option<PhaseOutcome>,
    pub call: Option<PhaseOutcome>,
    pub teardown: Option<PhaseOutcome>,
}

impl PhaseStatus {
    fn get(&self, phase: Phase) -> Option<PhaseOutcome> {
        match phase {
            Phase::Setup => self.setup,
            Phase::Call => self.call,
            Phase::Teardown => self.teardown,
        }
    }

    pub fn set(&mut self, phase: Phase, outcome: PhaseOutcome) {
        match phase {
            Phase::Setup => self.setup = Some(outcome),
            Phase::Call => self.call = Some(outcome),
            Phase::Teardown => self.teardown = Some(outcome),
        }
    }
}

/// Resolved terminal outcome plus the phase that produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedOutcome {
    pub outcome: Outcome,
    pub error_phase: Option<Phase>,
}

/// Resolve the terminal outcome for one attempt.
///
/// `soft_failed` marks call-phase soft-assert failures; `xfail` marks the
/// spec's expected-failure flag.
pub fn resolve(status: &PhaseStatus, xfail: bool, soft_failed: bool) -> ResolvedOutcome {
    // Soft-assert failures count as a failing call phase.
    let call_failing = soft_failed
        || matches!(
            status.call,
            Some(PhaseOutcome::Failed) | Some(PhaseOutcome::Error)
        );

    if xfail {
        // Expected failure: a failing call is the expected case, a clean
        // pass is the surprising one. Setup/teardown errors stay errors.
        if matches!(status.setup, Some(PhaseOutcome::Error) | Some(PhaseOutcome::Failed)) {
            return ResolvedOutcome {
                outcome: Outcome::Error,
                error_phase: Some(Phase::Setup),
            };
        }
        if call_failing {
            return ResolvedOutcome {
                outcome: Outcome::Xfailed,
                error_phase: Some(Phase::Call),
            };
        }
        if status.call == Some(PhaseOutcome::Passed) {
            return ResolvedOutcome {
                outcome: Outcome::Xpassed,
                error_phase: None,
            };
        }
    }

    // First failing phase wins, in execution order.
    for phase in [Phase::Setup, Phase::Call, Phase::Teardown] {
        match status.get(phase) {
            Some(PhaseOutcome::Failed) => {
                return ResolvedOutcome {
                    outcome: Outcome::Failed,
                    error_phase: Some(phase),
                }
            }
            Some(PhaseOutcome::Error) => {
                return ResolvedOutcome {
                    outcome: Outcome::Error,
                    error_phase: Some(phase),
                }
            }
            _ => {}
        }
    }

    if soft_failed {
        return ResolvedOutcome {
            outcome: Outcome::Failed,
            error_phase: Some(Phase::Call),
        };
    }

    ResolvedOutcome {
        outcome: Outcome::Passed,
        error_phase: None,
    }
}

/// Demote a failing attempt to `rerun` while retry budget remains.
///
/// `execution_count` is 1-based; with `max_reruns = 2` the first two failing
/// attempts are recorded as reruns and the third keeps its real outcome.
/// Expected failures are terminal and never retried.
pub fn apply_rerun(outcome: Outcome, execution_count: u32, max_reruns: u32) -> Outcome {
    if outcome.is_failing() && execution_count <= max_reruns {
        Outcome::Rerun
    } else {
        outcome
    }
}
