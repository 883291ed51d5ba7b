//! Worker sink aggregation.

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, warn};

use glasshouse_common::{Error, Outcome, Result, TestResult};

/// Merge every `*.jsonl` sink in a results directory into one result set.
///
/// Records are deduplicated on `(test_id, timestamp bits)` and returned
/// sorted by start time. A missing directory or an empty one is an empty
/// run, not an error; a sink line that fails to parse is, naming the file.
pub fn aggregate_results(dir: &Path) -> Result<Vec<TestResult>> {
    if !dir.exists() {
        warn!("Results directory {} does not exist", dir.display());
        return Ok(Vec::new());
    }

    let mut files: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().map(|ext| ext == "jsonl").unwrap_or(false))
        .collect();
    files.sort();

    let mut results = Vec::new();
    let mut seen: HashSet<(String, u64)> = HashSet::new();

    for path in &files {
        let content = std::fs::read_to_string(path)?;
        for (line_no, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let result: TestResult =
                serde_json::from_str(line).map_err(|e| Error::CorruptResults {
                    file: path.display().to_string(),
                    reason: format!("line {}: {}", line_no + 1, e),
                })?;
            if seen.insert(result.dedupe_key()) {
                results.push(result);
            }
        }
    }

    results.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
    debug!(
        "Aggregated {} result(s) from {} sink file(s)",
        results.len(),
        files.len()
    );
    Ok(results)
}

/// Keep only results whose outcome is in the given subset.
pub fn filter_by_outcomes(results: &[TestResult], outcomes: &[Outcome]) -> Vec<TestResult> {
    results
        .iter()
        .filter(|r| outcomes.contains(&r.outcome))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::ResultSink;
    use glasshouse_common::{EnvironmentInfo, PhaseDurations, TestMeta};

    fn result(test_id: &str, timestamp: f64, outcome: Outcome, worker: &str) -> TestResult {
        TestResult {
            test_id: test_id.to_string(),
            outcome,
            timestamp,
            duration: 1.0,
            phase_durations: PhaseDurations::new(0.0, 1.0, 0.0),
            description: String::new(),
            tags: vec![],
            meta: TestMeta::default(),
            error: None,
            error_phase: None,
            exception_type: String::new(),
            skip_reason: None,
            logs: vec![],
            capstdout: None,
            capstderr: None,
            screenshot: None,
            worker_id: worker.to_string(),
            execution_count: 1,
            environment: EnvironmentInfo::default(),
        }
    }

    #[test]
    fn missing_directory_is_an_empty_run() {
        let dir = tempfile::tempdir().unwrap();
        let results = aggregate_results(&dir.path().join("nope")).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn merges_sinks_sorted_by_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let mut gw0 = ResultSink::new(dir.path(), "gw0").unwrap();
        let mut gw1 = ResultSink::new(dir.path(), "gw1").unwrap();
        gw0.write(&result("b", 5.0, Outcome::Passed, "gw0")).unwrap();
        gw1.write(&result("a", 2.0, Outcome::Failed, "gw1")).unwrap();
        gw0.write(&result("c", 9.0, Outcome::Passed, "gw0")).unwrap();

        let results = aggregate_results(dir.path()).unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.test_id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[test]
    fn duplicate_records_collapse() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = ResultSink::new(dir.path(), "gw0").unwrap();
        let r = result("a", 2.0, Outcome::Passed, "gw0");
        sink.write(&r).unwrap();
        sink.write(&r).unwrap();
        // Same test retried at a different time stays distinct.
        sink.write(&result("a", 3.0, Outcome::Passed, "gw0")).unwrap();

        let results = aggregate_results(dir.path()).unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn corrupt_line_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("worker_gw0.jsonl"), "{not json\n").unwrap();
        let err = aggregate_results(dir.path()).unwrap_err();
        match err {
            Error::CorruptResults { file, reason } => {
                assert!(file.contains("worker_gw0.jsonl"));
                assert!(reason.contains("line 1"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn outcome_filter_selects_only_that_subset() {
        let results = vec![
            result("a", 1.0, Outcome::Passed, "gw0"),
            result("b", 2.0, Outcome::Failed, "gw0"),
            result("c", 3.0, Outcome::Error, "gw1"),
            result("d", 4.0, Outcome::Rerun, "gw1"),
        ];
        let failing = filter_by_outcomes(&results, &[Outcome::Failed, Outcome::Error]);
        assert_eq!(failing.len(), 2);
        assert!(failing.iter().all(|r| r.outcome.is_failing()));
    }
}
