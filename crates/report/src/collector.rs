//! Per-worker result sink.
//!
//! Each worker appends one compact JSON line per finalized result to its own
//! file, so workers never contend on a shared file or lock. The sinks are
//! only merged by [`aggregate_results`](crate::aggregate::aggregate_results)
//! after the run ends.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use glasshouse_common::{Result, TestResult};

/// Append-only JSONL sink for one worker's results.
pub struct ResultSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl ResultSink {
    /// Create (truncating) the sink file for a worker.
    pub fn new(dir: &Path, worker_id: &str) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("worker_{}.jsonl", worker_id));
        let file = File::create(&path)?;
        debug!("Opened result sink {}", path.display());
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    /// Append one result. Flushed per line so a crashed run still leaves
    /// every completed record on disk.
    pub fn write(&mut self, result: &TestResult) -> Result<()> {
        let line = serde_json::to_string(result)?;
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glasshouse_common::{EnvironmentInfo, Outcome, PhaseDurations, TestMeta};

    fn result(test_id: &str, timestamp: f64) -> TestResult {
        TestResult {
            test_id: test_id.to_string(),
            outcome: Outcome::Passed,
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
            worker_id: "gw0".to_string(),
            execution_count: 1,
            environment: EnvironmentInfo::default(),
        }
    }

    #[test]
    fn writes_one_json_line_per_result() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = ResultSink::new(dir.path(), "gw0").unwrap();
        sink.write(&result("a", 1.0)).unwrap();
        sink.write(&result("b", 2.0)).unwrap();

        let content = std::fs::read_to_string(sink.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let back: TestResult = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(back.test_id, "b");
    }

    #[test]
    fn sink_file_is_named_after_the_worker() {
        let dir = tempfile::tempdir().unwrap();
        let sink = ResultSink::new(dir.path(), "gw3").unwrap();
        assert!(sink.path().ends_with("worker_gw3.jsonl"));
    }
}
