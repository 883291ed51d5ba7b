//! Self-contained HTML report rendering.
//!
//! The report is one file with everything inline: stylesheet, client
//! script, and the compressed result payload. Rendering is plain
//! placeholder substitution over the bundled template; the placeholders
//! are `{{NAME}}` tokens and any token left after substitution is a
//! template error.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use glasshouse_common::{EnvironmentInfo, Error, Result, TestResult};

use crate::compress::compress_payload;
use crate::stats::RunStats;
use crate::summary::{escape, render_summary};

const TEMPLATE: &str = include_str!("../assets/report.html");
const EMPTY_TEMPLATE: &str = include_str!("../assets/empty.html");
const STYLES: &str = include_str!("../assets/styles.css");
const SCRIPT: &str = include_str!("../assets/report.js");

/// Report output configuration.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub title: String,
    pub output_path: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: "Glasshouse Test Report".to_string(),
            output_path: glasshouse_common::default_report_path(),
        }
    }
}

/// One reduced record per result for the timeline canvas. Field names are
/// deliberately short; this payload is duplicated per test in the report.
#[derive(Debug, Serialize)]
pub struct TimelinePoint {
    /// Start timestamp (unix seconds)
    pub t: f64,
    /// Duration in seconds
    pub d: f64,
    /// Outcome string
    pub o: String,
    /// Test id
    pub id: String,
    /// Worker id
    pub w: String,
    /// Case title, when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl TimelinePoint {
    fn from_result(result: &TestResult) -> Self {
        Self {
            t: result.timestamp,
            d: result.duration,
            o: result.outcome.as_str().to_string(),
            id: result.test_id.clone(),
            w: result.worker_id.clone(),
            title: result.meta.case_title.clone(),
        }
    }
}

/// Renders the aggregated result set into the final HTML document.
pub struct ReportRenderer {
    config: ReportConfig,
}

impl ReportRenderer {
    pub fn new(config: ReportConfig) -> Self {
        Self { config }
    }

    /// Render the report document as a string.
    pub fn render(&self, results: &[TestResult]) -> Result<String> {
        let generated_at = Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string();

        if results.is_empty() {
            return substitute(
                EMPTY_TEMPLATE,
                &[
                    ("TITLE", escape(&self.config.title)),
                    ("GENERATED_AT", generated_at),
                ],
            );
        }

        let stats = RunStats::compute(results);
        let summary = render_summary(results, &stats);
        let timeline: Vec<TimelinePoint> =
            results.iter().map(TimelinePoint::from_result).collect();

        let substitutions = [
            ("TITLE", escape(&self.config.title)),
            ("GENERATED_AT", generated_at),
            ("RUN_ID", Uuid::new_v4().to_string()),
            ("TOTAL", stats.total.to_string()),
            ("PASSED", stats.passed.to_string()),
            ("FAILED", stats.failed.to_string()),
            ("ERROR", stats.error.to_string()),
            ("SKIPPED", stats.skipped.to_string()),
            ("XFAILED", stats.xfailed.to_string()),
            ("XPASSED", stats.xpassed.to_string()),
            ("RERUN", stats.rerun.to_string()),
            ("SUCCESS_RATE", format!("{:.2}", stats.success_rate)),
            ("WALL_DURATION", format!("{:.1}", stats.wall_duration)),
            ("SUMMARY_HTML", summary),
            ("ENVIRONMENT_ROWS", environment_rows(results)),
            ("RESULTS_PAYLOAD", compress_payload(&results)?),
            ("TIMELINE_PAYLOAD", compress_payload(&timeline)?),
            ("STYLES", STYLES.to_string()),
            ("SCRIPT", SCRIPT.to_string()),
        ];

        substitute(TEMPLATE, &substitutions)
    }

    /// Render and write the report atomically (temp file, then rename).
    pub fn write(&self, results: &[TestResult]) -> Result<PathBuf> {
        let html = self.render(results)?;
        let path = &self.config.output_path;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        std::io::Write::write_all(&mut tmp, html.as_bytes())?;
        tmp.persist(path).map_err(|e| Error::Io(e.error))?;
        info!(
            "Wrote report for {} result(s) to {}",
            results.len(),
            path.display()
        );
        Ok(path.clone())
    }
}

/// Environment table rows from the most recent record.
fn environment_rows(results: &[TestResult]) -> String {
    let environment = results
        .last()
        .map(|r| r.environment.clone())
        .unwrap_or_else(EnvironmentInfo::default);
    environment
        .rows()
        .iter()
        .map(|(label, value)| {
            format!("<tr><th>{}</th><td>{}</td></tr>", label, escape(value))
        })
        .collect()
}

/// Replace each `{{NAME}}` token; a token left unreplaced is an error, as
/// is a substitution that matched nothing.
fn substitute(template: &str, substitutions: &[(&str, String)]) -> Result<String> {
    let mut html = template.to_string();
    for (name, value) in substitutions {
        let token = format!("{{{{{}}}}}", name);
        if !html.contains(&token) {
            return Err(Error::Template(format!("placeholder {} not in template", token)));
        }
        html = html.replace(&token, value);
    }
    if let Some(leftover) = find_leftover_token(&html) {
        return Err(Error::Template(format!("unreplaced placeholder {}", leftover)));
    }
    Ok(html)
}

/// Scan for a remaining `{{UPPER_CASE}}` token. Braces from the inlined
/// script and stylesheet are not tokens.
fn find_leftover_token(html: &str) -> Option<String> {
    let bytes = html.as_bytes();
    let mut i = 0;
    while let Some(start) = html[i..].find("{{").map(|p| p + i) {
        let inner_start = start + 2;
        if let Some(end) = html[inner_start..].find("}}").map(|p| p + inner_start) {
            let inner = &html[inner_start..end];
            if !inner.is_empty()
                && inner
                    .bytes()
                    .all(|b| b.is_ascii_uppercase() || b == b'_')
            {
                return Some(format!("{{{{{}}}}}", inner));
            }
        }
        i = start + 2;
        if i >= bytes.len() {
            break;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compress::decompress_payload;
    use glasshouse_common::{Outcome, PhaseDurations, TestMeta};

    fn result(test_id: &str, outcome: Outcome) -> TestResult {
        TestResult {
            test_id: test_id.to_string(),
            outcome,
            timestamp: 100.0,
            duration: 1.5,
            phase_durations: PhaseDurations::new(0.0, 1.5, 0.0),
            description: "desc".to_string(),
            tags: vec!["smoke".to_string()],
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
            environment: EnvironmentInfo {
                os: "linux".to_string(),
                ..EnvironmentInfo::default()
            },
        }
    }

    #[test]
    fn empty_run_renders_the_empty_document() {
        let renderer = ReportRenderer::new(ReportConfig::default());
        let html = renderer.render(&[]).unwrap();
        assert!(html.contains("No tests were run"));
        assert!(!html.contains("{{"));
    }

    #[test]
    fn report_embeds_a_recoverable_payload() {
        let renderer = ReportRenderer::new(ReportConfig {
            title: "Nightly".to_string(),
            ..ReportConfig::default()
        });
        let results = vec![result("a", Outcome::Passed), result("b", Outcome::Failed)];
        let html = renderer.render(&results).unwrap();

        assert!(html.contains("Nightly"));
        assert!(find_leftover_token(&html).is_none());

        // The payload between the data-script tags must round-trip.
        let marker = "id=\"results-data\"";
        let tag_start = html.find(marker).unwrap();
        let payload_start = html[tag_start..].find('>').unwrap() + tag_start + 1;
        let payload_end = html[payload_start..].find('<').unwrap() + payload_start;
        let payload = html[payload_start..payload_end].trim();
        let back: Vec<TestResult> = decompress_payload(payload).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back[1].test_id, "b");
    }

    #[test]
    fn write_is_atomic_into_the_target_path() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = ReportRenderer::new(ReportConfig {
            title: "T".to_string(),
            output_path: dir.path().join("out/report.html"),
        });
        let path = renderer.write(&[result("a", Outcome::Passed)]).unwrap();
        let html = std::fs::read_to_string(path).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        // No stray temp files left next to the report.
        let siblings = std::fs::read_dir(dir.path().join("out")).unwrap().count();
        assert_eq!(siblings, 1);
    }

    #[test]
    fn missing_placeholder_is_a_template_error() {
        let err = substitute("<html>{{TITLE}}</html>", &[("NOPE", "x".to_string())]).unwrap_err();
        assert!(matches!(err, Error::Template(_)));
    }

    #[test]
    fn leftover_tokens_are_detected() {
        assert_eq!(
            find_leftover_token("a {{LEFT_OVER}} b"),
            Some("{{LEFT_OVER}}".to_string())
        );
        assert_eq!(find_leftover_token("css { div {} } ${js}"), None);
    }
}
