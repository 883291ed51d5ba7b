//! Human-readable run summary, rendered as an HTML fragment for the
//! report's overview panel.

use std::collections::BTreeMap;

use glasshouse_common::{Outcome, TestResult};

use crate::stats::{RunStats, SLOW_TEST_THRESHOLD_SECS};

/// Slow functions shown in the performance section.
const MAX_SLOW_FUNCTIONS_SHOWN: usize = 5;

/// Render the summary fragment for a result set.
pub fn render_summary(results: &[TestResult], stats: &RunStats) -> String {
    if results.is_empty() {
        return "<div class=\"alert\"><b>No test results found.</b> \
                The run produced no records; check the results directory \
                and the worker logs.</div>"
            .to_string();
    }

    let mut out = String::new();
    out.push_str("<h4>Test Run Analysis</h4>");
    out.push_str(&format!("<p>{}</p>", assessment(stats.success_rate)));

    out.push_str("<h5>Execution</h5><ul>");
    out.push_str(&format!(
        "<li>{} test(s) executed in {}</li>",
        stats.total,
        format_hms(stats.wall_duration)
    ));
    out.push_str(&format!(
        "<li>Pass rate: {:.1}%</li>",
        stats.success_rate
    ));
    out.push_str(&format!(
        "<li>Open issues: {} failed, {} errored, {} rerun(s), {} slow test(s)</li>",
        stats.failed,
        stats.error,
        stats.rerun,
        stats.slow_tests.len()
    ));
    out.push_str("</ul>");

    out.push_str("<h5>Status Breakdown</h5>");
    if stats.passed == stats.total {
        out.push_str("<p><b>All tests passed.</b></p>");
    } else {
        out.push_str("<ul>");
        for outcome in Outcome::ALL {
            let count = stats.count(outcome);
            if count == 0 {
                continue;
            }
            out.push_str(&format!(
                "<li><b>{}</b>: {} ({:.1}%)</li>",
                outcome,
                count,
                count as f64 / stats.total as f64 * 100.0
            ));
        }
        out.push_str("</ul>");
        if stats.failed + stats.error + stats.rerun > 0 {
            out.push_str(
                "<p>Failures, errors and reruns above are the items blocking a clean run.</p>",
            );
        }
    }

    out.push_str("<h5>Performance</h5><ul>");
    match (&stats.fastest, &stats.slowest) {
        (Some((fast_id, fast)), Some((slow_id, slow))) => {
            out.push_str(&format!(
                "<li>Fastest: <code>{}</code> ({:.2}s)</li>",
                escape(fast_id),
                fast
            ));
            out.push_str(&format!(
                "<li>Slowest: <code>{}</code> ({:.2}s)</li>",
                escape(slow_id),
                slow
            ));
        }
        _ => out.push_str("<li>No duration data available.</li>"),
    }
    if stats.slow_tests.is_empty() {
        out.push_str(&format!(
            "<li>No test exceeded the {:.0}s slow-test threshold.</li>",
            SLOW_TEST_THRESHOLD_SECS
        ));
    } else {
        out.push_str(&format!(
            "<li>{} test(s) over {:.0}s:<ul>",
            stats.slow_tests.len(),
            SLOW_TEST_THRESHOLD_SECS
        ));
        for (test_id, duration) in &stats.slow_tests {
            out.push_str(&format!(
                "<li><code>{}</code> ({:.1}s)</li>",
                escape(test_id),
                duration
            ));
        }
        out.push_str("</ul></li>");
    }
    if !stats.slow_functions.is_empty() {
        out.push_str("<li>Repeatedly slow steps:<ul>");
        for func in stats.slow_functions.iter().take(MAX_SLOW_FUNCTIONS_SHOWN) {
            out.push_str(&format!(
                "<li><code>{}</code>: slow {} time(s), avg {:.1}s, max {:.1}s</li>",
                escape(&func.name),
                func.occurrences,
                func.avg_secs,
                func.max_secs
            ));
        }
        out.push_str("</ul></li>");
    }
    out.push_str("</ul>");

    out.push_str("<h5>Rerun Analysis</h5>");
    out.push_str(&rerun_section(results, stats));

    out
}

/// Overall assessment tier by pass rate.
fn assessment(success_rate: f64) -> &'static str {
    if success_rate >= 100.0 {
        "<b>Complete success:</b> every test passed."
    } else if success_rate >= 95.0 {
        "<b>Outstanding result:</b> the vast majority of tests passed."
    } else if success_rate >= 90.0 {
        "<b>Very good result:</b> high pass rate with a few issues to address."
    } else if success_rate >= 80.0 {
        "<b>Good result:</b> decent pass rate, improvements needed."
    } else if success_rate >= 60.0 {
        "<b>Attention required:</b> multiple failures need investigation."
    } else {
        "<b>Critical:</b> very low pass rate, immediate investigation required."
    }
}

/// Group rerun attempts per test, worst offender first.
fn rerun_section(results: &[TestResult], stats: &RunStats) -> String {
    if stats.rerun == 0 {
        return "<p>No retried tests; every result is from a first attempt.</p>".to_string();
    }

    let mut per_test: BTreeMap<&str, usize> = BTreeMap::new();
    for result in results {
        if result.outcome == Outcome::Rerun {
            *per_test.entry(result.test_id.as_str()).or_default() += 1;
        }
    }
    let mut ranked: Vec<(&str, usize)> = per_test.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));

    let mut out = format!(
        "<p>{} rerun attempt(s) across {} test(s). Repeated reruns usually point at flaky selectors or timing-sensitive steps.</p><ul>",
        stats.rerun,
        ranked.len()
    );
    for (test_id, count) in ranked {
        out.push_str(&format!(
            "<li><code>{}</code>: {} retry attempt(s)</li>",
            escape(test_id),
            count
        ));
    }
    out.push_str("</ul>");
    out
}

fn format_hms(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

/// Minimal HTML escaping for user-controlled strings.
pub(crate) fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
