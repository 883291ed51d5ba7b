//! End-to-end pipeline test: worker sinks in, HTML report and CSV out.

use glasshouse_common::{
    EnvironmentInfo, Outcome, PhaseDurations, TestMeta, TestResult,
};
use glasshouse_report::{
    aggregate_results, decompress_payload, export_csv, parse_csv, render_summary, ReportConfig,
    ReportRenderer, ResultSink, RunStats, CSV_HEADER,
};

fn result(test_id: &str, outcome: Outcome, timestamp: f64, worker: &str) -> TestResult {
    TestResult {
        test_id: test_id.to_string(),
        outcome,
        timestamp,
        duration: 2.0,
        phase_durations: PhaseDurations::new(0.5, 1.0, 0.5),
        description: format!("{} scenario", test_id),
        tags: vec!["smoke".to_string()],
        meta: TestMeta {
            case_id: Some("CASE-1".to_string()),
            case_title: Some(format!("{} case", test_id)),
            ..TestMeta::default()
        },
        error: outcome
            .is_failing()
            .then(|| "Assertion failed: .badge text is '2'".to_string()),
        error_phase: None,
        exception_type: String::new(),
        skip_reason: None,
        logs: vec!["function - wait:#spinner: 12.0000 seconds".to_string()],
        capstdout: None,
        capstderr: None,
        screenshot: None,
        worker_id: worker.to_string(),
        execution_count: 1,
        environment: EnvironmentInfo {
            os: "linux".to_string(),
            browser: "Chromium".to_string(),
            ..EnvironmentInfo::default()
        },
    }
}

#[test]
fn sinks_to_report_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let results_dir = dir.path().join("results");

    // Two workers write interleaved results, one duplicated record.
    let mut gw0 = ResultSink::new(&results_dir, "gw0").unwrap();
    let mut gw1 = ResultSink::new(&results_dir, "gw1").unwrap();
    let duplicate = result("login", Outcome::Passed, 10.0, "gw0");
    gw0.write(&duplicate).unwrap();
    gw0.write(&duplicate).unwrap();
    gw0.write(&result("checkout", Outcome::Failed, 12.0, "gw0"))
        .unwrap();
    gw1.write(&result("inventory", Outcome::Passed, 11.0, "gw1"))
        .unwrap();
    gw1.write(&result("cart-badge", Outcome::Xfailed, 13.0, "gw1"))
        .unwrap();

    let merged = aggregate_results(&results_dir).unwrap();
    assert_eq!(merged.len(), 4);
    assert!(merged.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));

    let stats = RunStats::compute(&merged);
    assert_eq!(stats.total, 4);
    assert_eq!(stats.passed, 2);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.xfailed, 1);
    assert_eq!(stats.success_rate, 50.0);

    // Render the report and recover the embedded payload.
    let report_path = dir.path().join("report.html");
    let renderer = ReportRenderer::new(ReportConfig {
        title: "Pipeline Test".to_string(),
        output_path: report_path.clone(),
    });
    renderer.write(&merged).unwrap();

    let html = std::fs::read_to_string(&report_path).unwrap();
    assert!(html.contains("Pipeline Test"));
    assert!(html.contains("Chromium"));

    let marker = "id=\"results-data\"";
    let tag_start = html.find(marker).unwrap();
    let payload_start = html[tag_start..].find('>').unwrap() + tag_start + 1;
    let payload_end = html[payload_start..].find('<').unwrap() + payload_start;
    let recovered: Vec<TestResult> =
        decompress_payload(html[payload_start..payload_end].trim()).unwrap();

    assert_eq!(recovered.len(), merged.len());
    for (a, b) in recovered.iter().zip(merged.iter()) {
        assert_eq!(a.test_id, b.test_id);
        assert_eq!(a.outcome, b.outcome);
        assert_eq!(a.dedupe_key(), b.dedupe_key());
    }
}

#[test]
fn summary_and_csv_agree_with_the_result_set() {
    let results = vec![
        result("login", Outcome::Passed, 10.0, "gw0"),
        result("checkout", Outcome::Failed, 12.0, "gw0"),
    ];
    let stats = RunStats::compute(&results);

    let summary = render_summary(&results, &stats);
    assert!(summary.contains("2 test(s) executed"));
    assert!(summary.contains("Pass rate: 50.0%"));

    let csv = export_csv(&results);
    let records = parse_csv(&csv).unwrap();
    assert_eq!(records[0].join(","), CSV_HEADER);
    assert_eq!(records.len(), 3);
    assert_eq!(records[2][0], "checkout");
    assert_eq!(records[2][2], "failed");
    assert_eq!(records[2][6], "Assertion failed: .badge text is '2'");
}

#[test]
fn empty_results_directory_renders_the_empty_report() {
    let dir = tempfile::tempdir().unwrap();
    let merged = aggregate_results(&dir.path().join("results")).unwrap();
    assert!(merged.is_empty());

    let renderer = ReportRenderer::new(ReportConfig {
        title: "Empty".to_string(),
        output_path: dir.path().join("report.html"),
    });
    let path = renderer.write(&merged).unwrap();
    let html = std::fs::read_to_string(path).unwrap();
    assert!(html.contains("No tests were run"));
}
