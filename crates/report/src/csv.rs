//! CSV export of the result set.
//!
//! Fields containing commas, quotes or newlines are quoted, with embedded
//! quotes doubled. The client-side download in the HTML report applies the
//! same rules, so both exports of a run are byte-compatible.

use chrono::{DateTime, SecondsFormat};

use glasshouse_common::{Error, Result, TestResult};

/// Fixed header row of the export.
pub const CSV_HEADER: &str = "Test ID,Title,Status,Duration (s),Started At,Worker,Error";

/// Render the result set as CSV, header row first.
pub fn export_csv(results: &[TestResult]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for result in results {
        let row = [
            result.test_id.clone(),
            result.meta.case_title.clone().unwrap_or_default(),
            result.outcome.as_str().to_string(),
            format!("{:.3}", result.duration),
            format_timestamp(result.timestamp),
            result.worker_id.clone(),
            result.error.clone().unwrap_or_default(),
        ];
        let escaped: Vec<String> = row.iter().map(|f| escape_field(f)).collect();
        out.push_str(&escaped.join(","));
        out.push('\n');
    }
    out
}

/// Parse CSV text back into records (header row included).
///
/// Understands the same quoting rules [`export_csv`] writes; a quoted field
/// left open at end of input is a parse error.
pub fn parse_csv(text: &str) -> Result<Vec<Vec<String>>> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1usize;

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                }
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' if field.is_empty() => in_quotes = true,
            '"' => {
                return Err(Error::CsvParse {
                    line,
                    reason: "quote inside unquoted field".to_string(),
                })
            }
            ',' => {
                record.push(std::mem::take(&mut field));
                // Peek lets empty trailing fields survive.
            }
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
                line += 1;
            }
            '\r' => {}
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(Error::CsvParse {
            line,
            reason: "unterminated quoted field".to_string(),
        });
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }
    Ok(records)
}

/// Quote a field when it needs it, doubling embedded quotes.
fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Unix seconds to an RFC 3339 UTC string with millisecond precision.
fn format_timestamp(timestamp: f64) -> String {
    let secs = timestamp.trunc() as i64;
    let nanos = ((timestamp.fract().abs()) * 1e9) as u32;
    DateTime::from_timestamp(secs, nanos)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use glasshouse_common::{EnvironmentInfo, Outcome, PhaseDurations, TestMeta};
    use test_case::test_case;

    fn result(test_id: &str, error: Option<&str>) -> TestResult {
        TestResult {
            test_id: test_id.to_string(),
            outcome: Outcome::Failed,
            timestamp: 1_700_000_000.5,
            duration: 2.125,
            phase_durations: PhaseDurations::new(0.0, 2.125, 0.0),
            description: String::new(),
            tags: vec![],
            meta: TestMeta {
                case_title: Some("Badge, cart".to_string()),
                ..TestMeta::default()
            },
            error: error.map(str::to_string),
            error_phase: None,
            exception_type: String::new(),
            skip_reason: None,
            logs: vec![],
            capstdout: None,
            capstderr: None,
            screenshot: None,
            worker_id: "gw1".to_string(),
            execution_count: 1,
            environment: EnvironmentInfo::default(),
        }
    }

    #[test_case("plain", "plain"; "no quoting needed")]
    #[test_case("a,b", "\"a,b\""; "comma forces quotes")]
    #[test_case("say \"hi\"", "\"say \"\"hi\"\"\""; "quotes are doubled")]
    #[test_case("two\nlines", "\"two\nlines\""; "newline forces quotes")]
    fn field_escaping(input: &str, expected: &str) {
        assert_eq!(escape_field(input), expected);
    }

    #[test]
    fn export_starts_with_the_fixed_header() {
        let csv = export_csv(&[result("a", None)]);
        assert!(csv.starts_with(CSV_HEADER));
        assert_eq!(csv.lines().count(), 2);
    }

    #[test]
    fn export_round_trips_through_parse() {
        let results = vec![
            result("login-flow", Some("Assertion failed: badge text is \"2\", expected \"1\"")),
            result("checkout,fast", None),
        ];
        let csv = export_csv(&results);
        let records = parse_csv(&csv).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0], CSV_HEADER.split(',').collect::<Vec<_>>());
        assert_eq!(records[1][0], "login-flow");
        assert_eq!(
            records[1][6],
            "Assertion failed: badge text is \"2\", expected \"1\""
        );
        assert_eq!(records[2][0], "checkout,fast");
        assert_eq!(records[2][6], "");
    }

    #[test]
    fn quoted_newlines_stay_inside_one_record() {
        let records = parse_csv("a,\"x\ny\",b\n").unwrap();
        assert_eq!(records, vec![vec!["a", "x\ny", "b"]]);
    }

    #[test]
    fn unterminated_quote_is_an_error() {
        let err = parse_csv("a,\"open\n").unwrap_err();
        assert!(matches!(err, Error::CsvParse { .. }));
    }

    #[test]
    fn timestamps_render_as_utc_rfc3339() {
        assert_eq!(format_timestamp(1_700_000_000.5), "2023-11-14T22:13:20.500Z");
    }
}
