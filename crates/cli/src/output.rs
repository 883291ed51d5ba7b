//! Terminal output for run results.

use colored::{ColoredString, Colorize};
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};

use glasshouse_common::Outcome;
use glasshouse_harness::TestEvent;
use glasshouse_report::RunStats;

/// Outcome string in its report color.
pub fn outcome_colored(outcome: Outcome) -> ColoredString {
    let text = outcome.as_str();
    match outcome {
        Outcome::Passed => text.green(),
        Outcome::Failed => text.red(),
        Outcome::Error => text.red().bold(),
        Outcome::Skipped => text.dimmed(),
        Outcome::Xfailed => text.purple(),
        Outcome::Xpassed => text.cyan(),
        Outcome::Rerun => text.yellow(),
    }
}

/// One progress line per finished attempt.
pub fn event_line(event: &TestEvent) -> String {
    format!(
        "{:>8}  {}  ({:.2}s, {})",
        outcome_colored(event.outcome),
        event.test_id,
        event.duration,
        event.worker_id
    )
}

/// Print the end-of-run outcome table.
pub fn print_summary(stats: &RunStats) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Outcome", "Count", "Percent"]);

    for outcome in Outcome::ALL {
        let count = stats.count(outcome);
        if count == 0 {
            continue;
        }
        table.add_row(vec![
            outcome.as_str().to_string(),
            count.to_string(),
            format!("{:.1}%", count as f64 / stats.total as f64 * 100.0),
        ]);
    }
    table.add_row(vec![
        "total".to_string(),
        stats.total.to_string(),
        String::new(),
    ]);

    println!("{table}");
    println!(
        "Pass rate: {}  Wall time: {:.1}s",
        format!("{:.2}%", stats.success_rate).bold(),
        stats.wall_duration
    );
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

pub fn print_failure(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}
