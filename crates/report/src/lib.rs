//! Glasshouse Report Pipeline
//!
//! Turns per-worker result sinks into a single self-contained HTML report:
//!
//! ```text
//! worker_*.jsonl ──> aggregate ──> stats ──┬──> summary (HTML fragment)
//!                                          │
//!                        results + timeline┴──> compress (zlib + base64)
//!                                                   │
//!                                                   v
//!                                    render (template substitution)
//!                                                   │
//!                                                   v
//!                                             report.html
//! ```
//!
//! The report carries everything inline: stylesheet, script, and the
//! compressed result payload. Opening it needs nothing but a browser.

pub mod aggregate;
pub mod collector;
pub mod compress;
pub mod csv;
pub mod render;
pub mod stats;
pub mod summary;

pub use aggregate::{aggregate_results, filter_by_outcomes};
pub use collector::ResultSink;
pub use compress::{compress_payload, decompress_payload};
pub use csv::{export_csv, parse_csv, CSV_HEADER};
pub use render::{ReportConfig, ReportRenderer};
pub use stats::{slow_functions, RunStats, SlowFunction};
pub use summary::render_summary;
