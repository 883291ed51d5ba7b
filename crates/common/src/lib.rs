//! Glasshouse Common Library
//!
//! Shared types and utilities for the Glasshouse test harness: the test
//! result data model, environment capture, and the workspace error type.

pub mod environment;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use environment::EnvironmentInfo;
pub use error::{Error, Result};
pub use types::{Outcome, Phase, PhaseDurations, TestMeta, TestResult};

/// Glasshouse version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default directory for per-worker result sinks
pub fn default_results_dir() -> std::path::PathBuf {
    std::path::PathBuf::from("test-results")
}

/// Default path of the generated HTML report
pub fn default_report_path() -> std::path::PathBuf {
    default_results_dir().join("report.html")
}
