//! Error types for Glasshouse

use thiserror::Error;

/// Result type alias using the Glasshouse Error
pub type Result<T> = std::result::Result<T, Error>;

/// Glasshouse error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Playwright not found. Install with: npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Test spec parse error: {0}")]
    SpecParse(String),

    #[error("Unknown page reference: {0}")]
    UnknownPageRef(String),

    #[error("Step failed: {step} - {reason}")]
    StepFailed { step: String, reason: String },

    #[error("Test timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Corrupt results file {file}: {reason}")]
    CorruptResults { file: String, reason: String },

    #[error("CSV parse error at line {line}: {reason}")]
    CsvParse { line: usize, reason: String },

    #[error("Compression error: {0}")]
    Compression(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Worker {0} crashed: {1}")]
    Worker(String, String),
}
