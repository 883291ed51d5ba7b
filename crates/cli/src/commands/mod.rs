//! CLI subcommands.

pub mod export;
pub mod report;
pub mod run;
