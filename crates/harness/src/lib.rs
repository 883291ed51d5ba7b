//! Glasshouse Test Harness
//!
//! Executes declarative YAML test specs against a real browser and collects
//! one immutable result record per attempt:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                     TestRunner (Rust)                      │
//! ├────────────────────────────────────────────────────────────┤
//! │  worker gw0 ─┐                                             │
//! │  worker gw1 ─┼── pull spec ── run phases ── resolve        │
//! │  worker gwN ─┘      │             │          outcome       │
//! │                     │             │             │          │
//! │              PageRegistry   PlaywrightHandle  ResultSink   │
//! │              ($page.elem)   (node subprocess) (worker      │
//! │                                                jsonl)      │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Workers share nothing during the run except the failure-screenshot
//! budget; each writes its own sink, merged only by the report pipeline.

pub mod browser;
pub mod outcome;
pub mod page;
pub mod runner;
pub mod soft_assert;
pub mod spec;
pub mod timing;

pub use browser::{BrowserConfig, BrowserKind, PlaywrightHandle};
pub use outcome::{PhaseOutcome, PhaseStatus};
pub use page::PageRegistry;
pub use runner::{RunnerConfig, TestEvent, TestRunner};
pub use soft_assert::SoftAssert;
pub use spec::{TestSpec, TestStep};
