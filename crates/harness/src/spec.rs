//! Declarative YAML test specification

use serde::{Deserialize, Serialize};
use std::path::Path;

use glasshouse_common::{Error, Result, TestMeta};

use crate::page::PageRegistry;

/// A complete test specification parsed from YAML.
///
/// A spec has up to three phases: `setup`, the main `steps` (the call
/// phase) and `teardown`. Setup and teardown are optional; teardown runs
/// whenever setup completed, even after a call-phase failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSpec {
    /// Unique name for this test
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering tests
    #[serde(default)]
    pub tags: Vec<String>,

    /// Case metadata surfaced in the report
    #[serde(default)]
    pub meta: SpecMeta,

    /// Viewport size for the browser
    #[serde(default = "default_viewport")]
    pub viewport: Viewport,

    /// Skip the test entirely, with a reason
    #[serde(default)]
    pub skip: Option<String>,

    /// Mark the test as expected to fail, with a reason
    #[serde(default)]
    pub xfail: Option<String>,

    /// Per-test timeout for the call phase, in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Setup phase steps
    #[serde(default)]
    pub setup: Vec<TestStep>,

    /// Call phase steps, executed in order
    pub steps: Vec<TestStep>,

    /// Teardown phase steps
    #[serde(default)]
    pub teardown: Vec<TestStep>,
}

fn default_viewport() -> Viewport {
    Viewport {
        width: 1280,
        height: 720,
    }
}

/// Case metadata attached to a spec.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpecMeta {
    #[serde(default)]
    pub case_id: Option<String>,
    #[serde(default)]
    pub case_title: Option<String>,
    #[serde(default)]
    pub case_link: Option<String>,
}

impl SpecMeta {
    /// Convert to the result-record metadata form.
    pub fn to_test_meta(&self, xfail_reason: Option<&str>) -> TestMeta {
        TestMeta {
            case_id: self.case_id.clone(),
            case_title: self.case_title.clone(),
            case_link: self.case_link.clone(),
            end_url: None,
            xfail_reason: xfail_reason.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// A single step in a test.
///
/// Selector and url fields may reference the page registry with
/// `$page.element` / `$page` syntax; see [`PageRegistry`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TestStep {
    /// Navigate to a URL (relative to base)
    Navigate {
        url: String,
        #[serde(default)]
        wait_for_selector: Option<String>,
    },

    /// Click an element
    Click {
        selector: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Fill an input field
    Fill {
        selector: String,
        value: String,
        #[serde(default)]
        clear_first: bool,
    },

    /// Press a key, optionally on a specific element
    Press {
        #[serde(default)]
        selector: Option<String>,
        key: String,
    },

    /// Wait for an element to reach a state
    Wait {
        selector: String,
        #[serde(default = "default_wait_timeout")]
        timeout_ms: u64,
        #[serde(default)]
        state: WaitState,
    },

    /// Wait for a fixed amount of time (use sparingly)
    Sleep { ms: u64 },

    /// Assert something about an element; failure fails the test
    Assert {
        selector: String,
        #[serde(default)]
        visible: Option<bool>,
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        text_contains: Option<String>,
        #[serde(default)]
        count: Option<usize>,
    },

    /// Like `assert`, but failures are collected and the test continues
    SoftAssert {
        selector: String,
        #[serde(default)]
        visible: Option<bool>,
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        text_contains: Option<String>,
        #[serde(default)]
        count: Option<usize>,
    },

    /// Take a screenshot into the screenshot directory
    Screenshot {
        name: String,
        #[serde(default)]
        full_page: bool,
    },

    /// Select an option from a dropdown
    Select { selector: String, value: String },

    /// Check a checkbox
    Check { selector: String },

    /// Execute custom JavaScript in the page
    Evaluate { script: String },

    /// Log a message into the execution log
    Log { message: String },
}

fn default_wait_timeout() -> u64 {
    5000 // 5 seconds default
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitState {
    #[default]
    Visible,
    Hidden,
    Attached,
    Detached,
}

impl TestSpec {
    /// Parse a test spec from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| Error::SpecParse(e.to_string()))
    }

    /// Parse a test spec from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| Error::SpecParse(format!("{}: {}", path.display(), e)))
    }

    /// Load all test specs from a directory, sorted by name for a stable
    /// execution order.
    pub fn load_all(dir: &Path) -> Result<Vec<Self>> {
        let mut specs = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            specs.push(Self::from_file(entry.path())?);
        }

        specs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(specs)
    }

    /// Filter specs by tag.
    pub fn filter_by_tag(specs: Vec<Self>, tag: &str) -> Vec<Self> {
        specs
            .into_iter()
            .filter(|s| s.tags.iter().any(|t| t == tag))
            .collect()
    }

    /// Resolve every `$page.element` reference in the spec against the
    /// registry. Unknown references are spec errors.
    pub fn resolve_pages(&mut self, registry: &PageRegistry) -> Result<()> {
        for step in self
            .setup
            .iter_mut()
            .chain(self.steps.iter_mut())
            .chain(self.teardown.iter_mut())
        {
            resolve_step(step, registry)?;
        }
        Ok(())
    }

    /// All steps of a phase.
    pub fn phase_steps(&self, phase: glasshouse_common::Phase) -> &[TestStep] {
        match phase {
            glasshouse_common::Phase::Setup => &self.setup,
            glasshouse_common::Phase::Call => &self.steps,
            glasshouse_common::Phase::Teardown => &self.teardown,
        }
    }
}

fn resolve_step(step: &mut TestStep, registry: &PageRegistry) -> Result<()> {
    match step {
        TestStep::Navigate {
            url,
            wait_for_selector,
        } => {
            *url = registry.resolve_url(url)?;
            if let Some(sel) = wait_for_selector {
                *sel = registry.resolve(sel)?;
            }
        }
        TestStep::Click { selector, .. }
        | TestStep::Wait { selector, .. }
        | TestStep::Check { selector }
        | TestStep::Assert { selector, .. }
        | TestStep::SoftAssert { selector, .. }
        | TestStep::Select { selector, .. }
        | TestStep::Fill { selector, .. } => {
            *selector = registry.resolve(selector)?;
        }
        TestStep::Press {
            selector: Some(sel),
            ..
        } => {
            *sel = registry.resolve(sel)?;
        }
        _ => {}
    }
    Ok(())
}

/// Short display name for a step, used in timing logs and error reports.
pub fn step_name(step: &TestStep) -> String {
    match step {
        TestStep::Navigate { url, .. } => format!("navigate:{}", url),
        TestStep::Click { selector, .. } => format!("click:{}", selector),
        TestStep::Fill { selector, .. } => format!("fill:{}", selector),
        TestStep::Press { key, .. } => format!("press:{}", key),
        TestStep::Wait { selector, .. } => format!("wait:{}", selector),
        TestStep::Sleep { ms } => format!("sleep:{}ms", ms),
        TestStep::Assert { selector, .. } => format!("assert:{}", selector),
        TestStep::SoftAssert { selector, .. } => format!("soft_assert:{}", selector),
        TestStep::Screenshot { name, .. } => format!("screenshot:{}", name),
        TestStep::Select { selector, .. } => format!("select:{}", selector),
        TestStep::Check { selector } => format!("check:{}", selector),
        TestStep::Evaluate { .. } => "evaluate".to_string(),
        TestStep::Log { message } => {
            format!("log:{}", message.chars().take(30).collect::<String>())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_spec() {
        let yaml = r#"
name: login-flow
description: Log in through the form
tags:
  - auth
  - smoke
steps:
  - action: navigate
    url: /login
    wait_for_selector: '#login-form'
  - action: fill
    selector: '#user-name'
    value: standard_user
  - action: click
    selector: '#login-button'
"#;
        let spec = TestSpec::from_yaml(yaml).unwrap();
        assert_eq!(spec.name, "login-flow");
        assert_eq!(spec.steps.len(), 3);
        assert!(spec.setup.is_empty());
        assert!(spec.xfail.is_none());
    }

    #[test]
    fn parse_spec_with_phases_and_markers() {
        let yaml = r#"
name: cart-badge
xfail: "known badge lag, CASE-77"
timeout_secs: 30
meta:
  case_id: CASE-77
  case_title: Cart badge updates
setup:
  - action: navigate
    url: /inventory
steps:
  - action: click
    selector: '.add-to-cart'
  - action: assert
    selector: '.cart-badge'
    text: '1'
teardown:
  - action: click
    selector: '#reset-state'
"#;
        let spec = TestSpec::from_yaml(yaml).unwrap();
        assert_eq!(spec.setup.len(), 1);
        assert_eq!(spec.teardown.len(), 1);
        assert_eq!(spec.xfail.as_deref(), Some("known badge lag, CASE-77"));
        assert_eq!(spec.meta.case_id.as_deref(), Some("CASE-77"));
        assert_eq!(spec.timeout_secs, Some(30));
    }

    #[test]
    fn parse_soft_assert_step() {
        let yaml = r#"
name: soft-checks
steps:
  - action: soft_assert
    selector: '.price'
    text_contains: '$'
"#;
        let spec = TestSpec::from_yaml(yaml).unwrap();
        assert!(matches!(spec.steps[0], TestStep::SoftAssert { .. }));
    }

    #[test]
    fn invalid_yaml_is_spec_parse_error() {
        let err = TestSpec::from_yaml("name: [broken").unwrap_err();
        assert!(matches!(err, Error::SpecParse(_)));
    }

    #[test]
    fn step_names_are_stable() {
        let step = TestStep::Click {
            selector: "#go".to_string(),
            timeout_ms: None,
        };
        assert_eq!(step_name(&step), "click:#go");
    }
}
