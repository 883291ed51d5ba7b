//! Playwright browser automation.
//!
//! Each phase of a test is compiled into a self-contained Node script that
//! imports Playwright, launches a browser, performs the steps, and reports
//! back over stdout: `[TIMING]` lines for per-step durations and a single
//! `[RESULT]` line carrying the JSON outcome (including soft-assert
//! failures, the final page URL, and a failure screenshot).

use std::path::PathBuf;
use std::process::Stdio;

use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use glasshouse_common::{Error, Result};

use crate::spec::{step_name, TestStep, WaitState};
use crate::timing::TIMING_PREFIX;

/// Marker prefix for the outcome line in subprocess stdout.
const RESULT_PREFIX: &str = "[RESULT] ";

/// JPEG quality for failure screenshots. Low on purpose: the image is
/// embedded base64 into every failing result record.
const FAILURE_SCREENSHOT_QUALITY: u32 = 60;

/// Browser engine to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BrowserKind {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl BrowserKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserKind::Chromium => "chromium",
            BrowserKind::Firefox => "firefox",
            BrowserKind::Webkit => "webkit",
        }
    }

    /// Display name for report environment metadata.
    pub fn display_name(&self) -> &'static str {
        match self {
            BrowserKind::Chromium => "Chromium",
            BrowserKind::Firefox => "Firefox",
            BrowserKind::Webkit => "WebKit",
        }
    }
}

impl std::str::FromStr for BrowserKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "chromium" => Ok(BrowserKind::Chromium),
            "firefox" => Ok(BrowserKind::Firefox),
            "webkit" => Ok(BrowserKind::Webkit),
            other => Err(Error::InvalidConfig(format!("unknown browser: {}", other))),
        }
    }
}

impl std::fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration for the browser handle.
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub base_url: String,
    pub browser: BrowserKind,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Directory for explicit `screenshot` steps
    pub screenshot_dir: PathBuf,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            browser: BrowserKind::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            screenshot_dir: PathBuf::from("test-results/screenshots"),
        }
    }
}

/// Outcome of running one phase's step sequence.
#[derive(Debug, Clone, Default)]
pub struct ScriptOutcome {
    pub success: bool,
    /// Error message when the sequence did not complete
    pub error: Option<String>,
    /// Name of the failing step
    pub failed_step: Option<String>,
    /// True when the failure was an assertion, not an infrastructure error
    pub assertion_failure: bool,
    /// Collected soft-assert failure messages
    pub soft_failures: Vec<String>,
    /// URL the page ended on
    pub end_url: Option<String>,
    /// Base64 JPEG screenshot taken at failure time
    pub screenshot: Option<String>,
    /// Raw subprocess stdout (timing lines included)
    pub stdout: String,
    /// Raw subprocess stderr
    pub stderr: String,
}

/// Payload of the `[RESULT]` line.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsPayload {
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    failed_step: Option<String>,
    #[serde(default)]
    assertion: bool,
    #[serde(default)]
    soft_failures: Vec<String>,
    #[serde(default)]
    end_url: Option<String>,
    #[serde(default)]
    screenshot: Option<String>,
}

/// Playwright browser handle.
///
/// Stateless between runs; every [`run_steps`](Self::run_steps) call spawns
/// a fresh browser so phases never leak state into each other.
pub struct PlaywrightHandle {
    config: BrowserConfig,
}

impl PlaywrightHandle {
    /// Create a new handle, verifying Playwright is installed.
    pub fn new(config: BrowserConfig) -> Result<Self> {
        Self::check_playwright_installed()?;
        std::fs::create_dir_all(&config.screenshot_dir)?;
        Ok(Self { config })
    }

    /// Check if Playwright is installed.
    fn check_playwright_installed() -> Result<()> {
        let status = std::process::Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(Error::PlaywrightNotFound),
        }
    }

    /// Installed Playwright version, for report environment metadata.
    pub fn version() -> Result<String> {
        let output = std::process::Command::new("npx")
            .args(["playwright", "--version"])
            .output()
            .map_err(|_| Error::PlaywrightNotFound)?;
        if !output.status.success() {
            return Err(Error::PlaywrightNotFound);
        }
        let text = String::from_utf8_lossy(&output.stdout);
        Ok(text.trim().trim_start_matches("Version ").to_string())
    }

    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }

    /// Same handle with a different viewport, for per-spec overrides.
    /// Skips the install probe; the original handle already passed it.
    pub fn with_viewport(&self, width: u32, height: u32) -> Self {
        let mut config = self.config.clone();
        config.viewport_width = width;
        config.viewport_height = height;
        Self { config }
    }

    /// Execute a step sequence in a fresh browser.
    ///
    /// Step failures come back as an unsuccessful [`ScriptOutcome`], not an
    /// `Err`; only spawn-level problems surface as errors.
    pub async fn run_steps(&self, steps: &[TestStep]) -> Result<ScriptOutcome> {
        let script = self.build_script(steps);

        let temp_dir = tempfile::tempdir()?;
        let script_path = temp_dir.path().join("phase.js");
        std::fs::write(&script_path, &script)?;

        debug!("Running browser script: {}", script_path.display());

        let output = Command::new("node")
            .arg(&script_path)
            .current_dir(temp_dir.path())
            .output()
            .await?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        let payload = stdout
            .lines()
            .rev()
            .find_map(|line| line.strip_prefix(RESULT_PREFIX))
            .map(serde_json::from_str::<JsPayload>)
            .transpose()
            .map_err(|e| Error::Playwright(format!("Malformed result payload: {}", e)))?;

        let outcome = match payload {
            Some(payload) => ScriptOutcome {
                success: payload.success,
                error: payload.error,
                failed_step: payload.failed_step,
                assertion_failure: payload.assertion,
                soft_failures: payload.soft_failures,
                end_url: payload.end_url,
                screenshot: payload.screenshot,
                stdout,
                stderr,
            },
            // The script died before reporting: browser crash, missing
            // module, OOM. Always an infrastructure error.
            None => ScriptOutcome {
                success: false,
                error: Some(format!(
                    "Browser script exited without a result:\n{}",
                    if stderr.trim().is_empty() {
                        &stdout
                    } else {
                        &stderr
                    }
                )),
                failed_step: None,
                assertion_failure: false,
                soft_failures: Vec::new(),
                end_url: None,
                screenshot: None,
                stdout,
                stderr,
            },
        };

        Ok(outcome)
    }

    /// Build the Node script for a step sequence.
    pub fn build_script(&self, steps: &[TestStep]) -> String {
        let mut script = String::new();

        script.push_str(&format!(
            r#"const {{ chromium, firefox, webkit }} = require('playwright');

(async () => {{
  const browser = await {browser}.launch({{ headless: {headless} }});
  const context = await browser.newContext({{
    viewport: {{ width: {width}, height: {height} }}
  }});
  const page = await context.newPage();
  const baseUrl = {base_url};
  const softFailures = [];
  let currentStep = '';
  let assertion = false;
  let t0 = 0;
  const timing = (name) => {{
    console.log('{timing_prefix}' + ((Date.now() - t0) / 1000).toFixed(4) + ' ' + name);
  }};
  const fail = (msg) => {{ assertion = true; throw new Error('Assertion failed: ' + msg); }};

  try {{
"#,
            browser = self.config.browser.as_str(),
            headless = self.config.headless,
            width = self.config.viewport_width,
            height = self.config.viewport_height,
            base_url = js_str(&self.config.base_url),
            timing_prefix = TIMING_PREFIX,
        ));

        for (i, step) in steps.iter().enumerate() {
            let name = step_name(step);
            script.push_str(&format!("\n    // Step {}: {}\n", i + 1, name));
            script.push_str(&format!(
                "    currentStep = {};\n    t0 = Date.now();\n",
                js_str(&name)
            ));
            script.push_str(&self.step_to_js(step, i));
            script.push_str("    timing(currentStep);\n");
        }

        script.push_str(&format!(
            r#"
    console.log('{result_prefix}' + JSON.stringify({{
      success: true, softFailures, endUrl: page.url()
    }}));
  }} catch (error) {{
    let screenshot = null;
    try {{
      screenshot = (await page.screenshot({{ type: 'jpeg', quality: {quality} }})).toString('base64');
    }} catch (_) {{}}
    console.log('{result_prefix}' + JSON.stringify({{
      success: false, error: error.message, failedStep: currentStep,
      assertion, softFailures, endUrl: page.url(), screenshot
    }}));
    process.exitCode = 1;
  }} finally {{
    await browser.close();
  }}
}})();
"#,
            result_prefix = RESULT_PREFIX,
            quality = FAILURE_SCREENSHOT_QUALITY,
        ));

        script
    }

    /// Convert one step to JavaScript.
    fn step_to_js(&self, step: &TestStep, step_index: usize) -> String {
        match step {
            TestStep::Navigate {
                url,
                wait_for_selector,
            } => {
                let target = if url.starts_with("http://") || url.starts_with("https://") {
                    js_str(url)
                } else {
                    format!("baseUrl + {}", js_str(url))
                };
                let wait = wait_for_selector
                    .as_ref()
                    .map(|s| format!("    await page.waitForSelector({});\n", js_str(s)))
                    .unwrap_or_default();
                format!("    await page.goto({});\n{}", target, wait)
            }
            TestStep::Click {
                selector,
                timeout_ms,
            } => {
                let timeout = timeout_ms.unwrap_or(5000);
                format!(
                    "    await page.click({}, {{ timeout: {} }});\n",
                    js_str(selector),
                    timeout
                )
            }
            TestStep::Fill {
                selector,
                value,
                clear_first,
            } => {
                let mut js = String::new();
                if *clear_first {
                    js.push_str(&format!("    await page.fill({}, '');\n", js_str(selector)));
                }
                js.push_str(&format!(
                    "    await page.fill({}, {});\n",
                    js_str(selector),
                    js_str(value)
                ));
                js
            }
            TestStep::Press { selector, key } => match selector {
                Some(sel) => format!(
                    "    await page.locator({}).press({});\n",
                    js_str(sel),
                    js_str(key)
                ),
                None => format!("    await page.keyboard.press({});\n", js_str(key)),
            },
            TestStep::Wait {
                selector,
                timeout_ms,
                state,
            } => {
                let state_str = match state {
                    WaitState::Visible => "visible",
                    WaitState::Hidden => "hidden",
                    WaitState::Attached => "attached",
                    WaitState::Detached => "detached",
                };
                format!(
                    "    await page.waitForSelector({}, {{ state: '{}', timeout: {} }});\n",
                    js_str(selector),
                    state_str,
                    timeout_ms
                )
            }
            TestStep::Sleep { ms } => format!("    await page.waitForTimeout({});\n", ms),
            TestStep::Assert {
                selector,
                visible,
                text,
                text_contains,
                count,
            } => assertion_js(step_index, selector, visible, text, text_contains, count, false),
            TestStep::SoftAssert {
                selector,
                visible,
                text,
                text_contains,
                count,
            } => assertion_js(step_index, selector, visible, text, text_contains, count, true),
            TestStep::Screenshot { name, full_page } => {
                let path = self.config.screenshot_dir.join(format!("{}.png", name));
                format!(
                    "    await page.screenshot({{ path: {}, fullPage: {} }});\n",
                    js_str(&path.to_string_lossy()),
                    full_page
                )
            }
            TestStep::Select { selector, value } => format!(
                "    await page.selectOption({}, {});\n",
                js_str(selector),
                js_str(value)
            ),
            TestStep::Check { selector } => {
                format!("    await page.check({});\n", js_str(selector))
            }
            TestStep::Evaluate { script } => {
                format!("    await page.evaluate(() => {{ {} }});\n", script)
            }
            TestStep::Log { message } => {
                format!("    console.log('[TEST] ' + {});\n", js_str(message))
            }
        }
    }
}

/// Generate the checks for an assert / soft_assert step.
///
/// Hard assertion failures throw through `fail()` (marking the failure as
/// an assertion); soft ones push onto `softFailures` and continue.
fn assertion_js(
    step_index: usize,
    selector: &str,
    visible: &Option<bool>,
    text: &Option<String>,
    text_contains: &Option<String>,
    count: &Option<usize>,
    soft: bool,
) -> String {
    let var = format!("el_{}", step_index);
    let text_var = format!("text_{}", step_index);
    let sel = js_str(selector);
    let report = |message: String| -> String {
        if soft {
            format!("softFailures.push({});", message)
        } else {
            format!("fail({});", message)
        }
    };

    let mut js = format!("    const {} = page.locator({});\n", var, sel);

    if let Some(expect_visible) = visible {
        if *expect_visible {
            js.push_str(&format!(
                "    if (!(await {var}.isVisible())) {}\n",
                report(format!("{} + ' is not visible'", sel_literal(selector)))
            ));
        } else {
            js.push_str(&format!(
                "    if (await {var}.isVisible()) {}\n",
                report(format!("{} + ' is unexpectedly visible'", sel_literal(selector)))
            ));
        }
    }

    if text.is_some() || text_contains.is_some() {
        js.push_str(&format!(
            "    const {text_var} = ((await {var}.textContent()) || '').trim();\n"
        ));
    }

    if let Some(expected) = text {
        js.push_str(&format!(
            "    if ({text_var} !== {expected}) {}\n",
            report(format!(
                "{} + ' text is \\'' + {text_var} + '\\', expected ' + {expected}",
                sel_literal(selector),
                expected = js_str(expected),
            )),
            expected = js_str(expected),
        ));
    }

    if let Some(fragment) = text_contains {
        js.push_str(&format!(
            "    if (!{text_var}.includes({fragment})) {}\n",
            report(format!(
                "{} + ' text \\'' + {text_var} + '\\' does not contain ' + {fragment}",
                sel_literal(selector),
                fragment = js_str(fragment),
            )),
            fragment = js_str(fragment),
        ));
    }

    if let Some(expected) = count {
        js.push_str(&format!(
            "    if ((await {var}.count()) !== {expected}) {}\n",
            report(format!(
                "{} + ' count is not {}'",
                sel_literal(selector),
                expected
            ))
        ));
    }

    js
}

/// Selector as a JS string literal, for assertion messages.
fn sel_literal(selector: &str) -> String {
    js_str(selector)
}

/// Encode a Rust string as a JavaScript string literal.
fn js_str(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> PlaywrightHandle {
        // Bypass the install probe in unit tests.
        PlaywrightHandle {
            config: BrowserConfig {
                base_url: "http://127.0.0.1:4000".to_string(),
                ..BrowserConfig::default()
            },
        }
    }

    #[test]
    fn js_str_escapes_quotes() {
        assert_eq!(js_str("a'b\"c"), r#""a'b\"c""#);
    }

    #[test]
    fn script_contains_header_and_result_line() {
        let script = handle().build_script(&[TestStep::Navigate {
            url: "/login".to_string(),
            wait_for_selector: None,
        }]);
        assert!(script.contains("chromium.launch({ headless: true })"));
        assert!(script.contains(r#"await page.goto(baseUrl + "/login");"#));
        assert!(script.contains(RESULT_PREFIX));
        assert!(script.contains("quality: 60"));
    }

    #[test]
    fn absolute_urls_skip_base() {
        let script = handle().build_script(&[TestStep::Navigate {
            url: "https://example.com/x".to_string(),
            wait_for_selector: None,
        }]);
        assert!(script.contains(r#"await page.goto("https://example.com/x");"#));
        assert!(!script.contains(r#"baseUrl + "https://example.com/x""#));
    }

    #[test]
    fn assert_step_throws_through_fail() {
        let script = handle().build_script(&[TestStep::Assert {
            selector: ".badge".to_string(),
            visible: Some(true),
            text: Some("1".to_string()),
            text_contains: None,
            count: None,
        }]);
        assert!(script.contains("fail("));
        assert!(script.contains("isVisible()"));
        assert!(script.contains("textContent()"));
    }

    #[test]
    fn soft_assert_pushes_instead_of_throwing() {
        let script = handle().build_script(&[TestStep::SoftAssert {
            selector: ".price".to_string(),
            visible: None,
            text: None,
            text_contains: Some("$".to_string()),
            count: None,
        }]);
        assert!(script.contains("softFailures.push("));
        // A soft assert alone must never throw.
        let body_after_try = script.split("try {").nth(1).unwrap();
        let body = body_after_try.split("} catch").next().unwrap();
        assert!(!body.contains("fail("));
    }

    #[test]
    fn timing_wraps_every_step() {
        let script = handle().build_script(&[
            TestStep::Click {
                selector: "#a".to_string(),
                timeout_ms: None,
            },
            TestStep::Sleep { ms: 10 },
        ]);
        assert_eq!(script.matches("timing(currentStep);").count(), 2);
    }
}
