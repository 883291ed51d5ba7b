//! Environment capture for report metadata.

use serde::{Deserialize, Serialize};

/// Snapshot of the host and browser environment a test ran under.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentInfo {
    /// Operating system (e.g. "linux")
    #[serde(default)]
    pub os: String,
    /// CPU architecture (e.g. "x86_64")
    #[serde(default)]
    pub arch: String,
    /// Hostname of the machine running the suite
    #[serde(default)]
    pub host: String,
    /// Browser engine name (e.g. "Chromium")
    #[serde(default)]
    pub browser: String,
    /// Browser/Playwright version string
    #[serde(default)]
    pub browser_version: String,
    /// Glasshouse version that produced the result
    #[serde(default)]
    pub harness_version: String,
}

impl EnvironmentInfo {
    /// Capture the current host environment. Browser details are filled in
    /// by the harness once a browser handle exists.
    pub fn capture() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            host: hostname::get()
                .map(|h| h.to_string_lossy().into_owned())
                .unwrap_or_else(|_| "unknown".to_string()),
            browser: String::new(),
            browser_version: String::new(),
            harness_version: crate::VERSION.to_string(),
        }
    }

    /// Attach browser details to a captured snapshot.
    pub fn with_browser(mut self, name: &str, version: &str) -> Self {
        self.browser = name.to_string();
        self.browser_version = version.to_string();
        self
    }

    /// Rows for the report environment table, in display order.
    pub fn rows(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("OS", self.os.as_str()),
            ("Architecture", self.arch.as_str()),
            ("Host", self.host.as_str()),
            ("Browser", self.browser.as_str()),
            ("Browser version", self.browser_version.as_str()),
            ("Glasshouse", self.harness_version.as_str()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_fills_host_fields() {
        let env = EnvironmentInfo::capture();
        assert!(!env.os.is_empty());
        assert!(!env.arch.is_empty());
        assert_eq!(env.harness_version, crate::VERSION);
    }

    #[test]
    fn with_browser_sets_details() {
        let env = EnvironmentInfo::capture().with_browser("Chromium", "1.49");
        assert_eq!(env.browser, "Chromium");
        assert_eq!(env.browser_version, "1.49");
    }
}
