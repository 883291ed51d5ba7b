//! Soft assertion collection.
//!
//! Soft asserts record failures without stopping the step sequence; the
//! collected failures fold into the call-phase outcome once the test ends.

/// Collects soft assertion failures for one test attempt.
#[derive(Debug, Default)]
pub struct SoftAssert {
    failures: Vec<String>,
}

impl SoftAssert {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure message.
    pub fn record(&mut self, message: impl Into<String>) {
        self.failures.push(message.into());
    }

    /// Record a failure when the condition does not hold.
    pub fn check(&mut self, condition: bool, message: impl Into<String>) {
        if !condition {
            self.record(message);
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn failures(&self) -> &[String] {
        &self.failures
    }

    /// Combined failure text for the result record, or `None` when every
    /// check held.
    pub fn summary(&self) -> Option<String> {
        if self.failures.is_empty() {
            return None;
        }
        let numbered: Vec<String> = self
            .failures
            .iter()
            .enumerate()
            .map(|(i, f)| format!("{}. {}", i + 1, f))
            .collect();
        Some(format!(
            "Soft assert failures ({}):\n{}",
            self.failures.len(),
            numbered.join("\n")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_failures_means_no_summary() {
        let mut soft = SoftAssert::new();
        soft.check(true, "should not be recorded");
        assert!(!soft.has_failures());
        assert_eq!(soft.summary(), None);
    }

    #[test]
    fn failures_are_numbered_in_order() {
        let mut soft = SoftAssert::new();
        soft.check(false, "badge count wrong");
        soft.record("price missing currency");
        let summary = soft.summary().unwrap();
        assert!(summary.starts_with("Soft assert failures (2):"));
        assert!(summary.contains("1. badge count wrong"));
        assert!(summary.contains("2. price missing currency"));
    }
}
