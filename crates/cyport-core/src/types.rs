use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::report::RunReport;

/// Fallback message for a failed run that produced nothing on stderr.
pub const NO_ERROR_MESSAGE: &str = "Tests failed without error message";

/// User turn sent to a model provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    pub text: String,
}

impl Query {
    pub fn new<T: Into<String>>(text: T) -> Self {
        Self { text: text.into() }
    }
}

/// Fixed parameters of a single-turn completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    pub system_prompt: String,
    pub max_tokens: u32,
}

impl Context {
    pub fn new<T: Into<String>>(system_prompt: T, max_tokens: u32) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            max_tokens,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub text: String,
    pub tokens_used: TokenUsage,
    pub provider: String,
    pub latency_ms: u64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input: u64,
    pub output: u64,
}

impl TokenUsage {
    #[must_use]
    pub fn total(&self) -> u64 {
        self.input + self.output
    }
}

/// A discovered Cypress test and its raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTest {
    pub path: PathBuf,
    pub content: String,
}

/// Outcome of one completion call.
///
/// A failed result never carries content; use [`CompletionResult::ok`] and
/// [`CompletionResult::failed`] rather than building the struct by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionResult {
    pub content: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CompletionResult {
    #[must_use]
    pub fn ok(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            success: true,
            error: None,
        }
    }

    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Error message and source location of a failing test, as fed to the fix prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureDetails {
    pub message: String,
    pub line: u32,
    pub column: u32,
}

/// Result of a single execution of the test command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestRunOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Structured report written by the runner during this execution, if any.
    #[serde(skip)]
    pub report: Option<RunReport>,
}

impl TestRunOutcome {
    #[must_use]
    pub fn passed() -> Self {
        Self {
            success: true,
            error: None,
            report: None,
        }
    }

    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            report: None,
        }
    }

    #[must_use]
    pub fn with_report(mut self, report: Option<RunReport>) -> Self {
        self.report = report;
        self
    }
}

/// Per-file entry of the final report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    pub original_file: PathBuf,
    pub converted_content: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Only set when the converted test was actually executed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_stable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_results: Option<Vec<TestRunOutcome>>,
    /// Where the converted test ended up: the primary path or the flaky folder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<PathBuf>,
}

impl ConversionResult {
    /// A file that could not be read, converted or written.
    #[must_use]
    pub fn failed(original_file: PathBuf, error: impl Into<String>) -> Self {
        let mut error = error.into();
        if error.is_empty() {
            "Unknown error occurred".clone_into(&mut error);
        }
        Self {
            original_file,
            converted_content: String::new(),
            success: false,
            error: Some(error),
            is_stable: None,
            run_results: None,
            destination: None,
        }
    }

    /// A converted file that was executed, stable or not.
    #[must_use]
    pub fn validated(
        original_file: PathBuf,
        converted_content: String,
        is_stable: bool,
        run_results: Vec<TestRunOutcome>,
        destination: PathBuf,
    ) -> Self {
        Self {
            original_file,
            converted_content,
            success: true,
            error: None,
            is_stable: Some(is_stable),
            run_results: Some(run_results),
            destination: Some(destination),
        }
    }

    /// Whether the test was quarantined as flaky.
    #[must_use]
    pub fn is_flaky(&self) -> bool {
        self.success && self.is_stable == Some(false)
    }
}

/// Ordered, append-only sequence of per-file results in discovery order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversionReport {
    results: Vec<ConversionResult>,
}

impl ConversionReport {
    pub fn push(&mut self, result: ConversionResult) {
        self.results.push(result);
    }

    #[must_use]
    pub fn results(&self) -> &[ConversionResult] {
        &self.results
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Number of files converted and stable.
    #[must_use]
    pub fn stable_count(&self) -> usize {
        self.results
            .iter()
            .filter(|result| result.is_stable == Some(true))
            .count()
    }

    /// Number of files quarantined as flaky.
    #[must_use]
    pub fn flaky_count(&self) -> usize {
        self.results.iter().filter(|result| result.is_flaky()).count()
    }

    /// Number of files that failed before validation.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|result| !result.success).count()
    }
}

impl IntoIterator for ConversionReport {
    type Item = ConversionResult;
    type IntoIter = std::vec::IntoIter<ConversionResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_completion_has_no_content() {
        let result = CompletionResult::failed("rate limited");
        assert!(!result.success);
        assert!(result.content.is_empty());
        assert_eq!(result.error.as_deref(), Some("rate limited"));
    }

    #[test]
    fn test_failed_conversion_never_has_empty_error() {
        let result = ConversionResult::failed(PathBuf::from("a.cy.ts"), "");
        assert!(!result.success);
        assert!(result.converted_content.is_empty());
        assert_eq!(result.error.as_deref(), Some("Unknown error occurred"));
        assert!(result.is_stable.is_none());
    }

    #[test]
    fn test_report_counts() {
        let mut report = ConversionReport::default();
        report.push(ConversionResult::failed(PathBuf::from("a.cy.ts"), "boom"));
        report.push(ConversionResult::validated(
            PathBuf::from("b.cy.ts"),
            "code".to_owned(),
            true,
            vec![TestRunOutcome::passed()],
            PathBuf::from("b.spec.ts"),
        ));
        report.push(ConversionResult::validated(
            PathBuf::from("c.cy.ts"),
            "code".to_owned(),
            false,
            vec![TestRunOutcome::failed(NO_ERROR_MESSAGE)],
            PathBuf::from("flaky/c.spec.ts"),
        ));

        assert_eq!(report.len(), 3);
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.stable_count(), 1);
        assert_eq!(report.flaky_count(), 1);
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let mut report = ConversionReport::default();
        report.push(ConversionResult::failed(PathBuf::from("a.cy.ts"), "boom"));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json[0]["originalFile"], "a.cy.ts");
        assert_eq!(json[0]["convertedContent"], "");
        assert!(json[0].get("isStable").is_none());
    }
}
