//! Serde model of the Playwright JSON reporter output.
//!
//! Only the fields needed to locate a failing test are modelled; everything
//! else in the report is ignored.

use serde::{Deserialize, Serialize};

use crate::types::FailureDetails;

/// Root of a Playwright JSON report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Top-level suites, one per test file.
    #[serde(default)]
    pub suites: Vec<ReportSuite>,
}

/// A `describe` block or file-level suite.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSuite {
    /// Suite title.
    #[serde(default)]
    pub title: String,
    /// Specs declared directly in this suite.
    #[serde(default)]
    pub specs: Vec<ReportSpec>,
    /// Nested suites.
    #[serde(default)]
    pub suites: Vec<ReportSuite>,
}

/// A single `test(...)` declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSpec {
    /// Spec title.
    #[serde(default)]
    pub title: String,
    /// Whether every project run of this spec passed.
    #[serde(default = "default_ok")]
    pub ok: bool,
    /// One entry per configured project.
    #[serde(default)]
    pub tests: Vec<ReportTest>,
}

/// Execution of a spec within one project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportTest {
    /// One entry per attempt, including retries.
    #[serde(default)]
    pub results: Vec<ReportResult>,
}

/// A single attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportResult {
    /// `passed`, `failed`, `timedOut`, `skipped` or `interrupted`.
    #[serde(default)]
    pub status: String,
    /// First error raised by the attempt.
    #[serde(default)]
    pub error: Option<ReportError>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportError {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub location: Option<ReportLocation>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportLocation {
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub column: u32,
}

const fn default_ok() -> bool {
    true
}

impl RunReport {
    /// Parses the JSON text written by the reporter.
    ///
    /// # Errors
    /// Returns an error if the text is not a valid report.
    pub fn from_json(text: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Error of the first failing test in the first suite.
    ///
    /// Only the first top-level suite is inspected. Within it, the suite's own
    /// specs are searched before its nested suites, depth-first.
    #[must_use]
    pub fn first_failure(&self) -> Option<FailureDetails> {
        self.suites.first().and_then(ReportSuite::first_failure)
    }
}

impl ReportSuite {
    fn first_failure(&self) -> Option<FailureDetails> {
        self.specs
            .iter()
            .filter(|spec| !spec.ok)
            .find_map(ReportSpec::first_failure)
            .or_else(|| self.suites.iter().find_map(Self::first_failure))
    }
}

impl ReportSpec {
    fn first_failure(&self) -> Option<FailureDetails> {
        self.tests
            .iter()
            .flat_map(|test| &test.results)
            .filter(|result| result.status != "passed" && result.status != "skipped")
            .find_map(|result| result.error.as_ref())
            .map(|error| {
                let (line, column) = error
                    .location
                    .as_ref()
                    .map_or((0, 0), |location| (location.line, location.column));
                FailureDetails {
                    message: error.message.clone(),
                    line,
                    column,
                }
            })
    }
}
