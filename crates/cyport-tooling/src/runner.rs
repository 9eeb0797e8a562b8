//! Repeated execution of a converted test and stability classification.

use core::time::Duration;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use cyport_core::types::NO_ERROR_MESSAGE;
use cyport_core::{Config, RunReport, TestRunOutcome};
use regex::Regex;
use tracing::{debug, info, warn};

use crate::executor::{CommandExecutor, CommandOutput};
use crate::files::FileHandler;

/// Placeholder in the test command replaced with the test path.
pub const TEST_PLACEHOLDER: &str = "{test}";

/// Matches the runner summary line for passing tests, e.g. `3 passed`
static PASSED_REGEX: LazyLock<Regex> = LazyLock::new(|| match Regex::new(r"\d+ passed") {
    Ok(regex) => regex,
    Err(err) => panic!("Passed regex is invalid: {err}"),
});

/// Matches the runner summary line for failing tests, e.g. `1 failed`
static FAILED_REGEX: LazyLock<Regex> = LazyLock::new(|| match Regex::new(r"\d+ failed") {
    Ok(regex) => regex,
    Err(err) => panic!("Failed regex is invalid: {err}"),
});

/// True iff every outcome succeeded. An empty slice is vacuously stable.
pub fn is_stable(outcomes: &[TestRunOutcome]) -> bool {
    outcomes.iter().all(|outcome| outcome.success)
}

/// Whether runner stdout reports passing tests and no failing ones.
pub fn output_passed(stdout: &str) -> bool {
    PASSED_REGEX.is_match(stdout) && !FAILED_REGEX.is_match(stdout)
}

/// Runs a single test file a fixed number of times through a [`CommandExecutor`].
pub struct TestRunner<E> {
    /// Executor used to spawn the test command
    executor: E,
    /// Working directory of the test command
    project_dir: PathBuf,
    /// Command template containing an optional `{test}` placeholder
    command_template: String,
    /// Executions per batch
    runs: usize,
    /// JSON reporter output
    report_file: PathBuf,
    /// Per-execution limit
    timeout: Option<Duration>,
}

impl<E: CommandExecutor> TestRunner<E> {
    /// Creates a runner using the project, command, batch size and report path from `config`.
    pub fn new(executor: E, config: &Config) -> Self {
        Self {
            executor,
            project_dir: config.project_dir.clone(),
            command_template: config.test_command.clone(),
            runs: config.stability_runs,
            report_file: config.report_file(),
            timeout: config.run_timeout,
        }
    }

    /// Number of executions in one batch.
    pub fn runs(&self) -> usize {
        self.runs
    }

    /// Executes the test once per iteration, sequentially, and returns every outcome.
    ///
    /// All iterations always run; a failure does not stop the batch. Each
    /// outcome carries the JSON report written during its execution, if any.
    pub async fn run(&self, test_path: &Path) -> Vec<TestRunOutcome> {
        let command = self.command_for(test_path);
        let mut outcomes = Vec::with_capacity(self.runs);

        for attempt in 1..=self.runs {
            info!(
                "Running test attempt {attempt}/{}: {}",
                self.runs,
                test_path.display()
            );
            outcomes.push(self.run_once(&command).await);
        }

        outcomes
    }

    /// Performs one execution and classifies it.
    async fn run_once(&self, command: &str) -> TestRunOutcome {
        if let Err(err) = FileHandler::delete(&self.report_file).await {
            warn!("Could not clear stale run report: {err}");
        }

        let outcome = match self
            .executor
            .execute(command, &self.project_dir, self.timeout)
            .await
        {
            Ok(output) => classify(&output),
            Err(err) => {
                warn!("Test execution error: {err}");
                TestRunOutcome::failed(err.to_string())
            }
        };

        outcome.with_report(self.read_report().await)
    }

    /// Parses the report written by the last execution.
    async fn read_report(&self) -> Option<RunReport> {
        if !self.report_file.exists() {
            return None;
        }
        let text = FileHandler::read(&self.report_file)
            .await
            .inspect_err(|err| warn!("Could not read run report: {err}"))
            .ok()?;
        RunReport::from_json(&text)
            .inspect_err(|err| warn!("Could not parse run report: {err}"))
            .ok()
    }

    /// Substitutes the test path, relative to the project when possible.
    fn command_for(&self, test_path: &Path) -> String {
        if !self.command_template.contains(TEST_PLACEHOLDER) {
            return self.command_template.clone();
        }
        let relative = test_path.strip_prefix(&self.project_dir).unwrap_or(test_path);
        self.command_template
            .replace(TEST_PLACEHOLDER, &shell_quote(&relative.to_string_lossy()))
    }
}

/// Turns command output into a pass/fail outcome.
fn classify(output: &CommandOutput) -> TestRunOutcome {
    debug!("Test execution output: {}", output.stdout);

    if output_passed(&output.stdout) {
        info!("Test passed");
        return TestRunOutcome::passed();
    }

    warn!("Test execution failed");
    let stderr = output.stderr.trim();
    if stderr.is_empty() {
        TestRunOutcome::failed(NO_ERROR_MESSAGE)
    } else {
        TestRunOutcome::failed(stderr)
    }
}

/// Wraps `text` in single quotes for `bash -c`.
fn shell_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}
