//! Conversion settings, sourced from the environment with an optional TOML fallback.

use core::fmt;
use core::time::Duration;
use std::env;
use std::fs::read_to_string;
use std::path::{Path, PathBuf};

use toml::{Table, Value};

use crate::{Error, Result};

/// Env var holding the Cypress tests directory.
pub const ENV_CYPRESS_TESTS_PATH: &str = "CYPRESS_TESTS_PATH";
/// Env var holding the directory converted tests are written to.
pub const ENV_PLAYWRIGHT_TESTS_PATH: &str = "PLAYWRIGHT_TESTS_PATH";
/// Env var holding the Playwright project the test command runs in.
pub const ENV_PLAYWRIGHT_PROJECT_DIR: &str = "PLAYWRIGHT_PROJECT_DIR";
/// Env var holding the completion API key.
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
const ENV_OPENAI_MODEL: &str = "OPENAI_MODEL";
const ENV_OPENAI_MAX_TOKENS: &str = "OPENAI_MAX_TOKENS";
const ENV_OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";
const ENV_TEST_COMMAND: &str = "CYPORT_TEST_COMMAND";
const ENV_STABILITY_RUNS: &str = "CYPORT_STABILITY_RUNS";
const ENV_REPORT_PATH: &str = "CYPORT_REPORT_PATH";
const ENV_RUN_TIMEOUT_SECS: &str = "CYPORT_RUN_TIMEOUT_SECS";

/// Default model used for conversion.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
/// Default completion token ceiling.
pub const DEFAULT_MAX_TOKENS: u32 = 2048;
/// Default chat completions endpoint.
pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";
/// Default test command. `{test}` is replaced with the test path.
pub const DEFAULT_TEST_COMMAND: &str = "npm run test -- {test}";
/// Default number of executions in a stability batch.
pub const DEFAULT_STABILITY_RUNS: usize = 3;
/// Default JSON reporter output, relative to the project directory.
pub const DEFAULT_REPORT_PATH: &str = "test-results/results.json";

/// How converted files are placed under the destination directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LayoutMode {
    /// Every converted file lands directly in the destination directory.
    #[default]
    Flat,
    /// Subdirectories relative to the source directory are kept.
    Preserve,
}

/// Immutable run configuration, built once at startup.
#[derive(Clone)]
pub struct Config {
    /// Directory scanned for `*.cy.ts` files.
    pub source_dir: PathBuf,
    /// Directory converted `*.spec.ts` files are written to.
    pub destination_dir: PathBuf,
    /// Working directory of the test command.
    pub project_dir: PathBuf,
    /// Completion API key.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
    /// Maximum output tokens per completion.
    pub max_tokens: u32,
    /// Chat completions endpoint.
    pub api_url: String,
    /// Shell command that runs a single test.
    pub test_command: String,
    /// Executions per stability batch.
    pub stability_runs: usize,
    /// JSON reporter output path, relative to `project_dir` unless absolute.
    pub report_path: PathBuf,
    /// Upper bound for one execution of the test command.
    pub run_timeout: Option<Duration>,
    /// Destination layout.
    pub layout: LayoutMode,
}

impl Config {
    /// Creates a configuration with defaults for every optional setting.
    pub fn new(
        source_dir: impl Into<PathBuf>,
        destination_dir: impl Into<PathBuf>,
        project_dir: impl Into<PathBuf>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            source_dir: source_dir.into(),
            destination_dir: destination_dir.into(),
            project_dir: project_dir.into(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_owned(),
            max_tokens: DEFAULT_MAX_TOKENS,
            api_url: DEFAULT_API_URL.to_owned(),
            test_command: DEFAULT_TEST_COMMAND.to_owned(),
            stability_runs: DEFAULT_STABILITY_RUNS,
            report_path: PathBuf::from(DEFAULT_REPORT_PATH),
            run_timeout: None,
            layout: LayoutMode::Flat,
        }
    }

    /// Loads configuration from the process environment.
    ///
    /// # Errors
    /// Returns [`Error::MissingConfig`] listing every missing required key, or
    /// [`Error::Config`] if an optional value cannot be parsed.
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }

    /// Loads configuration from the environment, falling back to a TOML file.
    ///
    /// File keys are the lowercase names of the environment variables, for
    /// example `cypress_tests_path`. Environment values win.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or if the merged
    /// settings are incomplete or invalid.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let table = match file {
            Some(path) => {
                let content =
                    read_to_string(path).map_err(|err| Error::io("read", path, err))?;
                toml::from_str::<Table>(&content)?
            }
            None => Table::new(),
        };

        Self::from_lookup(|key| {
            env::var(key)
                .ok()
                .filter(|value| !value.trim().is_empty())
                .or_else(|| table.get(&key.to_lowercase()).and_then(value_to_string))
        })
    }

    /// Builds configuration from an arbitrary key lookup.
    ///
    /// Empty values count as missing.
    ///
    /// # Errors
    /// Returns [`Error::MissingConfig`] listing every missing required key, or
    /// [`Error::Config`] if an optional value cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let required = [
            ENV_CYPRESS_TESTS_PATH,
            ENV_PLAYWRIGHT_TESTS_PATH,
            ENV_PLAYWRIGHT_PROJECT_DIR,
            ENV_OPENAI_API_KEY,
        ];
        let missing: Vec<String> = required
            .into_iter()
            .filter(|key| get(*key).is_none())
            .map(str::to_owned)
            .collect();
        if !missing.is_empty() {
            return Err(Error::MissingConfig(missing));
        }

        let require = |key: &str| get(key).ok_or_else(|| Error::MissingConfig(vec![key.to_owned()]));
        let mut config = Self::new(
            require(ENV_CYPRESS_TESTS_PATH)?,
            require(ENV_PLAYWRIGHT_TESTS_PATH)?,
            require(ENV_PLAYWRIGHT_PROJECT_DIR)?,
            require(ENV_OPENAI_API_KEY)?,
        );

        if let Some(model) = get(ENV_OPENAI_MODEL) {
            config.model = model;
        }
        if let Some(max_tokens) = get(ENV_OPENAI_MAX_TOKENS) {
            config.max_tokens = parse_number(ENV_OPENAI_MAX_TOKENS, &max_tokens)?;
        }
        if let Some(api_url) = get(ENV_OPENAI_BASE_URL) {
            config.api_url = api_url;
        }
        if let Some(command) = get(ENV_TEST_COMMAND) {
            config.test_command = command;
        }
        if let Some(runs) = get(ENV_STABILITY_RUNS) {
            config = config.with_stability_runs(parse_number(ENV_STABILITY_RUNS, &runs)?)?;
        }
        if let Some(report_path) = get(ENV_REPORT_PATH) {
            config.report_path = PathBuf::from(report_path);
        }
        if let Some(timeout) = get(ENV_RUN_TIMEOUT_SECS) {
            let secs: u64 = parse_number(ENV_RUN_TIMEOUT_SECS, &timeout)?;
            config.run_timeout = Some(Duration::from_secs(secs));
        }

        Ok(config)
    }

    /// Sets the stability batch size.
    ///
    /// # Errors
    /// Returns [`Error::Config`] for zero, which would make every test
    /// vacuously stable.
    pub fn with_stability_runs(mut self, runs: usize) -> Result<Self> {
        if runs == 0 {
            return Err(Error::Config(format!(
                "{ENV_STABILITY_RUNS} must be at least 1"
            )));
        }
        self.stability_runs = runs;
        Ok(self)
    }

    /// Sets the destination layout.
    #[must_use]
    pub fn with_layout(mut self, layout: LayoutMode) -> Self {
        self.layout = layout;
        self
    }

    /// Absolute or project-relative location of the JSON run report.
    #[must_use]
    pub fn report_file(&self) -> PathBuf {
        if self.report_path.is_absolute() {
            self.report_path.clone()
        } else {
            self.project_dir.join(&self.report_path)
        }
    }

    /// Folder that receives quarantined conversions.
    #[must_use]
    pub fn flaky_dir(&self) -> PathBuf {
        self.destination_dir.join("flaky")
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Config")
            .field("source_dir", &self.source_dir)
            .field("destination_dir", &self.destination_dir)
            .field("project_dir", &self.project_dir)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("api_url", &self.api_url)
            .field("test_command", &self.test_command)
            .field("stability_runs", &self.stability_runs)
            .field("report_path", &self.report_path)
            .field("run_timeout", &self.run_timeout)
            .field("layout", &self.layout)
            .finish()
    }
}

fn parse_number<T: core::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{key} must be a non-negative integer, got '{value}'")))
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Integer(number) => Some(number.to_string()),
        Value::Boolean(flag) => Some(flag.to_string()),
        _ => None,
    }
}
