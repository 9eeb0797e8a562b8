//! Scripted command executor for testing the runner and the conversion pipeline
//! without spawning real test processes.

use core::time::Duration;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cyport_core::{Error, IgnoreLock as _, Result};
use tokio::fs::{create_dir_all, write};

use crate::executor::{CommandExecutor, CommandOutput};

/// One scripted execution.
#[derive(Debug, Clone)]
struct ScriptedRun {
    /// Output to return, or the message of a spawn failure
    output: core::result::Result<CommandOutput, String>,
    /// Report file written before returning, as a real reporter would
    report: Option<(PathBuf, String)>,
}

/// Executor that replays queued outputs in order.
#[derive(Debug, Clone, Default)]
pub struct ScriptedExecutor {
    /// Remaining scripted executions
    runs: Arc<Mutex<VecDeque<ScriptedRun>>>,
    /// Commands received, with their working directory
    history: Arc<Mutex<Vec<(String, PathBuf)>>>,
}

impl ScriptedExecutor {
    /// Create an executor with nothing queued.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a run whose stdout is `stdout` and exit code is derived from it.
    #[must_use]
    pub fn with_stdout(self, stdout: impl Into<String>) -> Self {
        let stdout = stdout.into();
        let exit_code = i32::from(stdout.contains("failed"));
        self.with_output(CommandOutput {
            stdout,
            stderr: String::new(),
            exit_code,
        })
    }

    /// Queue `count` identical runs.
    #[must_use]
    pub fn with_repeated_stdout(self, stdout: &str, count: usize) -> Self {
        (0..count).fold(self, |executor, _| executor.with_stdout(stdout))
    }

    /// Queue a run with a fully specified output.
    #[must_use]
    pub fn with_output(self, output: CommandOutput) -> Self {
        self.runs.lock_ignore_poison().push_back(ScriptedRun {
            output: Ok(output),
            report: None,
        });
        self
    }

    /// Queue a run that fails to spawn.
    #[must_use]
    pub fn with_spawn_error(self, message: impl Into<String>) -> Self {
        self.runs.lock_ignore_poison().push_back(ScriptedRun {
            output: Err(message.into()),
            report: None,
        });
        self
    }

    /// Make the most recently queued run write `json` to `path`.
    #[must_use]
    pub fn with_report(self, path: impl Into<PathBuf>, json: impl Into<String>) -> Self {
        if let Some(run) = self.runs.lock_ignore_poison().back_mut() {
            run.report = Some((path.into(), json.into()));
        }
        self
    }

    /// Commands executed so far.
    #[must_use]
    pub fn history(&self) -> Vec<(String, PathBuf)> {
        self.history.lock_ignore_poison().clone()
    }

    /// Number of commands executed so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.history.lock_ignore_poison().len()
    }

    /// Number of queued runs not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.runs.lock_ignore_poison().len()
    }
}

#[async_trait]
impl CommandExecutor for ScriptedExecutor {
    async fn execute(
        &self,
        command: &str,
        cwd: &Path,
        _timeout: Option<Duration>,
    ) -> Result<CommandOutput> {
        self.history
            .lock_ignore_poison()
            .push((command.to_owned(), cwd.to_path_buf()));

        let run = self
            .runs
            .lock_ignore_poison()
            .pop_front()
            .ok_or_else(|| Error::Runner("No scripted output left".to_owned()))?;

        if let Some((path, json)) = run.report {
            if let Some(parent) = path.parent() {
                create_dir_all(parent)
                    .await
                    .map_err(|err| Error::io("create directory", parent, err))?;
            }
            write(&path, json)
                .await
                .map_err(|err| Error::io("write", &path, err))?;
        }

        run.output.map_err(Error::Runner)
    }
}
