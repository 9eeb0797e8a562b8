use core::time::Duration;
use std::path::Path;

use async_trait::async_trait;
use cyport_core::{Error, Result};
use tokio::process::Command;
use tokio::time;
use tracing::{debug, warn};

/// Captured result of a finished shell command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Standard output, lossily decoded.
    pub stdout: String,
    /// Standard error, lossily decoded.
    pub stderr: String,
    /// Exit code, `-1` when terminated by a signal.
    pub exit_code: i32,
}

impl CommandOutput {
    /// Whether the command exited with status zero.
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs shell commands on behalf of the test runner.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Runs `command` with `cwd` as working directory and waits for it to exit.
    ///
    /// # Errors
    /// Returns [`Error::Runner`] if the command cannot be spawned or exceeds `timeout`.
    async fn execute(
        &self,
        command: &str,
        cwd: &Path,
        timeout: Option<Duration>,
    ) -> Result<CommandOutput>;
}

/// Executes commands through `bash -c`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellExecutor;

#[async_trait]
impl CommandExecutor for ShellExecutor {
    async fn execute(
        &self,
        command: &str,
        cwd: &Path,
        timeout: Option<Duration>,
    ) -> Result<CommandOutput> {
        debug!("Executing shell command in {}: {}", cwd.display(), command);

        let mut process = Command::new("bash");
        process.arg("-c").arg(command).current_dir(cwd).kill_on_drop(true);

        let output = match timeout {
            Some(limit) => {
                if let Ok(result) = time::timeout(limit, process.output()).await {
                    result
                } else {
                    warn!("Command timed out after {} seconds", limit.as_secs());
                    return Err(Error::Runner(format!(
                        "Command timed out after {} seconds",
                        limit.as_secs()
                    )));
                }
            }
            None => process.output().await,
        }
        .map_err(|err| Error::Runner(format!("Command execution failed: {err}")))?;

        let exit_code = output.status.code().unwrap_or(-1);
        debug!("Command completed with exit code {exit_code}: {command}");

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code,
        })
    }
}
