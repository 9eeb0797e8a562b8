//! Per-file conversion pipeline: read, convert, write, validate, fix once, quarantine.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use cyport_core::{
    Config, ConversionReport, ConversionResult, Error, ModelProvider, Result, RunReport,
    TestRunOutcome,
};
use cyport_tooling::{CommandExecutor, FileHandler, TestRunner, is_stable};
use tracing::{error, info, warn};

use crate::completion::CompletionClient;

/// Converts every discovered Cypress test, one file at a time, in discovery order.
pub struct TestConverter<'cfg, P, E> {
    /// Run configuration
    config: &'cfg Config,
    /// Convert and fix requests
    client: CompletionClient<P>,
    /// Stability batches
    runner: TestRunner<E>,
}

/// A fix that was written to the primary destination, with its re-run batch.
struct AppliedFix {
    content: String,
    outcomes: Vec<TestRunOutcome>,
}

impl<'cfg, P: ModelProvider, E: CommandExecutor> TestConverter<'cfg, P, E> {
    /// Creates a converter using `provider` for completions and `executor` for test runs.
    ///
    /// # Errors
    /// Returns an error if the prompt templates cannot be loaded.
    pub fn new(config: &'cfg Config, provider: P, executor: E) -> Result<Self> {
        Ok(Self {
            config,
            client: CompletionClient::new(provider, config)?,
            runner: TestRunner::new(executor, config),
        })
    }

    /// Converts and validates every source test.
    ///
    /// Per-file failures are recorded in the report and never stop the run.
    ///
    /// # Errors
    /// Returns an error only if the source directory cannot be listed.
    pub async fn convert_tests(&self) -> Result<ConversionReport> {
        let sources = FileHandler::discover(&self.config.source_dir)?;
        info!(
            "Found {} Cypress test(s) in {}",
            sources.len(),
            self.config.source_dir.display()
        );

        let mut report = ConversionReport::default();
        let mut claims = HashMap::new();
        for source in sources {
            let result = match self.claim_outputs(&source, &mut claims) {
                Ok(()) => self.convert_file(&source).await,
                Err(err) => {
                    error!("Skipping {}: {err}", source.display());
                    ConversionResult::failed(source, err.to_string())
                }
            };
            log_result(&result);
            report.push(result);
        }

        Ok(report)
    }

    /// Reserves the primary and flaky paths of `source`.
    ///
    /// Fails without reserving anything when an earlier source already owns
    /// either path, so one file can never overwrite or delete another's output.
    fn claim_outputs(&self, source: &Path, claims: &mut HashMap<PathBuf, PathBuf>) -> Result<()> {
        let destination = FileHandler::destination_for(source, self.config);
        let flaky = FileHandler::flaky_path_for(&destination, self.config);

        for path in [&destination, &flaky] {
            if let Some(owner) = claims.get(path) {
                return Err(Error::DestinationConflict {
                    path: path.clone(),
                    owner: owner.clone(),
                });
            }
        }

        claims.insert(destination, source.to_path_buf());
        claims.insert(flaky, source.to_path_buf());
        Ok(())
    }

    /// Runs the whole state machine for one file, turning any error into a failed result.
    pub async fn convert_file(&self, source: &Path) -> ConversionResult {
        info!("Converting {}", source.display());
        match self.try_convert_file(source).await {
            Ok(result) => result,
            Err(err) => {
                error!("Failed to process {}: {err}", source.display());
                ConversionResult::failed(source.to_path_buf(), err.to_string())
            }
        }
    }

    async fn try_convert_file(&self, source: &Path) -> Result<ConversionResult> {
        let source_test = FileHandler::read_source(source).await?;

        let completion = self.client.convert(&source_test.content).await;
        if !completion.success {
            return Ok(ConversionResult::failed(
                source_test.path,
                completion.error.unwrap_or_default(),
            ));
        }
        let converted = completion.content;

        let destination = FileHandler::destination_for(source, self.config);
        FileHandler::write(&destination, &converted).await?;
        info!("Wrote {}", destination.display());

        let outcomes = self.runner.run(&destination).await;
        if is_stable(&outcomes) {
            return Ok(ConversionResult::validated(
                source_test.path,
                converted,
                true,
                outcomes,
                destination,
            ));
        }

        warn!(
            "{} is unstable ({}/{} runs failed), attempting one fix",
            destination.display(),
            outcomes.iter().filter(|outcome| !outcome.success).count(),
            outcomes.len()
        );

        let last_outcomes = match self.attempt_fix(&destination, &converted, &outcomes).await? {
            Some(fix) if is_stable(&fix.outcomes) => {
                info!("Fix made {} stable", destination.display());
                return Ok(ConversionResult::validated(
                    source_test.path,
                    fix.content,
                    true,
                    fix.outcomes,
                    destination,
                ));
            }
            Some(fix) => fix.outcomes,
            None => outcomes,
        };

        let flaky = self.quarantine(&destination, &converted).await?;
        warn!("Quarantined flaky test at {}", flaky.display());
        Ok(ConversionResult::validated(
            source_test.path,
            converted,
            false,
            last_outcomes,
            flaky,
        ))
    }

    /// Requests and applies a single fix, then re-runs one stability batch.
    ///
    /// Returns `None` when no failure could be extracted from the run reports
    /// or the fix request failed; the primary file is left untouched then.
    async fn attempt_fix(
        &self,
        destination: &Path,
        converted: &str,
        outcomes: &[TestRunOutcome],
    ) -> Result<Option<AppliedFix>> {
        let failure = outcomes
            .iter()
            .rev()
            .find_map(|outcome| outcome.report.as_ref())
            .and_then(RunReport::first_failure);
        let Some(failure) = failure else {
            warn!("No failing test found in the run report, skipping fix");
            return Ok(None);
        };

        let fix = self.client.fix(converted, &failure).await;
        if !fix.success {
            warn!(
                "Fix request failed: {}",
                fix.error.as_deref().unwrap_or_default()
            );
            return Ok(None);
        }

        FileHandler::write(destination, &fix.content).await?;
        let retry = self.runner.run(destination).await;
        Ok(Some(AppliedFix {
            content: fix.content,
            outcomes: retry,
        }))
    }

    /// Moves the original conversion into the flaky folder.
    ///
    /// The flaky copy is written before the primary file is removed, so the
    /// test is always present in exactly one of the two places.
    async fn quarantine(&self, destination: &Path, converted: &str) -> Result<PathBuf> {
        let flaky = FileHandler::flaky_path_for(destination, self.config);
        FileHandler::write(&flaky, converted).await?;

        if let Err(err) = FileHandler::delete(destination).await {
            if let Err(cleanup) = FileHandler::delete(&flaky).await {
                warn!("Could not roll back flaky copy: {cleanup}");
            }
            return Err(err);
        }

        Ok(flaky)
    }
}

fn log_result(result: &ConversionResult) {
    let file = result.original_file.display();
    match (result.success, result.is_stable) {
        (false, _) => warn!(
            "{file}: failed: {}",
            result.error.as_deref().unwrap_or_default()
        ),
        (true, Some(true)) => info!("{file}: converted and stable"),
        (true, Some(false)) => warn!("{file}: converted but flaky"),
        (true, None) => info!("{file}: converted"),
    }
}
