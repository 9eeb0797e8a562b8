//! `cyport` binary: converts a Cypress suite into Playwright specs.

use anyhow::{Context as _, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _};

use cyport_converter::TestConverter;
use cyport_core::{Config, ConversionReport, LayoutMode};
use cyport_providers::OpenAiProvider;
use cyport_tooling::{FileHandler, ShellExecutor};

mod cli;

use clap::Parser as _;
use cli::Cli;

const DEFAULT_LOG_FILTER: &str =
    "cyport=info,cyport_converter=info,cyport_tooling=info,cyport_providers=info";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    info!("Loaded configuration: {config:?}");

    if cli.scaffold {
        FileHandler::scaffold_project(&config.project_dir).await?;
    }

    let provider = OpenAiProvider::from_config(&config)?;
    let converter = TestConverter::new(&config, provider, ShellExecutor)?;
    let report = converter.convert_tests().await?;

    log_summary(&report);

    if let Some(path) = &cli.report {
        let json = serde_json::to_string_pretty(&report)?;
        FileHandler::write(path, &json)
            .await
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        info!("Report written to {}", path.display());
    }

    Ok(())
}

/// Environment and optional TOML file, then command-line overrides.
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(runs) = cli.runs {
        config = config.with_stability_runs(runs)?;
    }
    if cli.preserve_layout {
        config = config.with_layout(LayoutMode::Preserve);
    }
    Ok(config)
}

fn log_summary(report: &ConversionReport) {
    info!("Conversion summary:");
    for result in report.results() {
        let file = result.original_file.display();
        if !result.success {
            warn!(
                "  {file}: failed ({})",
                result.error.as_deref().unwrap_or_default()
            );
            continue;
        }
        let destination = result
            .destination
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_default();
        if result.is_flaky() {
            warn!("  {file}: flaky, moved to {destination}");
        } else {
            info!("  {file}: stable at {destination}");
        }
    }
    info!(
        "{} file(s): {} stable, {} flaky, {} failed",
        report.len(),
        report.stable_count(),
        report.flaky_count(),
        report.failed_count()
    );
}
