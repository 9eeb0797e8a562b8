use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cyport")]
#[command(about = "Convert Cypress tests to Playwright and quarantine flaky results", long_about = None)]
pub struct Cli {
    #[arg(short, long, help = "TOML file with settings not present in the environment")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Write playwright.config.ts, fixtures and package.json first")]
    pub scaffold: bool,

    #[arg(long, help = "Mirror the source directory layout under the destination")]
    pub preserve_layout: bool,

    #[arg(long, help = "Executions per stability check (overrides config)")]
    pub runs: Option<usize>,

    #[arg(long, help = "Write the conversion report as JSON to this file")]
    pub report: Option<PathBuf>,
}
