//! Core types and traits for cyport.
//!
//! This crate provides the data model, error handling, configuration loading
//! and prompt templates shared by every other cyport crate.
#![cfg_attr(
    test,
    allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        reason = "Allow for tests"
    )
)]

/// Configuration loaded from the environment and optional TOML file.
pub mod config;
/// Error types and result definitions.
pub mod error;
/// Prompt templates embedded at compile time.
pub mod prompts;
/// Structured run report produced by the test runner.
pub mod report;
/// Lock helpers shared by the scripted test doubles.
pub mod sync;
/// Trait definitions for model providers.
pub mod traits;
/// Core data types for completions, test runs and conversion results.
pub mod types;

pub use config::{Config, LayoutMode};
pub use error::{Error, Result};
pub use report::RunReport;
pub use sync::IgnoreLock;
pub use traits::ModelProvider;
pub use types::{
    CompletionResult, Context, ConversionReport, ConversionResult, FailureDetails, Query,
    Response, SourceTest, TestRunOutcome, TokenUsage,
};
