//! Filesystem and test-runner tooling for cyport.
//!
//! `FileHandler` covers discovery, reads, writes, deletes and project
//! scaffolding. `TestRunner` executes a converted test repeatedly through a
//! `CommandExecutor` and classifies each run.
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

/// Shell command execution.
pub mod executor;
/// File access and project scaffolding.
pub mod files;
/// Scripted command executor for tests.
pub mod mock;
/// Repeated test execution and stability checks.
pub mod runner;

pub use executor::{CommandExecutor, CommandOutput, ShellExecutor};
pub use files::FileHandler;
pub use mock::ScriptedExecutor;
pub use runner::{TestRunner, is_stable};
