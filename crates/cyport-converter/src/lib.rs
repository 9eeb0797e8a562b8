//! Cypress to Playwright conversion pipeline.
//!
//! `CompletionClient` turns source tests into Playwright specs and repairs
//! failing ones; `TestConverter` drives discovery, conversion, validation and
//! quarantine for every file.
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

/// Prompt construction and completion calls.
pub mod completion;
/// Per-file conversion state machine.
pub mod converter;

pub use completion::{CompletionClient, strip_code_fences};
pub use converter::TestConverter;
