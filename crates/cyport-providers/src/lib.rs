//! Provider adapters for chat-completion services.
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

/// Scripted provider for tests.
pub mod mock;
/// `OpenAI`-compatible chat completions provider.
pub mod openai;

pub use mock::MockProvider;
pub use openai::OpenAiProvider;
