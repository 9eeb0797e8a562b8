//! Mock provider for testing conversion workflows.
//!
//! Replays canned completions or errors so the pipeline can be exercised end
//! to end without real API calls.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cyport_core::{Context, Error, IgnoreLock as _, ModelProvider, Query, Response, Result, TokenUsage};

/// Scripted reply: generated text or an error message.
type Reply = core::result::Result<String, String>;

/// Mock provider that returns pre-defined responses.
///
/// Queued replies are consumed first, in order. When the queue is empty the
/// first pattern contained in the query text wins, then the default response.
#[derive(Clone, Default)]
pub struct MockProvider {
    /// Replies consumed one per call
    queue: Arc<Mutex<VecDeque<Reply>>>,
    /// Replies keyed by a substring of the query text
    patterns: Arc<Mutex<Vec<(String, Reply)>>>,
    /// Reply when nothing else matches
    default_response: Arc<Mutex<Option<String>>>,
    /// Call history for verification
    call_history: Arc<Mutex<Vec<Query>>>,
}

impl MockProvider {
    /// Create an empty mock provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful completion.
    #[must_use]
    pub fn with_response(self, response: impl Into<String>) -> Self {
        self.queue
            .lock_ignore_poison()
            .push_back(Ok(response.into()));
        self
    }

    /// Queue a failed completion whose error displays as `message`.
    #[must_use]
    pub fn with_error(self, message: impl Into<String>) -> Self {
        self.queue
            .lock_ignore_poison()
            .push_back(Err(message.into()));
        self
    }

    /// Answer any query containing `pattern` with `response`.
    #[must_use]
    pub fn with_pattern_response(
        self,
        pattern: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        self.patterns
            .lock_ignore_poison()
            .push((pattern.into(), Ok(response.into())));
        self
    }

    /// Fail any query containing `pattern` with `message`.
    #[must_use]
    pub fn with_pattern_error(self, pattern: impl Into<String>, message: impl Into<String>) -> Self {
        self.patterns
            .lock_ignore_poison()
            .push((pattern.into(), Err(message.into())));
        self
    }

    /// Set a default response for queries that match nothing.
    #[must_use]
    pub fn with_default_response(self, response: impl Into<String>) -> Self {
        *self.default_response.lock_ignore_poison() = Some(response.into());
        self
    }

    /// Get the call history (every query received, in order).
    #[must_use]
    pub fn get_call_history(&self) -> Vec<Query> {
        self.call_history.lock_ignore_poison().clone()
    }

    /// Get the number of calls made.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.call_history.lock_ignore_poison().len()
    }

    fn next_reply(&self, query_text: &str) -> Reply {
        if let Some(reply) = self.queue.lock_ignore_poison().pop_front() {
            return reply;
        }

        let matched = self
            .patterns
            .lock_ignore_poison()
            .iter()
            .find(|(pattern, _)| query_text.contains(pattern.as_str()))
            .map(|(_, reply)| reply.clone());
        if let Some(reply) = matched {
            return reply;
        }

        self.default_response
            .lock_ignore_poison()
            .clone()
            .ok_or_else(|| "MockProvider has no response configured".to_owned())
    }
}

#[async_trait]
impl ModelProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn generate(&self, query: &Query, _context: &Context) -> Result<Response> {
        self.call_history.lock_ignore_poison().push(query.clone());

        let text = self.next_reply(&query.text).map_err(Error::Other)?;

        Ok(Response {
            tokens_used: TokenUsage {
                input: query.text.len() as u64,
                output: text.len() as u64,
            },
            text,
            provider: self.name().to_owned(),
            latency_ms: 0,
        })
    }
}
