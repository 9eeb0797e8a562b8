use async_trait::async_trait;

use crate::{Context, Query, Response, Result};

/// Trait for chat-completion services that can turn a prompt into text.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Returns the unique identifier for this provider.
    fn name(&self) -> &'static str;

    /// Generates a response to the given query using the provided context.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be parsed.
    async fn generate(&self, query: &Query, context: &Context) -> Result<Response>;
}
