use cyport_core::prompts::{PromptTemplate, load_prompt};
use cyport_core::{CompletionResult, Config, Context, FailureDetails, ModelProvider, Query, Result};
use tracing::{debug, info, warn};

/// Builds convert and fix prompts and sends them to a [`ModelProvider`].
///
/// Neither call returns an error: provider failures are reported through
/// [`CompletionResult::failed`].
pub struct CompletionClient<P> {
    /// Completion service
    provider: P,
    /// Output token ceiling sent with every request
    max_tokens: u32,
    /// Cypress to Playwright template
    convert_prompt: PromptTemplate,
    /// Failing-test repair template
    fix_prompt: PromptTemplate,
}

impl<P: ModelProvider> CompletionClient<P> {
    /// Creates a client for `provider` using the token ceiling from `config`.
    ///
    /// # Errors
    /// Returns an error if an embedded prompt cannot be loaded.
    pub fn new(provider: P, config: &Config) -> Result<Self> {
        Ok(Self {
            provider,
            max_tokens: config.max_tokens,
            convert_prompt: load_prompt("convert_test")?,
            fix_prompt: load_prompt("fix_test")?,
        })
    }

    /// Converts a Cypress test into a Playwright spec.
    pub async fn convert(&self, source: &str) -> CompletionResult {
        info!("Sending conversion request to {}", self.provider.name());
        let query = Query::new(self.convert_prompt.render(&[("test", source)]));
        let result = self.complete(&self.convert_prompt, &query).await;
        if result.success {
            info!("Received converted test");
        }
        result
    }

    /// Asks for a corrected version of a failing Playwright spec.
    pub async fn fix(&self, test: &str, failure: &FailureDetails) -> CompletionResult {
        info!("Sending test fix request to {}", self.provider.name());
        let line = failure.line.to_string();
        let column = failure.column.to_string();
        let query = Query::new(self.fix_prompt.render(&[
            ("test", test),
            ("message", failure.message.as_str()),
            ("line", line.as_str()),
            ("column", column.as_str()),
        ]));
        let result = self.complete(&self.fix_prompt, &query).await;
        if result.success {
            info!("Received fix suggestion");
        }
        result
    }

    async fn complete(&self, prompt: &PromptTemplate, query: &Query) -> CompletionResult {
        let context = Context::new(prompt.system.clone(), self.max_tokens);
        match self.provider.generate(query, &context).await {
            Ok(response) => {
                debug!(
                    "{} answered in {}ms using {} tokens",
                    response.provider,
                    response.latency_ms,
                    response.tokens_used.total()
                );
                CompletionResult::ok(strip_code_fences(&response.text))
            }
            Err(err) => {
                warn!("Error communicating with {}: {err}", self.provider.name());
                CompletionResult::failed(err.to_string())
            }
        }
    }
}

/// Removes a surrounding markdown code fence, if the model added one anyway.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    let Some(after_open) = trimmed.strip_prefix("```") else {
        return text.to_owned();
    };
    let Some(body) = after_open.strip_suffix("```") else {
        return text.to_owned();
    };
    // Drop the language tag on the opening fence line.
    let body = body.split_once('\n').map_or("", |(_, rest)| rest);
    let mut stripped = body.trim_end().to_owned();
    stripped.push('\n');
    stripped
}

#[cfg(test)]
mod tests {
    use super::*;
    use cyport_providers::MockProvider;

    fn client(provider: MockProvider) -> CompletionClient<MockProvider> {
        let config = Config::new("cypress", "tests", "project", "sk-test");
        CompletionClient::new(provider, &config).expect("prompts load")
    }

    #[tokio::test]
    async fn test_convert_embeds_source() {
        let provider = MockProvider::new().with_response("test('x', async () => {});");
        let client = client(provider.clone());

        let result = client.convert("cy.visit('/home')").await;

        assert!(result.success);
        assert_eq!(result.content, "test('x', async () => {});");
        let history = provider.get_call_history();
        assert_eq!(history.len(), 1);
        assert!(history[0].text.contains("cy.visit('/home')"));
        assert!(!history[0].text.contains("{{test}}"));
    }

    #[tokio::test]
    async fn test_convert_failure_is_reported_not_raised() {
        let client = client(MockProvider::new().with_error("rate limited"));

        let result = client.convert("cy.visit('/')").await;

        assert!(!result.success);
        assert!(result.content.is_empty());
        assert_eq!(result.error.as_deref(), Some("rate limited"));
    }

    #[tokio::test]
    async fn test_fix_embeds_failure_details() {
        let provider = MockProvider::new().with_response("fixed");
        let client = client(provider.clone());
        let failure = FailureDetails {
            message: "expect(locator).toBeVisible() failed".to_owned(),
            line: 14,
            column: 7,
        };

        let result = client.fix("broken body", &failure).await;

        assert_eq!(result, CompletionResult::ok("fixed"));
        let history = provider.get_call_history();
        let prompt = &history[0].text;
        assert!(prompt.contains("broken body"));
        assert!(prompt.contains("expect(locator).toBeVisible() failed"));
        assert!(prompt.contains("Line: 14"));
        assert!(prompt.contains("Column: 7"));
    }

    #[tokio::test]
    async fn test_fix_sends_template_literals_verbatim() {
        let provider = MockProvider::new().with_response("fixed");
        let client = client(provider.clone());
        let body = "const tpl = `{{line}}:{{message}}`;";
        let failure = FailureDetails {
            message: "boom".to_owned(),
            line: 4,
            column: 1,
        };

        client.fix(body, &failure).await;

        let history = provider.get_call_history();
        let prompt = &history[0].text;
        assert!(prompt.contains(body), "test body was altered: {prompt}");
        assert!(!prompt.contains("`4:boom`"));
        assert!(prompt.contains("Line: 4"));
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(
            strip_code_fences("```typescript\nimport x;\ntest();\n```"),
            "import x;\ntest();\n"
        );
        assert_eq!(strip_code_fences("```\ncode\n```\n"), "code\n");
        assert_eq!(strip_code_fences("plain code"), "plain code");
        assert_eq!(strip_code_fences("```unterminated"), "```unterminated");
    }
}
