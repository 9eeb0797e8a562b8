use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use cyport_core::config::{DEFAULT_API_URL, DEFAULT_MODEL, ENV_OPENAI_API_KEY};
use cyport_core::{Config, Context, Error, ModelProvider, Query, Response, Result, TokenUsage};

/// Provider for the `OpenAI` chat completions API and compatible endpoints.
pub struct OpenAiProvider {
    /// HTTP client for API requests.
    client: Client,
    /// API key sent as a bearer token.
    api_key: String,
    /// Model name to use.
    model: String,
    /// Chat completions endpoint.
    api_url: String,
}

impl OpenAiProvider {
    /// Creates a new `OpenAiProvider` with the given API key.
    ///
    /// # Errors
    /// Returns an error if the provided API key is empty.
    pub fn new(api_key: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::MissingApiKey(ENV_OPENAI_API_KEY.to_owned()));
        }

        Ok(Self {
            client: Client::default(),
            api_key,
            model: DEFAULT_MODEL.to_owned(),
            api_url: DEFAULT_API_URL.to_owned(),
        })
    }

    /// Creates a provider using the credential, model and endpoint from `config`.
    ///
    /// # Errors
    /// Returns an error if the configured API key is empty.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(config.api_key.clone())?
            .with_model(config.model.clone())
            .with_api_url(config.api_url.clone()))
    }

    /// Sets the model to use for generation.
    #[must_use]
    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    /// Sets the chat completions endpoint.
    #[must_use]
    pub fn with_api_url(mut self, api_url: String) -> Self {
        self.api_url = api_url;
        self
    }

    /// Builds the request body for a single-turn completion.
    fn build_request(&self, query: &Query, context: &Context) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_owned(),
                    content: context.system_prompt.clone(),
                },
                ChatMessage {
                    role: "user".to_owned(),
                    content: query.text.clone(),
                },
            ],
            max_tokens: context.max_tokens,
        }
    }
}

/// Request payload sent to the chat completions API.
#[derive(Debug, Serialize)]
struct ChatRequest {
    /// Model identifier.
    model: String,
    /// System instruction followed by the user prompt.
    messages: Vec<ChatMessage>,
    /// Maximum number of tokens allowed in the completion.
    max_tokens: u32,
}

/// Message delivered to the API.
#[derive(Debug, Serialize)]
struct ChatMessage {
    /// Role of the message author (`system` or `user`).
    role: String,
    /// Textual content of the message.
    content: String,
}

/// Response payload returned by the API.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    /// List of candidate completions.
    choices: Vec<ChatChoice>,
    /// Token accounting, when the service reports it.
    #[serde(default)]
    usage: Option<ChatUsage>,
}

/// A single completion choice.
#[derive(Debug, Deserialize)]
struct ChatChoice {
    /// Message generated for the choice.
    message: ChatResponseMessage,
}

/// Response message containing the generated text.
#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    /// Generated text content; absent for refusals or tool calls.
    #[serde(default)]
    content: Option<String>,
}

/// Token usage metrics for a response.
#[derive(Debug, Deserialize)]
struct ChatUsage {
    /// Number of tokens in the prompt.
    prompt_tokens: u64,
    /// Number of tokens produced in the completion.
    completion_tokens: u64,
}

#[async_trait]
impl ModelProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn generate(&self, query: &Query, context: &Context) -> Result<Response> {
        let start = Instant::now();
        let request = self.build_request(query, context);

        debug!(
            "POST {} (model {}, max_tokens {})",
            self.api_url, request.model, request.max_tokens
        );

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!(
                "API request failed with status {status}: {error_text}"
            )));
        }

        let api_response: ChatResponse = response
            .json()
            .await
            .map_err(|err| Error::InvalidResponse(format!("Failed to parse response: {err}")))?;

        let text = api_response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.unwrap_or_default())
            .ok_or_else(|| Error::InvalidResponse("No choices in response".to_owned()))?;

        let tokens_used = api_response
            .usage
            .map_or_else(TokenUsage::default, |usage| TokenUsage {
                input: usage.prompt_tokens,
                output: usage.completion_tokens,
            });

        Ok(Response {
            text,
            tokens_used,
            provider: format!("{}/{}", self.name(), self.model),
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}
