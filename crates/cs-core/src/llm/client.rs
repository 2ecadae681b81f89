//! LLM API HTTP Client
//!
//! Supports both Claude API and OpenAI-compatible APIs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::config::{LlmConfig, LlmProvider};
use crate::error::{Error, Result};

use super::types::*;

/// A chat model that can answer a messages request.
///
/// Agents only talk to models through this trait so tests can substitute
/// a scripted implementation.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Send one request and wait for the full response
    async fn messages(&self, request: MessagesRequest) -> Result<MessagesResponse>;

    /// Model identifier placed into requests
    fn model(&self) -> &str;

    /// Create a messages request builder for this model
    fn request_builder(&self) -> MessagesRequestBuilder {
        MessagesRequestBuilder::new(self.model())
    }
}

/// LLM API client (supports Claude and OpenAI-compatible APIs)
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    provider: LlmProvider,
    max_tokens: u64,
    timeout_secs: u64,
}

impl LlmClient {
    /// Create a new LLM client
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(Error::Http)?;

        let base_url = match &config.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => match config.provider {
                LlmProvider::Claude => "https://api.anthropic.com/v1".to_string(),
                LlmProvider::OpenAi => "https://api.openai.com/v1".to_string(),
            },
        };

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url,
            provider: config.provider.clone(),
            max_tokens: config.max_tokens,
            timeout_secs: config.timeout_secs,
        })
    }

    /// Create with custom base URL (for testing or custom endpoints)
    pub fn with_base_url(config: &LlmConfig, base_url: impl Into<String>) -> Result<Self> {
        let mut client = Self::new(config)?;
        client.base_url = base_url.into();
        Ok(client)
    }

    /// Get the provider type
    pub fn provider(&self) -> &LlmProvider {
        &self.provider
    }

    fn map_send_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout(self.timeout_secs)
        } else {
            Error::Http(err)
        }
    }

    /// Send request to Claude API
    async fn send_claude_request(&self, request: MessagesRequest) -> Result<MessagesResponse> {
        let url = format!("{}/messages", self.base_url);

        debug!(url = %url, "Sending request to Claude API");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(Error::Http)?;

        if !status.is_success() {
            warn!(%status, "Claude API error: {}", body);
            return Err(Error::LlmApi(format!("{}: {}", status, body)));
        }

        let parsed: MessagesResponse = serde_json::from_str(&body)
            .map_err(|e| Error::LlmApi(format!("Failed to parse response: {} - {}", e, body)))?;

        info!(
            stop_reason = %parsed.stop_reason,
            output_tokens = parsed.usage.as_ref().map(|u| u.output_tokens).unwrap_or(0),
            "Claude API response"
        );

        Ok(parsed)
    }

    /// Send request to OpenAI-compatible API
    async fn send_openai_request(&self, request: MessagesRequest) -> Result<MessagesResponse> {
        let url = format!("{}/chat/completions", self.base_url);

        debug!(url = %url, "Sending request to OpenAI-compatible API");

        let openai_request = ChatCompletionRequest::from_claude_request(&request);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&openai_request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(Error::Http)?;

        if !status.is_success() {
            warn!(%status, "OpenAI API error: {}", body);
            return Err(Error::LlmApi(format!("{}: {}", status, body)));
        }

        let openai_response: ChatCompletionResponse = serde_json::from_str(&body)
            .map_err(|e| Error::LlmApi(format!("Failed to parse response: {} - {}", e, body)))?;

        let parsed = openai_response.to_claude_response();

        info!(
            stop_reason = %parsed.stop_reason,
            output_tokens = parsed.usage.as_ref().map(|u| u.output_tokens).unwrap_or(0),
            "OpenAI API response"
        );

        Ok(parsed)
    }
}

#[async_trait]
impl LanguageModel for LlmClient {
    async fn messages(&self, request: MessagesRequest) -> Result<MessagesResponse> {
        match self.provider {
            LlmProvider::Claude => self.send_claude_request(request).await,
            LlmProvider::OpenAi => self.send_openai_request(request).await,
        }
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn request_builder(&self) -> MessagesRequestBuilder {
        MessagesRequestBuilder::new(self.model.clone()).max_tokens(self.max_tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_base_urls() {
        let mut config = LlmConfig::default();
        let client = LlmClient::new(&config).unwrap();
        assert_eq!(client.base_url, "https://api.anthropic.com/v1");

        config.provider = LlmProvider::OpenAi;
        config.base_url = Some("http://localhost:8080/v1/".to_string());
        let client = LlmClient::new(&config).unwrap();
        assert_eq!(client.base_url, "http://localhost:8080/v1");
        assert_eq!(client.provider(), &LlmProvider::OpenAi);
    }

    #[test]
    fn test_request_builder_uses_configured_limits() {
        let config = LlmConfig {
            max_tokens: 1024,
            ..LlmConfig::default()
        };
        let client = LlmClient::new(&config).unwrap();
        let request = client.request_builder().user("hello").build();
        assert_eq!(request.max_tokens, 1024);
        assert_eq!(request.model, config.model);
    }
}
