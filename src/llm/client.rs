//! Completion client
//!
//! `CompletionClient` is the seam the orchestrator talks to; `GeminiClient`
//! performs the actual HTTP POST.

use crate::llm::config::ApiConfig;
use crate::llm::types::{ErrorEnvelope, GenerateContentRequest, GenerateContentResponse};
use crate::{Result, SahayakError};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error, info};

/// Sends one composed prompt and returns the generated text
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// HTTP client for the generate-content endpoint.
///
/// No request timeout is applied; a turn waits until the service answers.
pub struct GeminiClient {
    config: ApiConfig,
    http_client: Client,
}

impl GeminiClient {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let http_client = Client::builder()
            .build()
            .map_err(|e| SahayakError::ConfigError(format!("HTTP client: {}", e)))?;
        Ok(Self::with_http_client(config, http_client))
    }

    pub fn with_http_client(config: ApiConfig, http_client: Client) -> Self {
        Self {
            config,
            http_client,
        }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }
}

#[async_trait]
impl CompletionClient for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let key = self.config.key().ok_or(SahayakError::MissingApiKey)?;
        let request = GenerateContentRequest::new(prompt, self.config.generation.clone());

        info!("Sending completion request to {}", self.config.api_url);

        let response = self
            .http_client
            .post(&self.config.api_url)
            .query(&[("key", key)])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        debug!("Completion response status: {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .ok()
                .and_then(|envelope| envelope.error)
                .and_then(|error| error.message);
            error!("Completion API error {}: {:?}", status, message);
            return Err(SahayakError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        let parsed: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|e| SahayakError::InvalidResponse(e.to_string()))?;

        match parsed.first_text() {
            Some(text) => {
                debug!("Completion received: {} chars", text.len());
                Ok(text.to_string())
            }
            None => {
                error!("Unexpected completion response format: {}", body);
                Err(SahayakError::InvalidResponse(
                    "no text at candidates[0].content.parts[0]".to_string(),
                ))
            }
        }
    }
}
