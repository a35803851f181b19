//! OpenAI-family client
//!
//! Covers both the direct OpenAI API and Azure-hosted deployments. The two
//! differ only in URL shape and whether the body names a model; the response
//! envelope is identical.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::{truncate_body, ChatClient};
use sheetforge_models::{ChatMessage, ChatOptions};
use sheetforge_utils::{AppError, AppResult, AzureSettings, OpenAiProvider, OpenAiSettings};

const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_MAX_TOKENS: u32 = 1000;
const ERROR_BODY_LIMIT: usize = 500;

pub struct OpenAiClient {
    client: Client,
    transport: Transport,
    model: String,
}

enum Transport {
    Direct {
        api_base: String,
        api_key: String,
    },
    Azure {
        endpoint: String,
        deployment: String,
        api_version: String,
        api_key: String,
    },
}

impl OpenAiClient {
    /// Build a client for the active provider. Fails with a configuration
    /// error when required keys are absent, so callers can defer the failure
    /// to request time.
    pub fn from_config(openai: &OpenAiSettings, azure: &AzureSettings) -> AppResult<Self> {
        let transport = match openai.provider {
            OpenAiProvider::OpenAi => Transport::Direct {
                api_base: openai.api_base.trim_end_matches('/').to_string(),
                api_key: openai
                    .api_key
                    .clone()
                    .ok_or_else(|| AppError::configuration("OpenAI API key not configured"))?,
            },
            OpenAiProvider::Azure => Transport::Azure {
                endpoint: azure
                    .endpoint
                    .clone()
                    .map(|e| e.trim_end_matches('/').to_string())
                    .ok_or_else(|| {
                        AppError::configuration("Azure OpenAI endpoint not configured")
                    })?,
                deployment: azure.deployment.clone().ok_or_else(|| {
                    AppError::configuration("Azure OpenAI deployment not configured")
                })?,
                api_version: azure.api_version.clone(),
                api_key: azure.api_key.clone().ok_or_else(|| {
                    AppError::configuration("Azure OpenAI API key not configured")
                })?,
            },
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(openai.timeout_seconds))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            transport,
            model: openai.model.clone(),
        })
    }

    fn completion_url(&self) -> String {
        match &self.transport {
            Transport::Direct { api_base, .. } => format!("{}/chat/completions", api_base),
            Transport::Azure {
                endpoint,
                deployment,
                api_version,
                ..
            } => format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                endpoint, deployment, api_version
            ),
        }
    }

    fn api_key(&self) -> &str {
        match &self.transport {
            Transport::Direct { api_key, .. } => api_key,
            Transport::Azure { api_key, .. } => api_key,
        }
    }
}

#[async_trait]
impl ChatClient for OpenAiClient {
    async fn complete_chat(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> AppResult<String> {
        let request = CompletionRequest {
            // Azure routes by deployment; the body carries no model there.
            model: match self.transport {
                Transport::Direct { .. } => Some(self.model.clone()),
                Transport::Azure { .. } => None,
            },
            messages,
            temperature: options.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        };

        debug!(
            provider = self.provider_name(),
            message_count = messages.len(),
            "sending chat completion request"
        );

        let response = self
            .client
            .post(self.completion_url())
            .header("Authorization", format!("Bearer {}", self.api_key()))
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::upstream(self.provider_name(), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::upstream(
                self.provider_name(),
                format!(
                    "status {}: {}",
                    status.as_u16(),
                    truncate_body(&body, ERROR_BODY_LIMIT)
                ),
            ));
        }

        let completion: CompletionResponse = response.json().await.map_err(|e| {
            AppError::processing(format!("Failed to parse completion response: {}", e))
        })?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AppError::processing("Completion response contained no choices"))?;

        if choice.finish_reason.as_deref() == Some("length") {
            warn!(
                provider = self.provider_name(),
                "completion was truncated at the token limit"
            );
        }

        choice
            .message
            .content
            .filter(|content| !content.is_empty())
            .ok_or_else(|| AppError::processing("Completion response contained no content"))
    }

    fn provider_name(&self) -> &'static str {
        match self.transport {
            Transport::Direct { .. } => "openai",
            Transport::Azure { .. } => "azure",
        }
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}
