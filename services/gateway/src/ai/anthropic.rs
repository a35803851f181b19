//! Anthropic client
//!
//! The Messages API takes the system prompt as a top-level field rather than
//! a message role, and returns content as a list of typed blocks; both quirks
//! are absorbed here so callers see the shared contract.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{truncate_body, ChatClient};
use sheetforge_models::{ChatMessage, ChatOptions};
use sheetforge_utils::{AnthropicSettings, AppError, AppResult};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 1000;
const ERROR_BODY_LIMIT: usize = 500;

pub struct AnthropicClient {
    client: Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl AnthropicClient {
    pub fn from_config(settings: &AnthropicSettings) -> AppResult<Self> {
        let api_key = settings
            .api_key
            .clone()
            .ok_or_else(|| AppError::configuration("Anthropic API key not configured"))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            api_key,
            model: settings.model.clone(),
        })
    }
}

#[async_trait]
impl ChatClient for AnthropicClient {
    async fn complete_chat(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> AppResult<String> {
        // System turns move out of the message array into the top-level field.
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.is_system())
            .map(|m| m.content.as_str())
            .collect();
        let conversation: Vec<&ChatMessage> =
            messages.iter().filter(|m| !m.is_system()).collect();

        let request = MessagesRequest {
            model: options.model.as_deref().unwrap_or(&self.model),
            max_tokens: options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            messages: &conversation,
            system: if system.is_empty() {
                None
            } else {
                Some(system.join("\n"))
            },
        };

        debug!(
            provider = self.provider_name(),
            message_count = conversation.len(),
            "sending messages request"
        );

        let response = self
            .client
            .post(format!("{}/messages", self.api_base))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
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

        let reply: MessagesResponse = response.json().await.map_err(|e| {
            AppError::processing(format!("Failed to parse messages response: {}", e))
        })?;

        let text: String = reply
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            return Err(AppError::processing(
                "Messages response contained no text content",
            ));
        }
        Ok(text)
    }

    fn provider_name(&self) -> &'static str {
        "anthropic"
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: &'a [&'a ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}
