//! Chat proxy handlers
//!
//! Thin pass-throughs to the provider clients. Both endpoints share the
//! normalized response shape; raw provider envelopes never reach callers.

use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};

use crate::error::{ApiResult, BodyJson};
use crate::AppState;
use sheetforge_models::{ChatMessage, ChatOptions};
use sheetforge_utils::AppError;

#[derive(Debug, Deserialize)]
pub struct OpenAiChatRequest {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct AnthropicChatRequest {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub content: String,
}

/// POST /api/openai/chat
pub async fn openai_chat(
    State(state): State<AppState>,
    BodyJson(request): BodyJson<OpenAiChatRequest>,
) -> ApiResult<Json<ChatResponse>> {
    if request.messages.is_empty() {
        return Err(AppError::validation("Messages are required").into());
    }

    let client = state
        .openai
        .as_ref()
        .ok_or_else(|| AppError::configuration("OpenAI API key not configured"))?;

    let options = ChatOptions {
        temperature: request.temperature,
        max_tokens: request.max_tokens,
        model: None,
    };
    let content = client.complete_chat(&request.messages, &options).await?;
    Ok(Json(ChatResponse { content }))
}

/// POST /api/anthropic/chat
pub async fn anthropic_chat(
    State(state): State<AppState>,
    BodyJson(request): BodyJson<AnthropicChatRequest>,
) -> ApiResult<Json<ChatResponse>> {
    if request.messages.is_empty() {
        return Err(AppError::validation("Messages are required").into());
    }

    let client = state
        .anthropic
        .as_ref()
        .ok_or_else(|| AppError::configuration("Anthropic API key not configured"))?;

    let options = ChatOptions {
        temperature: None,
        max_tokens: request.max_tokens,
        model: request.model,
    };
    let content = client.complete_chat(&request.messages, &options).await?;
    Ok(Json(ChatResponse { content }))
}
