//! Provider clients
//!
//! One chat-completion contract, two transports. Handlers and the workbook
//! pipeline depend only on [`ChatClient`], so tests can swap in stubs and the
//! active provider is purely a configuration concern.

pub mod anthropic;
pub mod openai;

pub use anthropic::AnthropicClient;
pub use openai::OpenAiClient;

use async_trait::async_trait;
use sheetforge_models::{ChatMessage, ChatOptions};
use sheetforge_utils::AppResult;

/// A hosted chat-completion provider, reduced to its useful surface: send an
/// ordered message list, get the assistant's text back.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn complete_chat(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> AppResult<String>;

    fn provider_name(&self) -> &'static str;
}

/// Upstream error bodies get relayed to the client; keep them readable.
pub(crate) fn truncate_body(body: &str, max_len: usize) -> &str {
    match body.char_indices().nth(max_len) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
