use std::sync::Arc;
use tracing::warn;

use crate::ai::{AnthropicClient, ChatClient, OpenAiClient};
use crate::pipeline::WorkbookProcessor;
use sheetforge_utils::AppConfig;

/// Shared per-process state. Providers are optional: a missing key leaves the
/// corresponding client unset and the affected endpoints fail at request
/// time, while status keeps reporting what is missing.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub openai: Option<Arc<dyn ChatClient>>,
    pub anthropic: Option<Arc<dyn ChatClient>>,
    pub processor: Option<Arc<WorkbookProcessor>>,
}

impl AppState {
    pub fn from_config(config: AppConfig) -> Self {
        let openai: Option<Arc<dyn ChatClient>> =
            match OpenAiClient::from_config(&config.openai, &config.azure) {
                Ok(client) => Some(Arc::new(client)),
                Err(error) => {
                    warn!(%error, "OpenAI-family client unavailable");
                    None
                }
            };

        let anthropic: Option<Arc<dyn ChatClient>> =
            match AnthropicClient::from_config(&config.anthropic) {
                Ok(client) => Some(Arc::new(client)),
                Err(error) => {
                    warn!(%error, "Anthropic client unavailable");
                    None
                }
            };

        let processor = openai
            .clone()
            .map(|client| Arc::new(WorkbookProcessor::new(client, config.storage.clone())));

        Self {
            config: Arc::new(config),
            openai,
            anthropic,
            processor,
        }
    }
}
