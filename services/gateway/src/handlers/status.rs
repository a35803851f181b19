//! Configuration status
//!
//! A missing provider key never stops the server; this endpoint is where
//! operators find out what is missing and why uploads or chat fail.

use axum::{extract::State, response::Json};
use serde::Serialize;

use crate::AppState;
use sheetforge_utils::OpenAiProvider;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub openai_configured: bool,
    pub openai_provider: &'static str,
    pub anthropic_configured: bool,
    pub excel_processor_configured: bool,
    pub missing_keys: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub azure_config: Option<AzureConfigView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai_config: Option<OpenAiConfigView>,
}

/// Non-secret Azure settings echoed for troubleshooting.
#[derive(Debug, Serialize)]
pub struct AzureConfigView {
    pub endpoint: Option<String>,
    pub deployment: Option<String>,
    pub api_version: String,
}

#[derive(Debug, Serialize)]
pub struct OpenAiConfigView {
    pub api_base: String,
    pub model: String,
}

pub async fn api_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let config = &state.config;
    let openai_configured = config.openai_configured();
    let template_exists = config.storage.template_path.exists();

    let (azure_config, openai_config) = match config.openai.provider {
        OpenAiProvider::Azure => (
            Some(AzureConfigView {
                endpoint: config.azure.endpoint.clone(),
                deployment: config.azure.deployment.clone(),
                api_version: config.azure.api_version.clone(),
            }),
            None,
        ),
        OpenAiProvider::OpenAi => (
            None,
            Some(OpenAiConfigView {
                api_base: config.openai.api_base.clone(),
                model: config.openai.model.clone(),
            }),
        ),
    };

    Json(StatusResponse {
        openai_configured,
        openai_provider: config.openai.provider.as_str(),
        anthropic_configured: config.anthropic_configured(),
        excel_processor_configured: openai_configured && template_exists,
        missing_keys: config.missing_keys(),
        azure_config,
        openai_config,
    })
}
