use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub openai: OpenAiSettings,
    pub azure: AzureSettings,
    pub anthropic: AnthropicSettings,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Which OpenAI-compatible transport the service talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpenAiProvider {
    OpenAi,
    Azure,
}

impl OpenAiProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Azure => "azure",
        }
    }

    /// Anything other than `azure` selects the plain OpenAI transport.
    pub fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("azure") {
            Self::Azure
        } else {
            Self::OpenAi
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiSettings {
    pub provider: OpenAiProvider,
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AzureSettings {
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    pub deployment: Option<String>,
    pub api_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnthropicSettings {
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub upload_dir: PathBuf,
    pub output_dir: PathBuf,
    pub template_path: PathBuf,
    pub max_upload_bytes: usize,
    pub allowed_extensions: Vec<String>,
}

impl StorageConfig {
    pub fn max_upload_megabytes(&self) -> usize {
        self.max_upload_bytes / (1024 * 1024)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub file_path: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let config = Config::builder()
            // Start with default values
            .add_source(File::with_name("config/default").required(false))
            // Add environment-specific config
            .add_source(
                File::with_name(&format!(
                    "config/{}",
                    env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into())
                ))
                .required(false),
            )
            // Add local config (gitignored)
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables with SHEETFORGE prefix
            .add_source(Environment::with_prefix("SHEETFORGE").separator("__"));

        let mut app_config: AppConfig = config.build()?.try_deserialize()?;
        app_config.apply_provider_env();
        app_config.normalize();
        Ok(app_config)
    }

    /// Conventional provider variables (OPENAI_API_KEY and friends) win over
    /// file and prefixed-env sources when they are set.
    fn apply_provider_env(&mut self) {
        if let Some(value) = env_nonempty("OPENAI_PROVIDER") {
            self.openai.provider = OpenAiProvider::from_name(&value);
        }
        if let Some(value) = env_nonempty("OPENAI_API_KEY") {
            self.openai.api_key = Some(value);
        }
        if let Some(value) = env_nonempty("OPENAI_API_BASE") {
            self.openai.api_base = value;
        }
        if let Some(value) = env_nonempty("OPENAI_MODEL") {
            self.openai.model = value;
        }
        if let Some(value) = env_nonempty("AZURE_OPENAI_API_KEY") {
            self.azure.api_key = Some(value);
        }
        if let Some(value) = env_nonempty("AZURE_OPENAI_ENDPOINT") {
            self.azure.endpoint = Some(value);
        }
        if let Some(value) = env_nonempty("AZURE_OPENAI_DEPLOYMENT") {
            self.azure.deployment = Some(value);
        }
        if let Some(value) = env_nonempty("AZURE_OPENAI_API_VERSION") {
            self.azure.api_version = value;
        }
        if let Some(value) = env_nonempty("ANTHROPIC_API_KEY") {
            self.anthropic.api_key = Some(value);
        }
    }

    /// Blank credential strings behave exactly like absent ones.
    fn normalize(&mut self) {
        clean_secret(&mut self.openai.api_key);
        clean_secret(&mut self.azure.api_key);
        clean_secret(&mut self.azure.endpoint);
        clean_secret(&mut self.azure.deployment);
        clean_secret(&mut self.anthropic.api_key);
    }

    /// Required-but-absent provider variables for the active OpenAI-family
    /// provider, by their conventional names.
    pub fn missing_keys(&self) -> Vec<String> {
        let mut missing = Vec::new();
        match self.openai.provider {
            OpenAiProvider::Azure => {
                if self.azure.api_key.is_none() {
                    missing.push("AZURE_OPENAI_API_KEY".to_string());
                }
                if self.azure.endpoint.is_none() {
                    missing.push("AZURE_OPENAI_ENDPOINT".to_string());
                }
                if self.azure.deployment.is_none() {
                    missing.push("AZURE_OPENAI_DEPLOYMENT".to_string());
                }
            }
            OpenAiProvider::OpenAi => {
                if self.openai.api_key.is_none() {
                    missing.push("OPENAI_API_KEY".to_string());
                }
            }
        }
        missing
    }

    pub fn openai_configured(&self) -> bool {
        self.missing_keys().is_empty()
    }

    pub fn anthropic_configured(&self) -> bool {
        self.anthropic.api_key.is_some()
    }
}

fn env_nonempty(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn clean_secret(value: &mut Option<String>) {
    if let Some(inner) = value {
        let trimmed = inner.trim();
        if trimmed.is_empty() {
            *value = None;
        } else if trimmed.len() != inner.len() {
            *value = Some(trimmed.to_string());
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            openai: OpenAiSettings::default(),
            azure: AzureSettings::default(),
            anthropic: AnthropicSettings::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5001,
        }
    }
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            provider: OpenAiProvider::OpenAi,
            api_key: None,
            api_base: "https://api.openai.com/v1".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            timeout_seconds: 120,
        }
    }
}

impl Default for AzureSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: None,
            deployment: None,
            api_version: "2024-02-15-preview".to_string(),
        }
    }
}

impl Default for AnthropicSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: "https://api.anthropic.com/v1".to_string(),
            model: "claude-3-sonnet-20240229".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            output_dir: PathBuf::from("outputs"),
            template_path: PathBuf::from("templates/template.xlsx"),
            max_upload_bytes: 16 * 1024 * 1024, // 16MB
            allowed_extensions: vec!["xlsx".to_string(), "xls".to_string()],
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
            file_path: Some("logs/sheetforge.log".to_string()),
        }
    }
}
