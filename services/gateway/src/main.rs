use anyhow::Result;
use tokio::net::TcpListener;
use tracing::{info, warn};

use sheetforge_gateway::{create_app, AppState};
use sheetforge_utils::{init_logging, AppConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load().unwrap_or_else(|error| {
        eprintln!("Failed to load configuration, using defaults: {}", error);
        AppConfig::default()
    });

    init_logging(&config.logging)?;
    info!("Starting SheetForge gateway");

    ensure_directories(&config)?;

    let state = AppState::from_config(config.clone());
    info!(
        openai_provider = config.openai.provider.as_str(),
        openai_configured = config.openai_configured(),
        anthropic_configured = config.anthropic_configured(),
        template = %config.storage.template_path.display(),
        "provider readiness"
    );
    if !config.openai_configured() {
        warn!(missing = ?config.missing_keys(), "workbook processing disabled");
    }

    let app = create_app(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Gateway listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

fn ensure_directories(config: &AppConfig) -> Result<()> {
    std::fs::create_dir_all(&config.storage.upload_dir)?;
    std::fs::create_dir_all(&config.storage.output_dir)?;
    if let Some(parent) = config.storage.template_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}
