use anyhow::Result;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::LoggingConfig;

/// Install the global subscriber: console always, plus an appending file
/// when the config names one. `RUST_LOG` overrides the configured level.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    let log_file = match config.file_path.as_deref() {
        Some(path) if !path.trim().is_empty() => {
            if let Some(parent) = std::path::Path::new(path).parent() {
                std::fs::create_dir_all(parent)?;
            }
            Some(
                std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)?,
            )
        }
        _ => None,
    };

    match config.format.as_str() {
        "json" => {
            let console_layer = fmt::layer()
                .json()
                .with_span_events(FmtSpan::CLOSE)
                .with_thread_ids(true);

            match log_file {
                Some(file) => registry
                    .with(console_layer)
                    .with(fmt::layer().json().with_ansi(false).with_writer(file))
                    .init(),
                None => registry.with(console_layer).init(),
            }
        }
        _ => {
            let console_layer = fmt::layer().with_span_events(FmtSpan::CLOSE);

            match log_file {
                Some(file) => registry
                    .with(console_layer)
                    .with(fmt::layer().with_ansi(false).with_writer(file))
                    .init(),
                None => registry.with(console_layer).init(),
            }
        }
    }

    tracing::info!("Logging initialized with level: {}", config.level);
    Ok(())
}
