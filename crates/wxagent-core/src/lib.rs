pub mod config;
pub mod error;

pub use config::{mask_secret, AiConfig, Config, ValidationResult, WeatherConfig};
pub use error::{AiError, AiErrorKind, AppError, ConfigError, WeatherError};

use anyhow::Result;

/// Initialize logging for the process
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    tracing::info!("WxAgent core initialized");
    Ok(())
}
