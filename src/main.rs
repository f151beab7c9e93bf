mod cli;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use serde_json::{json, Value};
use wxagent_ai::AiClient;
use wxagent_core::{mask_secret, AppError, Config};
use wxagent_weather::{WeatherCache, WeatherClient, WeatherSnapshot};

use cli::{Cli, Commands, Target};

/// Everything one command needs, built once at startup
struct Services {
    config: Config,
    weather: WeatherClient,
    ai: AiClient,
}

impl Services {
    fn new(config: Config) -> Result<Self, AppError> {
        let cache = Arc::new(WeatherCache::new());
        let weather = WeatherClient::new(&config.weather, cache)?;
        let ai = AiClient::from_config(&config.ai);
        Ok(Self { config, weather, ai })
    }

    /// Resolve a target to a snapshot, geocoding first when given a place name.
    async fn snapshot(&self, target: &Target) -> Result<WeatherSnapshot, AppError> {
        match (&target.query, target.lat, target.lon) {
            (_, Some(lat), Some(lon)) => Ok(self.weather.get_weather(lat, lon, &target.units).await?),
            (Some(query), _, _) => self
                .weather
                .get_weather_for_query(query, &target.units)
                .await?
                .map(|(location, mut snapshot)| {
                    snapshot.location = location;
                    snapshot
                })
                .ok_or_else(|| AppError::NotFound(format!("no location matches '{}'", query))),
            _ => Err(AppError::Other(anyhow::anyhow!(
                "either --query or both --lat and --lon are required"
            ))),
        }
    }

    async fn run(&self, command: &Commands) -> Result<Value, AppError> {
        let output = match command {
            Commands::Geocode { query } => {
                let location = self.weather.geocode(query).await?;
                json!({ "query": query, "location": location })
            }
            Commands::Weather { target } => json!(self.snapshot(target).await?),
            Commands::Summarize { target } => {
                let snapshot = self.snapshot(target).await?;
                json!(self.ai.summarize(&snapshot).await?)
            }
            Commands::Alerts { target } => {
                let snapshot = self.snapshot(target).await?;
                json!(self.ai.alerts(&snapshot).await?)
            }
            Commands::Chat { target, question } => {
                let snapshot = self.snapshot(target).await?;
                json!(self.ai.chat(question, &snapshot).await?)
            }
            Commands::Config => self.describe_config(),
        };
        Ok(output)
    }

    fn describe_config(&self) -> Value {
        let weather = &self.config.weather;
        let path = Config::config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        json!({
            "path": path,
            "weather": {
                "api_key": mask_secret(weather.api_key()),
                "base_url": weather.base_url,
                "timeout_secs": weather.timeout_secs,
                "geocode_ttl_secs": weather.geocode_ttl_secs,
                "weather_ttl_secs": weather.weather_ttl_secs,
                "max_retries": weather.max_retries,
                "retry_initial_delay_ms": weather.retry_initial_delay_ms,
                "retry_max_delay_ms": weather.retry_max_delay_ms,
            },
            "ai": self.ai.status(),
        })
    }
}

/// Load settings, build the clients and run one command.
async fn execute(command: &Commands) -> Result<Value, AppError> {
    let (config, _validation) = Config::load_validated()?;
    let services = Services::new(config)?;

    tracing::info!(command = ?command, "WxAgent started");

    services.run(command).await
}

/// Error body in the shape the web layer answers with
fn error_body(err: &AppError) -> Value {
    let mut body = json!({
        "error": {
            "code": err.code(),
            "status": err.status_code(),
            "message": err.user_message(),
            "detail": err.to_string(),
            "retryable": err.is_retryable(),
        }
    });
    if let AppError::Ai(ai) = err {
        body["error"]["trace_id"] = json!(ai.trace_id);
        if let Some(field) = ai.field() {
            body["error"]["field"] = json!(field);
        }
    }
    body
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    wxagent_core::init()?;

    match execute(&cli.command).await {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Err(err) => {
            tracing::error!(code = err.code(), "Command failed: {}", err);
            println!("{}", serde_json::to_string_pretty(&error_body(&err))?);
            std::process::exit(1);
        }
    }
}
