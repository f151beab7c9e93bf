//! OpenWeather client with cache-through, retry and endpoint fallback.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use tracing::instrument;
use wxagent_core::{WeatherConfig, WeatherError};

use crate::cache::TtlCache;
use crate::fallback::fetch_json;
use crate::geocode::{self, GEOCODE_PATH};
use crate::normalize::normalize_onecall;
use crate::retry::RetryConfig;
use crate::types::{CachedValue, Location, Units, WeatherSnapshot};

/// One Call endpoints, newest first. Older API tiers only expose 2.5.
pub const WEATHER_PATHS: [&str; 2] = ["/data/3.0/onecall", "/data/2.5/onecall"];

/// Shared cache handle used by the weather client
pub type WeatherCache = TtlCache<CachedValue>;

#[derive(Debug, Clone)]
pub struct WeatherClient {
    http: Client,
    api_key: Option<String>,
    base_url: String,
    retry: RetryConfig,
    geocode_ttl_secs: i64,
    weather_ttl_secs: i64,
    cache: Arc<WeatherCache>,
}

impl WeatherClient {
    pub fn new(config: &WeatherConfig, cache: Arc<WeatherCache>) -> Result<Self, WeatherError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| WeatherError::upstream(503, format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_key: config.api_key().map(str::to_string),
            base_url: config.base_url.clone(),
            retry: RetryConfig::from_config(config),
            geocode_ttl_secs: config.geocode_ttl_secs,
            weather_ttl_secs: config.weather_ttl_secs,
            cache,
        })
    }

    fn require_key(&self) -> Result<&str, WeatherError> {
        self.api_key.as_deref().ok_or(WeatherError::MissingCredential)
    }

    /// Resolve a place name to coordinates.
    ///
    /// Returns `Ok(None)` when the provider knows no such place.
    #[instrument(skip(self), level = "info")]
    pub async fn geocode(&self, query: &str) -> Result<Option<Location>, WeatherError> {
        let api_key = self.require_key()?;
        if query.trim().is_empty() {
            return Ok(None);
        }

        let key = geocode::cache_key(query);
        if let Some(CachedValue::Location(location)) = self.cache.get(&key) {
            tracing::debug!("Geocode cache hit");
            return Ok(Some(location));
        }

        let params = [
            ("q", query.to_string()),
            ("limit", "1".to_string()),
            ("appid", api_key.to_string()),
        ];
        let body = fetch_json(&self.http, &self.base_url, &[GEOCODE_PATH], &params, &self.retry).await?;

        let location = geocode::location_from_response(body, query)?;
        match &location {
            Some(found) => {
                tracing::info!(name = %found.name, lat = found.lat, lon = found.lon, "Geocoded");
                self.cache
                    .set(key, CachedValue::Location(found.clone()), self.geocode_ttl_secs);
            }
            None => tracing::info!("No geocoding match"),
        }
        Ok(location)
    }

    /// Fetch a normalized snapshot for coordinates.
    ///
    /// `units` is parsed leniently; anything unrecognized means metric.
    #[instrument(skip(self), level = "info")]
    pub async fn get_weather(
        &self,
        lat: f64,
        lon: f64,
        units: &str,
    ) -> Result<WeatherSnapshot, WeatherError> {
        let api_key = self.require_key()?;
        let units = Units::from_param(units);

        let key = weather_cache_key(lat, lon, units);
        if let Some(CachedValue::Snapshot(snapshot)) = self.cache.get(&key) {
            tracing::debug!("Weather cache hit");
            return Ok(snapshot);
        }

        let params = [
            ("lat", lat.to_string()),
            ("lon", lon.to_string()),
            ("units", units.as_str().to_string()),
            ("exclude", "minutely,alerts".to_string()),
            ("appid", api_key.to_string()),
        ];
        let body = fetch_json(&self.http, &self.base_url, &WEATHER_PATHS, &params, &self.retry).await?;

        let snapshot = normalize_onecall(&body, lat, lon, units, Utc::now());
        self.cache
            .set(key, CachedValue::Snapshot(snapshot.clone()), self.weather_ttl_secs);
        Ok(snapshot)
    }

    /// Geocode `query` and fetch weather for the top match.
    pub async fn get_weather_for_query(
        &self,
        query: &str,
        units: &str,
    ) -> Result<Option<(Location, WeatherSnapshot)>, WeatherError> {
        let Some(location) = self.geocode(query).await? else {
            return Ok(None);
        };
        let snapshot = self.get_weather(location.lat, location.lon, units).await?;
        Ok(Some((location, snapshot)))
    }
}

/// Cache key for a weather lookup.
///
/// Coordinates are rounded to 4 decimals (about 11 m) so near-identical
/// requests share an entry.
pub fn weather_cache_key(lat: f64, lon: f64, units: Units) -> String {
    format!("weather:{}:{:.4}:{:.4}", units, lat, lon)
}
