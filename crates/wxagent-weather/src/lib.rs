//! Weather data acquisition for WxAgent
//!
//! Geocoding and One Call weather lookups against OpenWeather, with a shared
//! TTL cache, transport retries and endpoint fallback.

pub mod cache;
pub mod client;
pub mod fallback;
pub mod geocode;
pub mod normalize;
pub mod retry;
pub mod types;

pub use cache::{Clock, SystemClock, TtlCache};
pub use client::{weather_cache_key, WeatherCache, WeatherClient};
pub use normalize::normalize_onecall;
pub use retry::RetryConfig;
pub use types::*;
pub use wxagent_core::WeatherError;
