use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of hourly entries kept in a snapshot
pub const MAX_HOURLY: usize = 12;
/// Maximum number of daily entries kept in a snapshot
pub const MAX_DAILY: usize = 7;

/// Measurement system requested from the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
    Standard,
}

impl Units {
    /// Parse a units parameter leniently.
    ///
    /// Unknown or empty values fall back to metric rather than failing.
    pub fn from_param(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "imperial" => Self::Imperial,
            "standard" => Self::Standard,
            _ => Self::Metric,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Metric => "metric",
            Self::Imperial => "imperial",
            Self::Standard => "standard",
        }
    }
}

impl std::fmt::Display for Units {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Geographic location resolved from a place name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

/// First entry of the provider's `weather` array
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherDescription {
    pub main: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
}

/// Per-period temperatures reported for daily entries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyTemperature {
    pub day: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub night: Option<f64>,
    pub eve: Option<f64>,
    pub morn: Option<f64>,
}

/// A temperature reading: a single value for current/hourly entries,
/// a breakdown for daily entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Temperature {
    Point(f64),
    Daily(DailyTemperature),
}

impl Temperature {
    /// Representative single value (the daytime value for daily entries)
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Point(v) => Some(*v),
            Self::Daily(d) => d.day,
        }
    }
}

/// Conditions at one point in time.
///
/// Every field the provider omitted stays `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConditionSet {
    pub dt: Option<i64>,
    pub sunrise: Option<i64>,
    pub sunset: Option<i64>,
    pub temp: Option<Temperature>,
    pub feels_like: Option<Temperature>,
    pub humidity: Option<f64>,
    pub wind_speed: Option<f64>,
    pub pressure: Option<f64>,
    pub visibility: Option<f64>,
    pub uvi: Option<f64>,
    /// Probability of precipitation, 0..1
    pub pop: Option<f64>,
    pub weather: WeatherDescription,
}

/// Normalized weather bundle returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub location: Location,
    pub current: ConditionSet,
    pub hourly: Vec<ConditionSet>,
    pub daily: Vec<ConditionSet>,
    pub provider: String,
    pub fetched_at: DateTime<Utc>,
    pub units: Units,
}

/// Values stored in the shared cache
#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    Location(Location),
    Snapshot(WeatherSnapshot),
}
