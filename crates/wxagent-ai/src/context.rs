//! Reduced weather context sent to the model.

use chrono::{DateTime, Utc};
use serde::Serialize;
use wxagent_weather::{ConditionSet, WeatherSnapshot, MAX_DAILY, MAX_HOURLY};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextLocation<'a> {
    pub name: &'a str,
    pub lat: f64,
    pub lon: f64,
}

/// The subset of a snapshot the prompts need.
///
/// Provider name and units are dropped; sequences are capped again in case the
/// snapshot was built by hand.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReducedContext<'a> {
    pub location: ContextLocation<'a>,
    pub current: &'a ConditionSet,
    pub hourly: &'a [ConditionSet],
    pub daily: &'a [ConditionSet],
    pub fetched_at: DateTime<Utc>,
}

impl<'a> ReducedContext<'a> {
    pub fn from_snapshot(snapshot: &'a WeatherSnapshot) -> Self {
        Self {
            location: ContextLocation {
                name: &snapshot.location.name,
                lat: snapshot.location.lat,
                lon: snapshot.location.lon,
            },
            current: &snapshot.current,
            hourly: &snapshot.hourly[..snapshot.hourly.len().min(MAX_HOURLY)],
            daily: &snapshot.daily[..snapshot.daily.len().min(MAX_DAILY)],
            fetched_at: snapshot.fetched_at,
        }
    }

    /// Compact JSON rendering for embedding in a prompt.
    pub fn to_json(&self) -> String {
        // Serializing plain data with string keys cannot fail
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use wxagent_weather::{Location, Units};

    fn snapshot(hours: usize, days: usize) -> WeatherSnapshot {
        WeatherSnapshot {
            location: Location {
                name: "Hanoi, VN".to_string(),
                lat: 21.0285,
                lon: 105.8542,
            },
            current: ConditionSet {
                humidity: Some(70.0),
                ..ConditionSet::default()
            },
            hourly: (0..hours)
                .map(|i| ConditionSet {
                    dt: Some(i as i64),
                    ..ConditionSet::default()
                })
                .collect(),
            daily: vec![ConditionSet::default(); days],
            provider: "openweather".to_string(),
            fetched_at: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
            units: Units::Metric,
        }
    }

    #[test]
    fn test_context_keeps_essentials() {
        let snap = snapshot(3, 2);
        let json: serde_json::Value = serde_json::from_str(&ReducedContext::from_snapshot(&snap).to_json()).unwrap();

        assert_eq!(json["location"]["name"], "Hanoi, VN");
        assert_eq!(json["current"]["humidity"], 70.0);
        assert_eq!(json["hourly"].as_array().unwrap().len(), 3);
        assert_eq!(json["fetched_at"], "2024-06-01T12:00:00Z");
        assert!(json.get("provider").is_none());
        assert!(json.get("units").is_none());
    }

    #[test]
    fn test_context_caps_sequences() {
        let snap = snapshot(30, 10);
        let context = ReducedContext::from_snapshot(&snap);
        assert_eq!(context.hourly.len(), MAX_HOURLY);
        assert_eq!(context.daily.len(), MAX_DAILY);
        assert_eq!(context.hourly[0].dt, Some(0));
    }
}
