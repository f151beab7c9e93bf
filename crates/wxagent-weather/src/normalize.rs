//! Shape raw One Call payloads into [`WeatherSnapshot`].
//!
//! Normalization is total: any JSON value produces a snapshot. Missing or
//! mistyped fields become `None` instead of failing, so provider schema drift
//! degrades the output rather than breaking the pipeline.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::types::{
    ConditionSet, DailyTemperature, Location, Temperature, Units, WeatherDescription,
    WeatherSnapshot, MAX_DAILY, MAX_HOURLY,
};

pub const PROVIDER_NAME: &str = "openweather";

/// Build a snapshot from a One Call response body.
///
/// Pure: `fetched_at` is supplied by the caller so identical inputs give
/// identical output.
pub fn normalize_onecall(
    raw: &Value,
    lat: f64,
    lon: f64,
    units: Units,
    fetched_at: DateTime<Utc>,
) -> WeatherSnapshot {
    let current = condition_set(raw.get("current"));
    let hourly = sequence(raw.get("hourly"), MAX_HOURLY);
    let daily = sequence(raw.get("daily"), MAX_DAILY);

    WeatherSnapshot {
        location: Location {
            name: format!("{:.2}, {:.2}", lat, lon),
            lat,
            lon,
        },
        current,
        hourly,
        daily,
        provider: PROVIDER_NAME.to_string(),
        fetched_at,
        units,
    }
}

fn sequence(value: Option<&Value>, limit: usize) -> Vec<ConditionSet> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().take(limit).map(|item| condition_set(Some(item))).collect())
        .unwrap_or_default()
}

fn condition_set(value: Option<&Value>) -> ConditionSet {
    let empty = Map::new();
    let entry = value.and_then(Value::as_object).unwrap_or(&empty);

    ConditionSet {
        dt: int(entry.get("dt")),
        sunrise: int(entry.get("sunrise")),
        sunset: int(entry.get("sunset")),
        temp: temperature(entry.get("temp")),
        feels_like: temperature(entry.get("feels_like")),
        humidity: number(entry.get("humidity")),
        wind_speed: number(entry.get("wind_speed")),
        pressure: number(entry.get("pressure")),
        visibility: number(entry.get("visibility")),
        uvi: number(entry.get("uvi")),
        pop: number(entry.get("pop")),
        weather: description(entry.get("weather")),
    }
}

fn description(value: Option<&Value>) -> WeatherDescription {
    let first = value
        .and_then(Value::as_array)
        .and_then(|items| items.first())
        .and_then(Value::as_object);

    match first {
        Some(item) => WeatherDescription {
            main: text(item.get("main")),
            description: text(item.get("description")),
            icon: text(item.get("icon")),
        },
        None => WeatherDescription::default(),
    }
}

fn temperature(value: Option<&Value>) -> Option<Temperature> {
    match value? {
        Value::Number(n) => n.as_f64().map(Temperature::Point),
        Value::Object(parts) => Some(Temperature::Daily(DailyTemperature {
            day: number(parts.get("day")),
            min: number(parts.get("min")),
            max: number(parts.get("max")),
            night: number(parts.get("night")),
            eve: number(parts.get("eve")),
            morn: number(parts.get("morn")),
        })),
        _ => None,
    }
}

fn number(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64)
}

fn int(value: Option<&Value>) -> Option<i64> {
    let value = value?;
    value
        .as_i64()
        .or_else(|| value.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
}

fn text(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn sample_payload() -> Value {
        json!({
            "current": {
                "dt": 1717243200,
                "sunrise": 1717194000,
                "sunset": 1717241000,
                "temp": 31.2,
                "feels_like": 36.5,
                "humidity": 70,
                "wind_speed": 3.1,
                "uvi": 9.4,
                "pressure": 1006,
                "visibility": 10000,
                "weather": [
                    {"main": "Clouds", "description": "broken clouds", "icon": "04d"},
                    {"main": "Rain", "description": "light rain", "icon": "10d"}
                ]
            },
            "hourly": (0..48).map(|i| json!({
                "dt": 1717243200 + i * 3600,
                "temp": 30.0,
                "pop": 0.2,
                "weather": [{"main": "Clear", "description": "clear sky", "icon": "01d"}]
            })).collect::<Vec<_>>(),
            "daily": (0..8).map(|i| json!({
                "dt": 1717243200 + i * 86400,
                "temp": {"day": 32.0, "min": 26.0, "max": 34.0, "night": 27.0, "eve": 30.0, "morn": 27.5},
                "feels_like": {"day": 38.0},
                "humidity": 65,
                "weather": []
            })).collect::<Vec<_>>()
        })
    }

    #[test]
    fn test_full_payload() {
        let snapshot = normalize_onecall(&sample_payload(), 21.0285, 105.8542, Units::Metric, fixed_time());

        assert_eq!(snapshot.location.name, "21.03, 105.85");
        assert_eq!(snapshot.provider, "openweather");
        assert_eq!(snapshot.units, Units::Metric);
        assert_eq!(snapshot.current.temp, Some(Temperature::Point(31.2)));
        assert_eq!(snapshot.current.humidity, Some(70.0));
        assert_eq!(snapshot.current.weather.main.as_deref(), Some("Clouds"));
        assert_eq!(snapshot.current.weather.icon.as_deref(), Some("04d"));
    }

    #[test]
    fn test_sequences_truncated_in_order() {
        let snapshot = normalize_onecall(&sample_payload(), 0.0, 0.0, Units::Metric, fixed_time());

        assert_eq!(snapshot.hourly.len(), MAX_HOURLY);
        assert_eq!(snapshot.daily.len(), MAX_DAILY);
        let hours: Vec<i64> = snapshot.hourly.iter().filter_map(|h| h.dt).collect();
        let mut sorted = hours.clone();
        sorted.sort_unstable();
        assert_eq!(hours, sorted);
        assert_eq!(hours[0], 1717243200);
    }

    #[test]
    fn test_short_sequences_not_padded() {
        let raw = json!({"hourly": [{"temp": 20.0}], "daily": []});
        let snapshot = normalize_onecall(&raw, 0.0, 0.0, Units::Metric, fixed_time());
        assert_eq!(snapshot.hourly.len(), 1);
        assert!(snapshot.daily.is_empty());
    }

    #[test]
    fn test_daily_temperature_breakdown() {
        let snapshot = normalize_onecall(&sample_payload(), 0.0, 0.0, Units::Metric, fixed_time());
        let day = &snapshot.daily[0];
        assert_eq!(
            day.temp,
            Some(Temperature::Daily(DailyTemperature {
                day: Some(32.0),
                min: Some(26.0),
                max: Some(34.0),
                night: Some(27.0),
                eve: Some(30.0),
                morn: Some(27.5),
            }))
        );
        assert_eq!(day.weather, WeatherDescription::default());
    }

    #[test]
    fn test_missing_fields_are_absent() {
        let raw = json!({"hourly": [{"dt": 1}]});
        let snapshot = normalize_onecall(&raw, 0.0, 0.0, Units::Metric, fixed_time());

        assert_eq!(snapshot.current, ConditionSet::default());
        assert_eq!(snapshot.hourly[0].pop, None);
        assert_eq!(snapshot.hourly[0].temp, None);
    }

    #[test]
    fn test_total_on_arbitrary_json() {
        for raw in [
            json!(null),
            json!([1, 2, 3]),
            json!("text"),
            json!({"current": "nope", "hourly": {"a": 1}, "daily": 5}),
            json!({"current": {"temp": "hot", "weather": "sunny", "dt": 1.9}}),
        ] {
            let snapshot = normalize_onecall(&raw, 1.0, 2.0, Units::Imperial, fixed_time());
            assert!(snapshot.hourly.is_empty());
            assert!(snapshot.daily.is_empty());
            assert_eq!(snapshot.current.temp, None);
        }
    }

    #[test]
    fn test_float_timestamp_truncates() {
        let raw = json!({"current": {"dt": 1717243200.7}});
        let snapshot = normalize_onecall(&raw, 0.0, 0.0, Units::Metric, fixed_time());
        assert_eq!(snapshot.current.dt, Some(1717243200));
    }

    #[test]
    fn test_idempotent() {
        let raw = sample_payload();
        let a = normalize_onecall(&raw, 21.0, 105.8, Units::Metric, fixed_time());
        let b = normalize_onecall(&raw, 21.0, 105.8, Units::Metric, fixed_time());
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }
}
