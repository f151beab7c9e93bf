//! Forward geocoding: convert a place query to coordinates.
//! Uses the OpenWeather direct geocoding API.

use serde_json::{Map, Value};
use wxagent_core::WeatherError;

use crate::types::Location;

pub const GEOCODE_PATH: &str = "/geo/1.0/direct";

/// Cache key for a query: trimmed, lowercased, namespaced.
pub fn cache_key(query: &str) -> String {
    format!("geocode:{}", query.trim().to_lowercase())
}

/// Pick the top candidate from a geocoding response.
///
/// An empty list is a legitimate "not found" and yields `Ok(None)`. A top
/// candidate whose coordinates cannot be read is an upstream error, never a
/// location at (0, 0).
pub fn location_from_response(body: Value, query: &str) -> Result<Option<Location>, WeatherError> {
    let candidates: Vec<Value> = match body {
        Value::Array(items) => items,
        other => {
            return Err(WeatherError::upstream(
                502,
                format!("unexpected geocoding response: expected a list, got {}", kind(&other)),
            ))
        }
    };

    let Some(top) = candidates.into_iter().next() else {
        return Ok(None);
    };

    let Value::Object(candidate) = top else {
        return Err(WeatherError::upstream(
            502,
            format!("unexpected geocoding candidate: expected an object, got {}", kind(&top)),
        ));
    };

    Ok(Some(Location {
        name: display_name(&candidate, query),
        lat: coordinate(&candidate, "lat")?,
        lon: coordinate(&candidate, "lon")?,
    }))
}

/// Read a coordinate, accepting numbers and numeric strings.
///
/// An absent field counts as 0.0; a present but unreadable one is an error.
fn coordinate(candidate: &Map<String, Value>, field: &str) -> Result<f64, WeatherError> {
    let Some(value) = candidate.get(field) else {
        return Ok(0.0);
    };

    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    parsed.filter(|v| v.is_finite()).ok_or_else(|| {
        WeatherError::upstream(
            502,
            format!("unusable '{}' in geocoding candidate: {}", field, value),
        )
    })
}

/// Join name, state and country, skipping parts that are empty or not strings.
fn display_name(candidate: &Map<String, Value>, query: &str) -> String {
    let parts: Vec<&str> = ["name", "state", "country"]
        .into_iter()
        .filter_map(|field| candidate.get(field).and_then(Value::as_str))
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();

    if parts.is_empty() {
        query.to_string()
    } else {
        parts.join(", ")
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cache_key_normalized() {
        assert_eq!(cache_key("  Hanoi "), "geocode:hanoi");
        assert_eq!(cache_key("HANOI"), cache_key("hanoi"));
    }

    #[test]
    fn test_empty_result_is_none() {
        assert_eq!(location_from_response(json!([]), "Nowhere").unwrap(), None);
    }

    #[test]
    fn test_full_name_joined() {
        let body = json!([
            {"name": "Hanoi", "state": "", "country": "VN", "lat": 21.0285, "lon": 105.8542},
            {"name": "Other", "lat": 1.0, "lon": 1.0}
        ]);
        let location = location_from_response(body, "hanoi").unwrap().unwrap();
        assert_eq!(location.name, "Hanoi, VN");
        assert_eq!(location.lat, 21.0285);
        assert_eq!(location.lon, 105.8542);
    }

    #[test]
    fn test_country_only_name() {
        let body = json!([{"country": "VN", "lat": 16.0, "lon": 108.0}]);
        let location = location_from_response(body, "somewhere").unwrap().unwrap();
        assert_eq!(location.name, "VN");
    }

    #[test]
    fn test_no_name_parts_falls_back_to_query() {
        let body = json!([{"name": null, "lat": 1.5}]);
        let location = location_from_response(body, "Query Town").unwrap().unwrap();
        assert_eq!(location.name, "Query Town");
        assert_eq!(location.lat, 1.5);
        assert_eq!(location.lon, 0.0);
    }

    #[test]
    fn test_mistyped_part_dropped_not_candidate() {
        let body = json!([
            {"name": "Hanoi", "state": 7, "country": "VN", "lat": 21.0285, "lon": 105.8542}
        ]);
        let location = location_from_response(body, "hanoi").unwrap().unwrap();
        assert_eq!(location.name, "Hanoi, VN");
        assert_eq!(location.lat, 21.0285);
        assert_eq!(location.lon, 105.8542);
    }

    #[test]
    fn test_string_coordinates_parsed() {
        let body = json!([{"name": "Hanoi", "lat": "21.0285", "lon": " 105.8542 "}]);
        let location = location_from_response(body, "hanoi").unwrap().unwrap();
        assert_eq!(location.lat, 21.0285);
        assert_eq!(location.lon, 105.8542);
    }

    #[test]
    fn test_unusable_coordinates_are_upstream_error() {
        for bad in [json!("north"), json!(null), json!(true), json!({"deg": 21}), json!("NaN")] {
            let body = json!([{"name": "Hanoi", "lat": bad, "lon": 105.8}]);
            let err = location_from_response(body, "hanoi").unwrap_err();
            assert_eq!(err.upstream_status(), Some(502));
        }
    }

    #[test]
    fn test_non_object_candidate_is_upstream_error() {
        let err = location_from_response(json!(["Hanoi"]), "hanoi").unwrap_err();
        assert_eq!(err.upstream_status(), Some(502));
    }

    #[test]
    fn test_non_list_is_upstream_error() {
        let err = location_from_response(json!({"cod": 401}), "x").unwrap_err();
        assert_eq!(err.upstream_status(), Some(502));
    }
}
