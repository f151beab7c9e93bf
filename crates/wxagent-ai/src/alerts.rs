//! Structured weather-risk analysis returned by the alerts capability.
//!
//! Model output is untrusted: it is parsed as loose JSON, checked field by
//! field, and only then converted into [`AlertsPayload`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use wxagent_core::AiErrorKind;

pub const MAX_HEADLINE_CHARS: usize = 80;

const SEVERITIES: [&str; 5] = ["none", "low", "moderate", "high", "extreme"];
const RISK_TYPES: [&str; 6] = ["heat", "rain", "wind", "uv", "visibility", "storm"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    None,
    Low,
    Moderate,
    High,
    Extreme,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskType {
    Heat,
    Rain,
    Wind,
    Uv,
    Visibility,
    Storm,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Risk {
    #[serde(rename = "type")]
    pub kind: RiskType,
    /// 1 (minor) to 5 (severe)
    pub level: u8,
    pub why: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertsPayload {
    pub severity: Severity,
    pub headline: String,
    #[serde(default)]
    pub risks: Vec<Risk>,
    #[serde(default)]
    pub advice: Vec<String>,
}

/// Turn raw model text into a validated payload.
pub fn parse_alerts_reply(text: &str) -> Result<AlertsPayload, AiErrorKind> {
    let body = strip_code_fence(text);
    let parsed: Value = serde_json::from_str(body)
        .map_err(|e| AiErrorKind::Parse(format!("reply is not valid JSON: {}", e)))?;

    let Value::Object(mut object) = parsed else {
        return Err(AiErrorKind::Parse("reply is not a JSON object".to_string()));
    };

    // Some models nest the payload one level down
    let analysis = match object.remove("analysis") {
        Some(Value::Object(inner)) => inner,
        Some(other) => {
            object.insert("analysis".to_string(), other);
            object
        }
        None => object,
    };

    validate_alerts(&analysis)?;

    serde_json::from_value(Value::Object(analysis))
        .map_err(|e| AiErrorKind::Parse(format!("validated payload did not deserialize: {}", e)))
}

/// Check every invariant of the alerts schema, naming the first field that fails.
pub fn validate_alerts(analysis: &Map<String, Value>) -> Result<(), AiErrorKind> {
    match analysis.get("severity").and_then(Value::as_str) {
        Some(s) if SEVERITIES.contains(&s) => {}
        _ => return Err(invalid("severity", "must be one of none|low|moderate|high|extreme")),
    }

    match analysis.get("headline").and_then(Value::as_str) {
        Some(h) if h.chars().count() <= MAX_HEADLINE_CHARS => {}
        Some(_) => return Err(invalid("headline", "must be at most 80 characters")),
        None => return Err(invalid("headline", "must be a string")),
    }

    let risks = list(analysis, "risks")?;
    for (i, entry) in risks.iter().enumerate() {
        let Some(risk) = entry.as_object() else {
            return Err(invalid(&format!("risks[{}]", i), "must be an object"));
        };

        match risk.get("type").and_then(Value::as_str) {
            Some(t) if RISK_TYPES.contains(&t) => {}
            _ => {
                return Err(invalid(
                    "type",
                    &format!("risks[{}].type must be one of heat|rain|wind|uv|visibility|storm", i),
                ))
            }
        }

        match risk.get("level").and_then(Value::as_i64) {
            Some(level) if (1..=5).contains(&level) => {}
            _ => {
                return Err(invalid(
                    "level",
                    &format!("risks[{}].level must be an integer between 1 and 5", i),
                ))
            }
        }

        match risk.get("why").and_then(Value::as_str) {
            Some(why) if !why.trim().is_empty() => {}
            _ => {
                return Err(invalid(
                    "why",
                    &format!("risks[{}].why must be a non-empty string", i),
                ))
            }
        }
    }

    let advice = list(analysis, "advice")?;
    for (i, tip) in advice.iter().enumerate() {
        match tip.as_str() {
            Some(text) if !text.trim().is_empty() => {}
            _ => return Err(invalid(&format!("advice[{}]", i), "must be a non-empty string")),
        }
    }

    Ok(())
}

/// Missing lists count as empty.
fn list<'a>(analysis: &'a Map<String, Value>, field: &str) -> Result<&'a [Value], AiErrorKind> {
    match analysis.get(field) {
        None => Ok(&[][..]),
        Some(Value::Array(items)) => Ok(items.as_slice()),
        Some(_) => Err(invalid(field, "must be a list")),
    }
}

fn invalid(field: &str, message: &str) -> AiErrorKind {
    AiErrorKind::Validation {
        field: field.to_string(),
        message: message.to_string(),
    }
}

/// Remove a surrounding Markdown code fence (```json ... ```), if any.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(inner) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening line
    match inner.find('\n') {
        Some(newline) => inner[newline + 1..].trim(),
        None => inner.trim(),
    }
}
