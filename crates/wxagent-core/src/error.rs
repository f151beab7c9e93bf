//! Centralized error types for WxAgent.
//!
//! This module provides a typed error hierarchy that:
//! - Classifies every failure the weather and AI clients can surface
//! - Maps each class to a distinct transport status and machine-readable code
//! - Preserves full error context for debugging/logging

use thiserror::Error;
use uuid::Uuid;

/// Top-level application error type.
///
/// Everything the service layer can fail with converts into this type.
/// Use `status_code()` and `code()` when framing a response for a caller.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Weather service error: {0}")]
    Weather(#[from] WeatherError),

    #[error("AI service error: {0}")]
    Ai(#[from] AiError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Returns a user-friendly message suitable for display.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Weather(e) => e.user_message(),
            AppError::Ai(e) => e.kind.user_message(),
            AppError::Config(e) => e.user_message(),
            AppError::NotFound(_) => "No matching location was found.",
            AppError::Other(_) => "An unexpected error occurred. Please try again.",
        }
    }

    /// Whether the same request may succeed if the caller tries again later.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Weather(e) => e.is_retryable(),
            AppError::Ai(e) => matches!(e.kind, AiErrorKind::Timeout | AiErrorKind::Service(_)),
            AppError::Config(_) | AppError::NotFound(_) | AppError::Other(_) => false,
        }
    }

    /// HTTP status the web layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::Weather(e) => e.status_code(),
            AppError::Ai(e) => e.kind.status_code(),
            AppError::NotFound(_) => 404,
            AppError::Config(_) | AppError::Other(_) => 500,
        }
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Weather(e) => e.code(),
            AppError::Ai(e) => e.kind.code(),
            AppError::Config(_) => "config_error",
            AppError::NotFound(_) => "not_found",
            AppError::Other(_) => "internal_error",
        }
    }
}

/// Weather provider errors.
///
/// Transport retries and endpoint fallback happen before one of these is
/// produced; only the final, exhausted failure is reported.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WeatherError {
    #[error("Weather API key is missing")]
    MissingCredential,

    #[error("Weather upstream timed out")]
    UpstreamTimeout,

    #[error("Weather upstream error {status_code}: {message}")]
    UpstreamService { status_code: u16, message: String },
}

impl WeatherError {
    pub fn upstream(status_code: u16, message: impl Into<String>) -> Self {
        WeatherError::UpstreamService {
            status_code,
            message: message.into(),
        }
    }

    /// Upstream status code, if the failure carries one.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            WeatherError::UpstreamService { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    /// Whether the caller may succeed by simply trying again later.
    pub fn is_retryable(&self) -> bool {
        match self {
            WeatherError::UpstreamTimeout => true,
            WeatherError::UpstreamService { status_code, .. } => {
                *status_code == 429 || *status_code >= 500
            }
            WeatherError::MissingCredential => false,
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            WeatherError::MissingCredential => "Weather service is not configured.",
            WeatherError::UpstreamTimeout => "The weather service timed out. Please try again.",
            WeatherError::UpstreamService { status_code, .. } if *status_code >= 500 => {
                "The weather service is experiencing issues. Please try again later."
            }
            WeatherError::UpstreamService { .. } => "The weather request failed.",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            WeatherError::MissingCredential => 500,
            WeatherError::UpstreamTimeout => 504,
            WeatherError::UpstreamService { .. } => 502,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            WeatherError::MissingCredential => "weather_missing_credential",
            WeatherError::UpstreamTimeout => "weather_upstream_timeout",
            WeatherError::UpstreamService { .. } => "weather_upstream_error",
        }
    }
}

/// Classification of a failed generative-text call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AiErrorKind {
    #[error("AI features are disabled (no API key configured)")]
    Disabled,

    #[error("AI client is incompatible: {0}")]
    SdkIncompatible(String),

    #[error("AI request timed out")]
    Timeout,

    #[error("AI returned malformed output: {0}")]
    Parse(String),

    #[error("AI output failed validation at '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("AI service error: {0}")]
    Service(String),
}

impl AiErrorKind {
    pub fn user_message(&self) -> &'static str {
        match self {
            AiErrorKind::Disabled => "AI insights are not enabled.",
            AiErrorKind::SdkIncompatible(_) => "AI insights are unavailable on this server.",
            AiErrorKind::Timeout => "The AI service timed out. Please try again.",
            AiErrorKind::Parse(_) | AiErrorKind::Validation { .. } => {
                "The AI service returned an unexpected answer. Please try again."
            }
            AiErrorKind::Service(_) => "The AI service failed. Please try again later.",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            AiErrorKind::Disabled => 503,
            AiErrorKind::SdkIncompatible(_) => 500,
            AiErrorKind::Timeout => 504,
            AiErrorKind::Parse(_) | AiErrorKind::Validation { .. } | AiErrorKind::Service(_) => {
                502
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AiErrorKind::Disabled => "ai_disabled",
            AiErrorKind::SdkIncompatible(_) => "ai_sdk_incompatible",
            AiErrorKind::Timeout => "ai_timeout",
            AiErrorKind::Parse(_) => "ai_parse_error",
            AiErrorKind::Validation { .. } => "ai_validation_error",
            AiErrorKind::Service(_) => "ai_service_error",
        }
    }
}

/// A failed generative-text call, tagged with the call's trace id.
///
/// The trace id exists even when the call never reached the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} (trace_id={trace_id})")]
pub struct AiError {
    pub trace_id: Uuid,
    #[source]
    pub kind: AiErrorKind,
}

impl AiError {
    pub fn new(trace_id: Uuid, kind: AiErrorKind) -> Self {
        Self { trace_id, kind }
    }

    /// Name of the offending field for validation failures.
    pub fn field(&self) -> Option<&str> {
        match &self.kind {
            AiErrorKind::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}

/// Configuration errors raised while loading settings at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not determine the configuration directory")]
    NoConfigDir,

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration parse error: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::NoConfigDir | ConfigError::Read { .. } => {
                "Configuration could not be read. Check file permissions."
            }
            ConfigError::ParseError(_) => "Configuration file is malformed. Check your settings.",
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
        }
    }
}
