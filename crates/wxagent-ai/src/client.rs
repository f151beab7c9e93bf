//! Generative-text client: summaries, structured alerts and Q&A over a
//! weather snapshot.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::time::sleep;
use tracing::{instrument, Instrument};
use uuid::Uuid;
use wxagent_core::{mask_secret, AiConfig, AiError, AiErrorKind};
use wxagent_weather::WeatherSnapshot;

use crate::alerts::{parse_alerts_reply, AlertsPayload};
use crate::context::ReducedContext;
use crate::prompts;
use crate::transport::{
    ChatMessage, ChatRequest, ChatTransport, OpenAiTransport, ResponseFormat, TransportError,
};

/// Initial attempt plus one retry
const MAX_ATTEMPTS: u32 = 2;
const RETRY_DELAY: Duration = Duration::from_millis(150);

/// Outcome of one successful model call
#[derive(Debug, Clone, PartialEq)]
pub struct AiResult {
    pub trace_id: Uuid,
    pub model: String,
    pub took_ms: u64,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub summary: String,
    pub trace_id: Uuid,
    pub model: String,
    pub took_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertsReport {
    pub analysis: AlertsPayload,
    pub trace_id: Uuid,
    pub model: String,
    pub took_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatAnswer {
    pub answer: String,
    pub trace_id: Uuid,
    pub model: String,
    pub took_ms: u64,
}

/// Diagnostic view of the client, safe to print
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AiStatus {
    pub enabled: bool,
    pub compatible: bool,
    pub provider: Option<String>,
    pub key_fingerprint: String,
    pub error: Option<String>,
    pub summary_model: String,
    pub alerts_model: String,
    pub chat_model: String,
}

enum Backend {
    Ready(Arc<dyn ChatTransport>),
    Disabled,
    Incompatible(String),
}

pub struct AiClient {
    backend: Backend,
    key_fingerprint: String,
    summary_model: String,
    alerts_model: String,
    chat_model: String,
    temperature: f32,
}

/// What to do after a failed attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Verdict {
    Retry,
    Fail(AiErrorKind),
}

/// Decide whether a failed attempt is worth repeating.
///
/// Timeouts, connection errors and 5xx get another attempt while one
/// remains; everything else fails immediately.
pub(crate) fn judge(error: &TransportError, attempts_left: bool) -> Verdict {
    let retryable = match error {
        TransportError::Timeout | TransportError::Connection(_) => true,
        TransportError::Status { status, .. } => *status >= 500,
        TransportError::InvalidResponse(_) => false,
    };
    if retryable && attempts_left {
        return Verdict::Retry;
    }

    match error {
        TransportError::Timeout => Verdict::Fail(AiErrorKind::Timeout),
        other => Verdict::Fail(AiErrorKind::Service(other.to_string())),
    }
}

impl AiClient {
    /// Build a client from configuration.
    ///
    /// Without an API key the client is disabled. If the HTTP transport
    /// cannot be built the client is marked incompatible. Either way every
    /// call fails fast without touching the network.
    pub fn from_config(config: &AiConfig) -> Self {
        let key_fingerprint = mask_secret(config.api_key());
        let backend = match config.api_key() {
            None => {
                tracing::info!("AI features disabled: no API key configured");
                Backend::Disabled
            }
            Some(key) => match OpenAiTransport::new(
                &config.base_url,
                key,
                Duration::from_secs(config.timeout_secs),
            ) {
                Ok(transport) => {
                    tracing::info!(
                        key = %key_fingerprint,
                        endpoint = %transport.endpoint(),
                        "AI client initialized"
                    );
                    Backend::Ready(Arc::new(transport))
                }
                Err(e) => {
                    tracing::error!(error = %e, "AI transport unavailable");
                    Backend::Incompatible(e.to_string())
                }
            },
        };

        Self {
            backend,
            key_fingerprint,
            summary_model: config.summary_model.clone(),
            alerts_model: config.alerts_model().to_string(),
            chat_model: config.chat_model().to_string(),
            temperature: config.temperature,
        }
    }

    /// Build a client over an existing transport. Model names and temperature
    /// come from `config`; its key and base URL are ignored.
    pub fn with_transport(config: &AiConfig, transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            backend: Backend::Ready(transport),
            key_fingerprint: mask_secret(config.api_key()),
            summary_model: config.summary_model.clone(),
            alerts_model: config.alerts_model().to_string(),
            chat_model: config.chat_model().to_string(),
            temperature: config.temperature,
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self.backend, Backend::Ready(_))
    }

    pub fn status(&self) -> AiStatus {
        let (enabled, compatible, provider, error) = match &self.backend {
            Backend::Ready(t) => (true, true, Some(t.name().to_string()), None),
            Backend::Disabled => (false, true, None, None),
            Backend::Incompatible(reason) => (false, false, None, Some(reason.clone())),
        };
        AiStatus {
            enabled,
            compatible,
            provider,
            key_fingerprint: self.key_fingerprint.clone(),
            error,
            summary_model: self.summary_model.clone(),
            alerts_model: self.alerts_model.clone(),
            chat_model: self.chat_model.clone(),
        }
    }

    /// Plain-language summary of the snapshot.
    #[instrument(skip_all, fields(location = %snapshot.location.name))]
    pub async fn summarize(&self, snapshot: &WeatherSnapshot) -> Result<Summary, AiError> {
        let context = ReducedContext::from_snapshot(snapshot);
        let result = self
            .call(
                &self.summary_model,
                prompts::SYSTEM_SUMMARY,
                &prompts::summary_prompt(&context),
                false,
            )
            .await?;

        Ok(Summary {
            summary: result.content,
            trace_id: result.trace_id,
            model: result.model,
            took_ms: result.took_ms,
        })
    }

    /// Structured risk analysis, validated before it is returned.
    #[instrument(skip_all, fields(location = %snapshot.location.name))]
    pub async fn alerts(&self, snapshot: &WeatherSnapshot) -> Result<AlertsReport, AiError> {
        let context = ReducedContext::from_snapshot(snapshot);
        let result = self
            .call(
                &self.alerts_model,
                prompts::SYSTEM_ALERTS,
                &prompts::alerts_prompt(&context),
                true,
            )
            .await?;

        let analysis = parse_alerts_reply(&result.content).map_err(|kind| {
            tracing::warn!(trace_id = %result.trace_id, error = %kind, "Rejected alerts reply");
            AiError::new(result.trace_id, kind)
        })?;

        Ok(AlertsReport {
            analysis,
            trace_id: result.trace_id,
            model: result.model,
            took_ms: result.took_ms,
        })
    }

    /// Answer a free-form question about the snapshot.
    #[instrument(skip_all, fields(location = %snapshot.location.name))]
    pub async fn chat(&self, question: &str, snapshot: &WeatherSnapshot) -> Result<ChatAnswer, AiError> {
        let context = ReducedContext::from_snapshot(snapshot);
        let result = self
            .call(
                &self.chat_model,
                prompts::SYSTEM_QA,
                &prompts::chat_prompt(&context, question),
                false,
            )
            .await?;

        Ok(ChatAnswer {
            answer: result.content,
            trace_id: result.trace_id,
            model: result.model,
            took_ms: result.took_ms,
        })
    }

    /// Send one system + user exchange, retrying transient failures once.
    pub async fn call(
        &self,
        model: &str,
        system: &str,
        user: &str,
        json_mode: bool,
    ) -> Result<AiResult, AiError> {
        let trace_id = Uuid::new_v4();
        let span = tracing::info_span!("ai_call", %trace_id, model);
        self.call_traced(trace_id, model, system, user, json_mode)
            .instrument(span)
            .await
            .map_err(|kind| AiError::new(trace_id, kind))
    }

    async fn call_traced(
        &self,
        trace_id: Uuid,
        model: &str,
        system: &str,
        user: &str,
        json_mode: bool,
    ) -> Result<AiResult, AiErrorKind> {
        let transport = match &self.backend {
            Backend::Ready(transport) => transport,
            Backend::Disabled => return Err(AiErrorKind::Disabled),
            Backend::Incompatible(reason) => return Err(AiErrorKind::SdkIncompatible(reason.clone())),
        };

        let request = ChatRequest {
            model: model.to_string(),
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            temperature: self.temperature,
            response_format: json_mode.then(ResponseFormat::json_object),
        };

        let started = Instant::now();
        let mut attempt = 1;
        loop {
            tracing::debug!(attempt, max_attempts = MAX_ATTEMPTS, "Sending chat request");
            let error = match transport.complete(&request).await {
                Ok(response) => {
                    let content = response.content.trim().to_string();
                    if content.is_empty() {
                        return Err(AiErrorKind::Service("model returned empty content".to_string()));
                    }
                    let took_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
                    let model_used = response.model.unwrap_or_else(|| model.to_string());
                    tracing::info!(%trace_id, model = %model_used, took_ms, "AI call succeeded");
                    return Ok(AiResult {
                        trace_id,
                        model: model_used,
                        took_ms,
                        content,
                    });
                }
                Err(error) => error,
            };

            match judge(&error, attempt < MAX_ATTEMPTS) {
                Verdict::Retry => {
                    tracing::warn!(attempt, error = %error, "AI call failed, retrying");
                    attempt += 1;
                    sleep(RETRY_DELAY).await;
                }
                Verdict::Fail(kind) => {
                    tracing::error!(attempt, error = %error, "AI call failed");
                    return Err(kind);
                }
            }
        }
    }
}

impl std::fmt::Debug for AiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiClient")
            .field("status", &self.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> TransportError {
        TransportError::Status {
            status: code,
            body: String::new(),
        }
    }

    #[test]
    fn test_transient_errors_retry_once() {
        for error in [TransportError::Timeout, TransportError::Connection("reset".into()), status(502)] {
            assert_eq!(judge(&error, true), Verdict::Retry);
        }
    }

    #[test]
    fn test_exhausted_classification() {
        assert_eq!(judge(&TransportError::Timeout, false), Verdict::Fail(AiErrorKind::Timeout));
        assert!(matches!(
            judge(&TransportError::Connection("reset".into()), false),
            Verdict::Fail(AiErrorKind::Service(_))
        ));
        assert!(matches!(judge(&status(500), false), Verdict::Fail(AiErrorKind::Service(_))));
    }

    #[test]
    fn test_client_errors_fail_immediately() {
        for error in [status(400), status(401), status(429), TransportError::InvalidResponse("x".into())] {
            assert!(matches!(judge(&error, true), Verdict::Fail(AiErrorKind::Service(_))));
        }
    }

    #[tokio::test]
    async fn test_disabled_without_key() {
        let client = AiClient::from_config(&AiConfig::default());
        assert!(!client.is_enabled());

        let err = client.call("m", "s", "u", false).await.unwrap_err();
        assert_eq!(err.kind, AiErrorKind::Disabled);
        assert!(!err.trace_id.is_nil());
    }

    #[tokio::test]
    async fn test_bad_base_url_is_incompatible() {
        let client = AiClient::from_config(&AiConfig {
            api_key: Some("sk-test-1234".to_string()),
            base_url: "not a url".to_string(),
            ..AiConfig::default()
        });

        let status = client.status();
        assert!(!status.compatible);
        assert!(status.error.is_some());

        let err = client.call("m", "s", "u", false).await.unwrap_err();
        assert!(matches!(err.kind, AiErrorKind::SdkIncompatible(_)));
    }

    #[test]
    fn test_status_masks_key_and_resolves_models() {
        let client = AiClient::from_config(&AiConfig {
            api_key: Some("sk-secret-abcd".to_string()),
            chat_model: Some("gpt-4o".to_string()),
            ..AiConfig::default()
        });

        let status = client.status();
        assert!(status.enabled);
        assert_eq!(status.provider.as_deref(), Some("openai"));
        assert_eq!(status.key_fingerprint, "****abcd");
        assert_eq!(status.alerts_model, status.summary_model);
        assert_eq!(status.chat_model, "gpt-4o");
        assert!(!format!("{:?}", client).contains("secret"));
    }
}
