//! Retry-then-fallback across an ordered list of endpoints.
//!
//! The decision logic is a small state machine over
//! `{endpoint_index, attempt}` so it can be tested without a network:
//!
//! - retryable failures (429, 408, 5xx, timeouts, connection errors) retry
//!   the same endpoint until the retry budget is spent
//! - 401/403/404 advance to the next endpoint; the credential may not have
//!   access to that API version
//! - timeouts and transport errors that outlive their retries also advance
//! - any other status fails immediately
//!
//! Only when no endpoint remains is the last recorded error returned.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::Value;
use wxagent_core::WeatherError;

use crate::retry::{is_retryable_error, is_retryable_status, RetryConfig, RetryDecision};

/// Statuses meaning "this endpoint is not available to this credential"
pub const FALLBACK_STATUSES: [u16; 3] = [401, 403, 404];

/// Position of the fetch: which endpoint, which attempt on it (zero-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FetchState {
    pub endpoint_index: usize,
    pub attempt: u32,
}

/// How one attempt failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
    /// A response arrived with a non-200 status
    Status(u16),
    /// The attempt exceeded its deadline
    Timeout,
    /// No response was received
    Transport { retryable: bool, message: String },
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    RetrySame { delay: Duration },
    Advance { recorded: WeatherError },
    Fail(WeatherError),
}

#[derive(Debug, Clone)]
pub struct FallbackMachine {
    endpoint_count: usize,
    retry: RetryConfig,
    state: FetchState,
}

impl FallbackMachine {
    pub fn new(endpoint_count: usize, retry: RetryConfig) -> Self {
        Self {
            endpoint_count,
            retry,
            state: FetchState::default(),
        }
    }

    pub fn state(&self) -> FetchState {
        self.state
    }

    fn is_last_endpoint(&self) -> bool {
        self.state.endpoint_index + 1 >= self.endpoint_count
    }

    fn can_retry(&self) -> bool {
        self.state.attempt < self.retry.max_retries
    }

    /// Apply a failed attempt and move to the next state.
    pub fn step(&mut self, failure: AttemptFailure) -> Transition {
        match failure {
            AttemptFailure::Status(code) if status_is_retryable(code) && self.can_retry() => {
                self.retry_same()
            }
            AttemptFailure::Status(code)
                if FALLBACK_STATUSES.contains(&code) && !self.is_last_endpoint() =>
            {
                self.advance(WeatherError::upstream(code, "endpoint unavailable for credential"))
            }
            AttemptFailure::Status(code) => Transition::Fail(WeatherError::upstream(
                code,
                format!("request failed with status {}", code),
            )),
            AttemptFailure::Timeout if self.can_retry() => self.retry_same(),
            AttemptFailure::Timeout => self.record_or_fail(WeatherError::UpstreamTimeout),
            AttemptFailure::Transport { retryable: true, .. } if self.can_retry() => {
                self.retry_same()
            }
            AttemptFailure::Transport { message, .. } => {
                self.record_or_fail(WeatherError::upstream(503, message))
            }
        }
    }

    fn retry_same(&mut self) -> Transition {
        let delay = self.retry.delay_for_attempt(self.state.attempt);
        self.state.attempt += 1;
        Transition::RetrySame { delay }
    }

    fn advance(&mut self, recorded: WeatherError) -> Transition {
        self.state = FetchState {
            endpoint_index: self.state.endpoint_index + 1,
            attempt: 0,
        };
        Transition::Advance { recorded }
    }

    fn record_or_fail(&mut self, error: WeatherError) -> Transition {
        if self.is_last_endpoint() {
            Transition::Fail(error)
        } else {
            self.advance(error)
        }
    }
}

fn status_is_retryable(code: u16) -> bool {
    StatusCode::from_u16(code)
        .map(|status| is_retryable_status(status) == RetryDecision::Retry)
        .unwrap_or(false)
}

/// GET `paths` in order against `base_url` and return the first 200 body as JSON.
pub(crate) async fn fetch_json(
    http: &Client,
    base_url: &str,
    paths: &[&str],
    query: &[(&str, String)],
    retry: &RetryConfig,
) -> Result<Value, WeatherError> {
    let base = base_url.trim_end_matches('/');
    let mut machine = FallbackMachine::new(paths.len(), retry.clone());

    loop {
        let state = machine.state();
        let path = paths
            .get(state.endpoint_index)
            .ok_or_else(|| WeatherError::upstream(503, "no endpoint available"))?;
        let url = format!("{}{}", base, path);

        tracing::debug!(path, attempt = state.attempt + 1, "Requesting weather provider");

        let failure = match http.get(&url).query(query).send().await {
            Ok(response) if response.status() == StatusCode::OK => {
                match response.bytes().await {
                    Ok(body) => {
                        return serde_json::from_slice(&body).map_err(|e| {
                            WeatherError::upstream(502, format!("invalid JSON from {}: {}", path, e))
                        });
                    }
                    Err(e) => classify_error(&e),
                }
            }
            Ok(response) => AttemptFailure::Status(response.status().as_u16()),
            Err(e) => classify_error(&e),
        };

        match machine.step(failure.clone()) {
            Transition::RetrySame { delay } => {
                tracing::warn!(
                    path,
                    ?failure,
                    "Weather request failed, retrying in {:?}",
                    delay
                );
                tokio::time::sleep(delay).await;
            }
            Transition::Advance { recorded } => {
                tracing::info!(path, error = %recorded, "Weather endpoint failed, attempting fallback");
            }
            Transition::Fail(error) => {
                tracing::error!(path, error = %error, "Weather request failed");
                return Err(error);
            }
        }
    }
}

fn classify_error(error: &reqwest::Error) -> AttemptFailure {
    if error.is_timeout() {
        return AttemptFailure::Timeout;
    }
    AttemptFailure::Transport {
        retryable: is_retryable_error(error) == RetryDecision::Retry,
        message: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine(endpoints: usize, retries: u32) -> FallbackMachine {
        FallbackMachine::new(endpoints, RetryConfig::new(retries, 10, 1000))
    }

    /// Upstream status of a `Fail` transition
    fn failed_with(transition: Transition) -> Option<u16> {
        match transition {
            Transition::Fail(err) => err.upstream_status(),
            _ => None,
        }
    }

    fn transport(retryable: bool) -> AttemptFailure {
        AttemptFailure::Transport {
            retryable,
            message: "connection reset".to_string(),
        }
    }

    #[test]
    fn test_auth_failure_advances_to_next_endpoint() {
        for code in FALLBACK_STATUSES {
            let mut m = machine(2, 2);
            assert_eq!(
                m.step(AttemptFailure::Status(code)),
                Transition::Advance {
                    recorded: WeatherError::upstream(code, "endpoint unavailable for credential")
                }
            );
            assert_eq!(m.state(), FetchState { endpoint_index: 1, attempt: 0 });
        }
    }

    #[test]
    fn test_auth_failure_on_last_endpoint_fails() {
        let mut m = machine(2, 2);
        m.step(AttemptFailure::Status(403));
        assert_eq!(failed_with(m.step(AttemptFailure::Status(401))), Some(401));
    }

    #[test]
    fn test_server_error_retries_then_fails_without_fallback() {
        let mut m = machine(2, 2);
        assert_eq!(
            m.step(AttemptFailure::Status(500)),
            Transition::RetrySame { delay: Duration::from_millis(10) }
        );
        assert_eq!(
            m.step(AttemptFailure::Status(500)),
            Transition::RetrySame { delay: Duration::from_millis(20) }
        );
        assert_eq!(m.state(), FetchState { endpoint_index: 0, attempt: 2 });

        assert_eq!(failed_with(m.step(AttemptFailure::Status(500))), Some(500));
    }

    #[test]
    fn test_other_client_error_fails_immediately() {
        let mut m = machine(2, 2);
        assert_eq!(failed_with(m.step(AttemptFailure::Status(400))), Some(400));
    }

    #[test]
    fn test_rate_limit_is_retried() {
        let mut m = machine(1, 1);
        assert!(matches!(
            m.step(AttemptFailure::Status(429)),
            Transition::RetrySame { .. }
        ));
        assert!(matches!(
            m.step(AttemptFailure::Status(429)),
            Transition::Fail(WeatherError::UpstreamService { status_code: 429, .. })
        ));
    }

    #[test]
    fn test_timeout_retries_then_advances_then_fails() {
        let mut m = machine(2, 1);
        assert!(matches!(m.step(AttemptFailure::Timeout), Transition::RetrySame { .. }));
        assert_eq!(
            m.step(AttemptFailure::Timeout),
            Transition::Advance { recorded: WeatherError::UpstreamTimeout }
        );
        assert!(matches!(m.step(AttemptFailure::Timeout), Transition::RetrySame { .. }));
        assert_eq!(
            m.step(AttemptFailure::Timeout),
            Transition::Fail(WeatherError::UpstreamTimeout)
        );
    }

    #[test]
    fn test_transport_error_advances_with_503() {
        let mut m = machine(2, 0);
        assert!(matches!(
            m.step(transport(true)),
            Transition::Advance { recorded: WeatherError::UpstreamService { status_code: 503, .. } }
        ));
    }

    #[test]
    fn test_non_retryable_transport_error_skips_retries() {
        let mut m = machine(1, 3);
        assert!(matches!(
            m.step(transport(false)),
            Transition::Fail(WeatherError::UpstreamService { status_code: 503, .. })
        ));
    }

    #[test]
    fn test_single_endpoint_timeout_fails_with_timeout() {
        let mut m = machine(1, 0);
        assert_eq!(
            m.step(AttemptFailure::Timeout),
            Transition::Fail(WeatherError::UpstreamTimeout)
        );
    }

    #[test]
    fn test_retry_budget_resets_on_new_endpoint() {
        let mut m = machine(2, 1);
        m.step(AttemptFailure::Status(502));
        m.step(transport(true));
        assert_eq!(m.state(), FetchState { endpoint_index: 1, attempt: 0 });
        assert!(matches!(m.step(AttemptFailure::Status(503)), Transition::RetrySame { .. }));
    }
}
