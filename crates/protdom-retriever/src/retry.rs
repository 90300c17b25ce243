//! Retrying HTTP client
//!
//! Every remote call goes through [`RetryingClient::call`]: up to
//! `max_retries` attempts, sleeping `2^i` backoff units after failed attempt
//! `i` (no jitter). Failures are split into retryable ones (transport errors,
//! timeouts, 408, 429, 5xx) and fatal ones (malformed bodies, other 4xx),
//! which end the call immediately.

use crate::config::HttpConfig;
use protdom_common::{ProtDomError, Result};
use reqwest::{header, Client, StatusCode};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Attempt budget and backoff unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_unit: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff_unit: Duration) -> Self {
        Self {
            max_retries,
            backoff_unit,
        }
    }

    pub fn from_config(config: &HttpConfig) -> Self {
        Self::new(config.max_retries, config.backoff_unit())
    }

    /// Sleep after failed attempt `attempt` (0-indexed)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff_unit
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Outcome of a single failed attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptError {
    /// Worth another attempt
    Retryable { message: String, status: Option<u16> },
    /// Retrying cannot help
    Fatal { message: String, status: Option<u16> },
}

impl AttemptError {
    pub fn retryable(message: impl Into<String>) -> Self {
        Self::Retryable {
            message: message.into(),
            status: None,
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Fatal {
            message: message.into(),
            status: None,
        }
    }

    /// Classify a non-success HTTP status
    pub fn from_status(status: StatusCode) -> Self {
        let message = format!("HTTP {}", status);
        let code = Some(status.as_u16());
        if is_retryable_status(status) {
            Self::Retryable {
                message,
                status: code,
            }
        } else {
            Self::Fatal {
                message,
                status: code,
            }
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Retryable { message, .. } | Self::Fatal { message, .. } => message,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Retryable { status, .. } | Self::Fatal { status, .. } => *status,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable { .. })
    }
}

impl From<reqwest::Error> for AttemptError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            let mut classified = Self::from_status(status);
            if let Self::Retryable { message, .. } | Self::Fatal { message, .. } = &mut classified {
                *message = err.to_string();
            }
            return classified;
        }

        if err.is_decode() || err.is_builder() {
            Self::fatal(err.to_string())
        } else {
            Self::retryable(err.to_string())
        }
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
}

/// Turn a non-2xx response into an attempt error
fn check_status(response: reqwest::Response) -> std::result::Result<reqwest::Response, AttemptError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(AttemptError::from_status(status))
    }
}

fn decode_json<T: DeserializeOwned>(bytes: &[u8]) -> std::result::Result<T, AttemptError> {
    serde_json::from_slice(bytes)
        .map_err(|e| AttemptError::fatal(format!("Malformed response body: {}", e)))
}

/// One page of a text listing plus the target of its `Link: rel="next"` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextPage {
    pub body: String,
    pub next: Option<String>,
}

/// Response of a JSON request that may legitimately carry no body
#[derive(Debug)]
pub enum MaybeJson<T> {
    Body(T),
    NoContent,
}

/// HTTP client with bounded retries
#[derive(Debug, Clone)]
pub struct RetryingClient {
    http: Client,
    policy: RetryPolicy,
}

impl RetryingClient {
    /// Build the underlying HTTP client with the configured transport timeout
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| ProtDomError::api(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self::with_policy(http, RetryPolicy::from_config(config)))
    }

    pub fn with_policy(http: Client, policy: RetryPolicy) -> Self {
        Self { http, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Run `attempt` until it succeeds, fails fatally or the budget runs out.
    ///
    /// `operation` names the call in logs and in the final error.
    pub async fn call<T, F, Fut>(&self, operation: &str, mut attempt: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, AttemptError>>,
    {
        let max_attempts = self.policy.max_retries.max(1);
        let mut index = 0;

        loop {
            let number = index + 1;
            debug!(operation, attempt = number, max_attempts, "Attempting call");

            match attempt().await {
                Ok(value) => {
                    if index > 0 {
                        info!(operation, attempt = number, "Call succeeded after retry");
                    } else {
                        debug!(operation, attempt = number, "Call succeeded");
                    }
                    return Ok(value);
                },
                Err(AttemptError::Fatal { message, status }) => {
                    warn!(
                        operation,
                        attempt = number,
                        status,
                        error = %message,
                        "Call failed with non-retryable error"
                    );
                    return Err(api_error(format!("{}: {}", operation, message), status));
                },
                Err(AttemptError::Retryable { message, status }) => {
                    if number >= max_attempts {
                        warn!(
                            operation,
                            attempt = number,
                            status,
                            error = %message,
                            "Call failed, no attempts left"
                        );
                        return Err(api_error(
                            format!(
                                "{} failed after {} attempts: {}",
                                operation, max_attempts, message
                            ),
                            status,
                        ));
                    }

                    let delay = self.policy.delay_after(index);
                    warn!(
                        operation,
                        attempt = number,
                        max_attempts,
                        status,
                        delay_ms = delay.as_millis() as u64,
                        error = %message,
                        "Call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    index += 1;
                },
            }
        }
    }

    /// GET `url` and decode a JSON body
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        self.call(operation, move || async move {
            let response = self.http.get(url).query(query).send().await?;
            let bytes = check_status(response)?.bytes().await?;
            decode_json(&bytes)
        })
        .await
    }

    /// GET `url` and decode a JSON body; `204 No Content` is a valid answer
    pub async fn get_json_or_empty<T: DeserializeOwned>(
        &self,
        operation: &str,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<MaybeJson<T>> {
        self.call(operation, move || async move {
            let response = self.http.get(url).query(query).send().await?;
            if response.status() == StatusCode::NO_CONTENT {
                return Ok(MaybeJson::NoContent);
            }
            let bytes = check_status(response)?.bytes().await?;
            if bytes.iter().all(u8::is_ascii_whitespace) {
                return Ok(MaybeJson::NoContent);
            }
            decode_json(&bytes).map(MaybeJson::Body)
        })
        .await
    }

    /// GET one page of a text listing, extracting the next-page link
    pub async fn get_text_page(
        &self,
        operation: &str,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<TextPage> {
        self.call(operation, move || async move {
            let response = check_status(self.http.get(url).query(query).send().await?)?;
            let next = response
                .headers()
                .get_all(header::LINK)
                .iter()
                .filter_map(|value| value.to_str().ok())
                .find_map(parse_next_link);
            let body = response.text().await?;
            Ok::<_, AttemptError>(TextPage { body, next })
        })
        .await
    }

    /// GET raw bytes (structure files)
    pub async fn get_bytes(&self, operation: &str, url: &str) -> Result<Vec<u8>> {
        self.call(operation, move || async move {
            let response = check_status(self.http.get(url).send().await?)?;
            Ok::<_, AttemptError>(response.bytes().await?.to_vec())
        })
        .await
    }

    /// POST a form and decode a JSON body
    pub async fn post_form_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        url: &str,
        form: &[(&str, String)],
    ) -> Result<T> {
        self.call(operation, move || async move {
            let response = self.http.post(url).form(form).send().await?;
            let bytes = check_status(response)?.bytes().await?;
            decode_json(&bytes)
        })
        .await
    }
}

fn api_error(message: String, status: Option<u16>) -> ProtDomError {
    match status {
        Some(status) => ProtDomError::api_status(message, status),
        None => ProtDomError::api(message),
    }
}

/// Extract the `rel="next"` target from an RFC 8288 `Link` header value
pub fn parse_next_link(value: &str) -> Option<String> {
    let mut rest = value;

    while let Some(open) = rest.find('<') {
        let after_open = &rest[open + 1..];
        let close = after_open.find('>')?;
        let target = &after_open[..close];
        let params_and_rest = &after_open[close + 1..];
        let params_end = params_and_rest.find('<').unwrap_or(params_and_rest.len());
        let params = &params_and_rest[..params_end];

        let is_next = params.split(';').any(|param| {
            let param = param.trim().trim_end_matches(',').trim();
            param
                .strip_prefix("rel=")
                .map(|rel| {
                    rel.trim_matches('"')
                        .split_whitespace()
                        .any(|r| r.eq_ignore_ascii_case("next"))
                })
                .unwrap_or(false)
        });

        if is_next {
            return Some(target.to_string());
        }

        rest = &params_and_rest[params_end..];
    }

    None
}
