//! Shared HTTP request plumbing for gateway implementations.
//!
//! Providers keep full control over URL construction, headers and body; this
//! layer unifies sending, logging, transient-error classification and JSON
//! parsing so each gateway does not repeat it.

use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::ProviderError;

/// Maximum response body length echoed into debug logs.
const LOG_BODY_LIMIT: usize = 2048;

/// `Retry-After` values above this are treated as this, in seconds.
const RETRY_AFTER_CAP_SECS: u64 = 30;
const BACKOFF_BASE_MS: u64 = 100;
const BACKOFF_CAP_MS: u64 = 10_000;

fn truncate_for_log(body: &str) -> &str {
    if body.len() <= LOG_BODY_LIMIT {
        return body;
    }
    let mut end = LOG_BODY_LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

/// HTTP helper function set.
pub struct HttpUtils;

impl HttpUtils {
    /// Send a request and return `(status, body)`.
    ///
    /// Timeouts map to [`ProviderError::Timeout`], connection failures to
    /// [`ProviderError::NetworkError`]. HTTP 429 becomes
    /// [`ProviderError::RateLimited`] (honoring `Retry-After`), and
    /// 502–504 become retryable network errors.
    pub async fn execute_request(
        request: RequestBuilder,
        provider: &str,
        action: &str,
    ) -> Result<(u16, String), ProviderError> {
        log::debug!("[{provider}] {action}");

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout {
                    provider: provider.to_string(),
                    detail: e.to_string(),
                }
            } else {
                ProviderError::NetworkError {
                    provider: provider.to_string(),
                    detail: e.to_string(),
                }
            }
        })?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::NetworkError {
                provider: provider.to_string(),
                detail: format!("failed to read response body: {e}"),
            })?;

        match status {
            429 => {
                log::warn!("[{provider}] {action}: HTTP 429, retry_after={retry_after:?}");
                Err(ProviderError::RateLimited {
                    provider: provider.to_string(),
                    retry_after,
                    raw_message: Some(body),
                })
            }
            502..=504 => {
                log::warn!("[{provider}] {action}: HTTP {status}");
                Err(ProviderError::NetworkError {
                    provider: provider.to_string(),
                    detail: format!("HTTP {status}: {body}"),
                })
            }
            _ => {
                log::debug!(
                    "[{provider}] {action}: HTTP {status}, body {}",
                    truncate_for_log(&body)
                );
                Ok((status, body))
            }
        }
    }

    /// Parse a JSON body into `T`.
    pub fn parse_json<T>(body: &str, provider: &str) -> Result<T, ProviderError>
    where
        T: DeserializeOwned,
    {
        serde_json::from_str(body).map_err(|e| {
            log::error!("[{provider}] JSON parse failed: {e}");
            log::error!("[{provider}] raw response: {}", truncate_for_log(body));
            ProviderError::ParseError {
                provider: provider.to_string(),
                detail: e.to_string(),
            }
        })
    }

    /// Retrying variant for idempotent requests only.
    ///
    /// The request is rebuilt from `build_request` on every attempt, so this
    /// takes a builder closure rather than a one-shot request. Retryable
    /// errors (network, timeout, rate limit) back off and go again up to
    /// `max_retries` times; anything else surfaces immediately.
    pub async fn execute_request_with_retry<F>(
        build_request: F,
        provider: &str,
        action: &str,
        max_retries: u32,
    ) -> Result<(u16, String), ProviderError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0;
        loop {
            match Self::execute_request(build_request(), provider, action).await {
                Err(e) if e.is_retryable() && attempt < max_retries => {
                    let delay = retry_delay(&e, attempt);
                    log::warn!(
                        "[{provider}] {action} failed ({e}); retry {} of {max_retries} in {}ms",
                        attempt + 1,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

/// Delay before the next retry attempt.
fn retry_delay(error: &ProviderError, attempt: u32) -> Duration {
    match error {
        // the server told us when to come back
        ProviderError::RateLimited {
            retry_after: Some(secs),
            ..
        } => Duration::from_secs((*secs).min(RETRY_AFTER_CAP_SECS)),
        _ => backoff_delay(attempt),
    }
}

/// Exponential backoff: 100ms, 200ms, 400ms, ... capped at 10 seconds.
fn backoff_delay(attempt: u32) -> Duration {
    let exp = attempt.min(20); // keep the shift in range
    Duration::from_millis((BACKOFF_BASE_MS << exp).min(BACKOFF_CAP_MS))
}
