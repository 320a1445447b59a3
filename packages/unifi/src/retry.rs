//! Transparent retries around any [`Transport`]
//!
//! Controllers return 404 for API routes while the network application is still
//! starting, so the policy can treat 404 as transient in addition to the usual
//! connection failures, 429 and 5xx.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{Result, UnifiError};
use crate::transport::{HttpRequest, HttpResponse, Transport};

/// When and how long to wait before re-sending a request
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub min_backoff: Duration,
    /// Upper bound for any single delay
    pub max_backoff: Duration,
    /// Retry on 404
    pub retry_not_found: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            min_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            retry_not_found: true,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Whether a response status should be retried
    #[must_use]
    pub fn should_retry_status(&self, status: u16) -> bool {
        match status {
            404 => self.retry_not_found,
            429 => true,
            501 => false,
            500..=599 => true,
            _ => false,
        }
    }

    /// Exponential delay for the zero-based retry number, capped at `max_backoff`
    #[must_use]
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        self.min_backoff
            .checked_mul(factor)
            .map_or(self.max_backoff, |delay| delay.min(self.max_backoff))
    }
}

/// Wraps a transport and re-sends requests according to a [`RetryPolicy`]
///
/// When retries are exhausted the last response or error is returned unchanged,
/// so status-based error reporting above this layer still sees the real status.
#[derive(Debug, Clone)]
pub struct RetryingTransport<T> {
    inner: T,
    policy: RetryPolicy,
}

impl<T> RetryingTransport<T> {
    /// Wrap `inner` with `policy`
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    /// Active policy
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl<T: Transport> Transport for RetryingTransport<T> {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut retry = 0u32;
        loop {
            let outcome = self.inner.execute(request.clone()).await;

            let reason = match &outcome {
                Ok(response)
                    if self.policy.should_retry_status(response.status)
                        && (response.status != 404 || request.retry_not_found) =>
                {
                    format!("status {}", response.status)
                }
                Err(UnifiError::Network(e)) => e.clone(),
                _ => return outcome,
            };

            if retry >= self.policy.max_retries {
                debug!(
                    method = %request.method,
                    path = request.url.path(),
                    retries = retry,
                    "Giving up after retries"
                );
                return outcome;
            }

            let delay = self.policy.backoff(retry);
            warn!(
                method = %request.method,
                path = request.url.path(),
                attempt = retry + 1,
                reason = %reason,
                delay_ms = delay.as_millis() as u64,
                "Request failed, retrying"
            );
            tokio::time::sleep(delay).await;
            retry += 1;
        }
    }
}
