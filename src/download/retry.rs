//! Bounded retry with backoff for metadata and media requests.
//!
//! Each attempt ends in one of four ways:
//!
//! - 2xx: the response is returned as-is
//! - 429: [`FailureType::RateLimited`], wait `base * 2^(attempt-1)` and retry
//! - transport error: [`FailureType::Transient`], wait `base * attempt` and retry
//! - any other status: [`FailureType::Fatal`], fail immediately with
//!   [`FetchError::Http`]
//! - a request that cannot be built: fail immediately with
//!   [`FetchError::InvalidRequest`]
//!
//! Once `max_attempts` attempts have been made without success the fetch
//! fails with [`FetchError::MaxRetriesExceeded`]; no delay is taken after the
//! final attempt.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use vidfetch_core::download::{FailureType, RetryDecision, RetryPolicy};
//!
//! let policy = RetryPolicy::default();
//! match policy.should_retry(FailureType::RateLimited, 2) {
//!     RetryDecision::Retry { delay, attempt } => {
//!         assert_eq!(delay, Duration::from_secs(2));
//!         assert_eq!(attempt, 3);
//!     }
//!     RetryDecision::DoNotRetry { reason } => panic!("{reason}"),
//! }
//! ```

use std::time::Duration;

use tracing::{debug, info, instrument};

use super::constants::BACKOFF_BASE;
use super::error::{FetchError, TransportError, TransportErrorKind};
use super::transport::{FetchRequest, FetchResponse, Transport};

/// Default maximum attempts, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Classification of a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// HTTP 429. Retried with exponential backoff.
    RateLimited,

    /// No HTTP response (DNS failure, connection reset, timeout).
    /// Retried with linear backoff.
    Transient,

    /// Any other non-2xx status. Never retried.
    Fatal,
}

/// Decision on whether to make another attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which attempt number this will be (1-indexed, so first retry is attempt 2).
        attempt: u32,
    },

    /// Stop retrying.
    DoNotRetry {
        /// Human-readable reason.
        reason: String,
    },
}

/// Retry limits and backoff schedules.
///
/// # Default Values
///
/// - `max_attempts`: 3
/// - `rate_limit_base`: 1 second (delays 1s, 2s, 4s, ...)
/// - `transport_base`: 1 second (delays 1s, 2s, 3s, ...)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    max_attempts: u32,

    /// Base for the exponential schedule used after HTTP 429.
    rate_limit_base: Duration,

    /// Base for the linear schedule used after transport errors.
    transport_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            rate_limit_base: BACKOFF_BASE,
            transport_base: BACKOFF_BASE,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with custom settings. `max_attempts` is raised to at least 1.
    #[must_use]
    pub fn new(max_attempts: u32, rate_limit_base: Duration, transport_base: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            rate_limit_base,
            transport_base,
        }
    }

    /// Creates a policy with a custom `max_attempts`, using default delays.
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Returns the maximum number of attempts configured.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Determines whether to retry after `attempt` (1-indexed) failed.
    #[instrument(level = "trace", skip(self), fields(max_attempts = self.max_attempts))]
    pub fn should_retry(&self, failure_type: FailureType, attempt: u32) -> RetryDecision {
        if failure_type == FailureType::Fatal {
            return RetryDecision::DoNotRetry {
                reason: "fatal HTTP status - retry would not help".to_string(),
            };
        }

        if attempt >= self.max_attempts {
            debug!(attempt, max = self.max_attempts, "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }

        RetryDecision::Retry {
            delay: self.delay_for(failure_type, attempt),
            attempt: attempt + 1,
        }
    }

    /// Delay after `attempt` (1-indexed) failed with `failure_type`.
    fn delay_for(&self, failure_type: FailureType, attempt: u32) -> Duration {
        match failure_type {
            FailureType::RateLimited => {
                let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
                self.rate_limit_base.saturating_mul(factor)
            }
            FailureType::Transient => self.transport_base.saturating_mul(attempt),
            FailureType::Fatal => Duration::ZERO,
        }
    }
}

/// Classifies a non-2xx HTTP status.
#[must_use]
pub fn classify_status(status: u16) -> FailureType {
    if status == 429 {
        FailureType::RateLimited
    } else {
        FailureType::Fatal
    }
}

/// Sends `request` through `transport`, retrying rate limits and transport
/// errors according to `policy`.
///
/// Attempts are strictly sequential; backoff waits suspend only the calling task.
///
/// # Errors
///
/// - [`FetchError::Http`] on the first non-2xx, non-429 status
/// - [`FetchError::InvalidRequest`] when the request cannot be built
/// - [`FetchError::MaxRetriesExceeded`] once `policy.max_attempts()` attempts
///   have failed; carries the most recent transport error when there was one
#[instrument(skip(transport, request, policy), fields(url = %request.url()))]
pub async fn fetch_with_retry(
    transport: &dyn Transport,
    request: &FetchRequest,
    policy: &RetryPolicy,
) -> Result<FetchResponse, FetchError> {
    let mut attempt = 0u32;
    // Most recent transport failure; a later 429 does not clear it.
    let mut last_error: Option<TransportError> = None;

    loop {
        attempt += 1;
        debug!(attempt, "sending request");

        let failure_type = match transport.send(request).await {
            Ok(response) if response.is_success() => return Ok(response),
            Ok(response) => match classify_status(response.status) {
                FailureType::RateLimited => FailureType::RateLimited,
                _ => return Err(FetchError::http(request.url(), response.status)),
            },
            Err(e) if e.kind == TransportErrorKind::InvalidRequest => {
                return Err(FetchError::invalid_request(e));
            }
            Err(e) => {
                last_error = Some(e);
                FailureType::Transient
            }
        };

        match policy.should_retry(failure_type, attempt) {
            RetryDecision::Retry {
                delay,
                attempt: next_attempt,
            } => {
                info!(
                    attempt = next_attempt,
                    max_attempts = policy.max_attempts(),
                    delay_ms = delay.as_millis(),
                    rate_limited = failure_type == FailureType::RateLimited,
                    error = (failure_type == FailureType::Transient)
                        .then_some(last_error.as_ref())
                        .flatten()
                        .map(tracing::field::display),
                    "retrying request"
                );
                tokio::time::sleep(delay).await;
            }
            RetryDecision::DoNotRetry { reason } => {
                debug!(%reason, "not retrying request");
                return Err(FetchError::max_retries(request.url(), attempt, last_error));
            }
        }
    }
}
