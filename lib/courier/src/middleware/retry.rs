//! Bounded retry policy.
//!
//! One exchange makes at most `1 + max_retries` attempts. A retry is attempted
//! after a transport failure (connection, TLS, timeout) or a 5xx status, and
//! only after sleeping for the configured pause.

use std::time::Duration;

use tower::retry::Policy;
use tracing::debug;

use crate::{Error, Request, Response};

/// Retry policy for [`tower::retry::RetryLayer`].
///
/// Each request gets a fresh copy of the policy, so the retry budget is per exchange.
///
/// # Example
///
/// ```ignore
/// use courier::middleware::RetryPolicy;
/// use std::time::Duration;
/// use tower::retry::RetryLayer;
///
/// let layer = RetryLayer::new(RetryPolicy::new(1, Duration::from_millis(10)));
/// ```
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    remaining: u32,
    attempt: u32,
    pause: Duration,
}

impl RetryPolicy {
    /// Allow `max_retries` retries, sleeping `pause` before each one.
    #[must_use]
    pub const fn new(max_retries: u32, pause: Duration) -> Self {
        Self {
            remaining: max_retries,
            attempt: 1,
            pause,
        }
    }

    /// Returns `true` if the response should be retried.
    const fn should_retry_response(response: &Response) -> bool {
        response.status() >= 500
    }

    /// Returns `true` if the error should be retried.
    const fn should_retry_error(error: &Error) -> bool {
        matches!(error, Error::Connection(_) | Error::Tls(_) | Error::Timeout)
    }
}

impl Policy<Request, Response, Error> for RetryPolicy {
    type Future = tokio::time::Sleep;

    fn retry(
        &mut self,
        request: &mut Request,
        result: &mut Result<Response, Error>,
    ) -> Option<Self::Future> {
        if self.remaining == 0 {
            return None;
        }

        let reason = match result {
            Ok(response) if Self::should_retry_response(response) => {
                format!("status {}", response.status())
            }
            Err(error) if Self::should_retry_error(error) => error.to_string(),
            _ => return None,
        };

        self.remaining -= 1;
        self.attempt += 1;
        debug!(
            attempt = self.attempt,
            url = %request.url(),
            reason = %reason,
            pause_ms = u64::try_from(self.pause.as_millis()).unwrap_or(u64::MAX),
            "retrying outbound exchange"
        );
        Some(tokio::time::sleep(self.pause))
    }

    fn clone_request(&mut self, request: &Request) -> Option<Request> {
        Some(request.clone())
    }
}
