//! 429 handling
//!
//! Box answers rate-limited requests with `429 Too Many Requests` and a
//! `Retry-After` header holding either a number of seconds or an HTTP date.
//! [`RetryPolicy`] decides how often the client retries and how long it waits.

use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use tracing::warn;

/// Wait used when the header is missing or unreadable
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(30);

/// Longest wait accepted from an HTTP-date header
const MAX_RETRY_AFTER: Duration = Duration::from_secs(3600);

/// Retry settings for rate-limited requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; 0 disables retrying
    pub max_retries: u32,
    /// Wait when the response carries no usable `Retry-After`
    pub default_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            default_delay: DEFAULT_RETRY_AFTER,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// How long to wait before retrying a 429 response with these headers
    pub fn delay_for(&self, headers: &HeaderMap) -> Duration {
        headers
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(|v| parse_retry_after(v, self.default_delay))
            .unwrap_or(self.default_delay)
    }
}

/// Parses a `Retry-After` value as delta-seconds or an RFC 2822 date
pub fn parse_retry_after(value: &str, default: Duration) -> Duration {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Duration::from_secs(seconds);
    }

    if let Ok(date) = chrono::DateTime::parse_from_rfc2822(value) {
        let wait = date.with_timezone(&chrono::Utc) - chrono::Utc::now();
        if let Ok(wait) = wait.to_std() {
            if wait <= MAX_RETRY_AFTER {
                return wait;
            }
        }
    }

    warn!(value, "Could not parse Retry-After header, using default");
    default
}
