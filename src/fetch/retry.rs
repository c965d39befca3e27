use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::StatusCode;

/// Longest wait a server's `Retry-After` can impose.
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(120);

/// Exponential backoff for transient API failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_backoff: Duration::from_millis(750),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.initial_backoff.saturating_mul(1 << exponent)
    }

    /// Rate limiting and server errors are worth another try.
    pub fn should_retry(status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    }

    /// Delay before retry `attempt`, preferring the server's `Retry-After`
    /// (seconds or an HTTP date) when it can be read. The header never asks
    /// for more than [`MAX_RETRY_AFTER`].
    pub fn delay(&self, attempt: u32, retry_after: Option<&str>, now: DateTime<Utc>) -> Duration {
        retry_after
            .and_then(|value| parse_retry_after(value, now))
            .map(|delay| delay.min(MAX_RETRY_AFTER))
            .unwrap_or_else(|| self.backoff(attempt))
    }
}

fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<f64>() {
        return Duration::try_from_secs_f64(seconds).ok();
    }

    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some((at - now).to_std().unwrap_or(Duration::ZERO))
}
