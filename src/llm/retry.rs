//! Backoff helpers for rate-limited model endpoints.

use std::time::Duration;

/// Longest wait honoured from a `Retry-After` header or backoff.
const MAX_WAIT: Duration = Duration::from_secs(60);

/// Parse a `Retry-After` header given in seconds (capped at 60s).
pub fn parse_retry_after(header_value: Option<&str>) -> Option<Duration> {
    let value = header_value?;
    value
        .trim()
        .parse::<u64>()
        .ok()
        .map(|secs| Duration::from_secs(secs).min(MAX_WAIT))
}

/// Exponential backoff delay for a given attempt (capped at 60s).
pub fn backoff_delay(attempt: u32, base_ms: u64) -> Duration {
    let factor = 2u64.saturating_pow(attempt);
    Duration::from_millis(base_ms.saturating_mul(factor)).min(MAX_WAIT)
}

/// Whether an HTTP status is worth retrying.
pub fn is_retryable(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::SERVICE_UNAVAILABLE
}
