use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;

const MAX_BACKOFF: Duration = Duration::from_secs(3);

/// Exponential backoff with full jitter, capped at 3s. Grounded on
/// `tool_broker.py`'s docstring ("Retry con exponential backoff + full
/// jitter (cap 3s)").
pub fn backoff_duration(attempt: u32, base_ms: u64) -> Duration {
    let exp_ms = base_ms.saturating_mul(1u64 << attempt.min(16));
    let capped_ms = exp_ms.min(MAX_BACKOFF.as_millis() as u64);
    let jittered = rand::thread_rng().gen_range(0..=capped_ms.max(1));
    Duration::from_millis(jittered)
}

/// Whether an HTTP status code should trigger a retry, assuming the tool
/// itself is retry-safe: 429, 408, and any 5xx. Other 4xx are logical
/// errors the caller should fix, not transient faults.
pub fn is_retryable_status(status: u16) -> bool {
    status == 429 || status == 408 || (500..600).contains(&status)
}

/// Parses a `Retry-After` header into a wait duration: either plain
/// seconds or an RFC 7231 HTTP date.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    if let Ok(seconds) = value.trim().parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    let target = DateTime::parse_from_rfc2822(value.trim()).ok()?.with_timezone(&Utc);
    let now = Utc::now();
    (target - now).to_std().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_never_exceeds_cap() {
        for attempt in 0..10 {
            let d = backoff_duration(attempt, 500);
            assert!(d <= MAX_BACKOFF);
        }
    }

    #[test]
    fn retryable_statuses() {
        assert!(is_retryable_status(429));
        assert!(is_retryable_status(408));
        assert!(is_retryable_status(500));
        assert!(is_retryable_status(503));
        assert!(!is_retryable_status(400));
        assert!(!is_retryable_status(404));
    }

    #[test]
    fn parses_seconds_retry_after() {
        let d = parse_retry_after("2").unwrap();
        assert_eq!(d, Duration::from_secs(2));
    }
}
