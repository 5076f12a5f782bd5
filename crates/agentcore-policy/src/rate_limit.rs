use std::time::{Duration, Instant};

use dashmap::DashMap;

const WINDOW: Duration = Duration::from_secs(60);

/// Sliding 60s call-count window per `(workspace_id, tool_name)`, pruned on
/// every access rather than by a background sweep. Grounded on
/// `policy_engine.py::_validate_rate_limit`'s `_rate_limit_cache`.
#[derive(Debug, Default)]
pub struct RateLimiter {
    calls: DashMap<String, Vec<Instant>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(workspace_id: &str, tool_name: &str) -> String {
        format!("{workspace_id}:{tool_name}")
    }

    /// Returns the number of calls within the window before this one is
    /// recorded, and whether it fits under `limit`. Recording only happens
    /// when the call is allowed, matching the source (a denied call is not
    /// counted against the caller).
    pub fn check_and_record(&self, workspace_id: &str, tool_name: &str, limit: u32) -> (u32, bool) {
        let key = Self::key(workspace_id, tool_name);
        let now = Instant::now();
        let mut entry = self.calls.entry(key).or_default();
        entry.retain(|ts| now.duration_since(*ts) < WINDOW);

        let recent = entry.len() as u32;
        if recent >= limit {
            return (recent, false);
        }
        entry.push(now);
        (recent, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_calls_under_the_limit() {
        let limiter = RateLimiter::new();
        for _ in 0..3 {
            let (_, allowed) = limiter.check_and_record("ws_1", "get_business_hours", 3);
            assert!(allowed);
        }
    }

    #[test]
    fn denies_once_limit_reached() {
        let limiter = RateLimiter::new();
        for _ in 0..3 {
            limiter.check_and_record("ws_1", "get_business_hours", 3);
        }
        let (recent, allowed) = limiter.check_and_record("ws_1", "get_business_hours", 3);
        assert_eq!(recent, 3);
        assert!(!allowed);
    }

    #[test]
    fn tracks_workspace_and_tool_independently() {
        let limiter = RateLimiter::new();
        limiter.check_and_record("ws_1", "get_business_hours", 1);
        let (_, allowed) = limiter.check_and_record("ws_2", "get_business_hours", 1);
        assert!(allowed);
    }
}
