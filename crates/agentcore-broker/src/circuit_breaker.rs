use std::collections::VecDeque;
use std::time::{Duration, Instant};

use dashmap::DashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Closed,
    Open,
    HalfOpen,
}

struct BreakerEntry {
    state: State,
    failures: VecDeque<Instant>,
    opened_at: Option<Instant>,
    half_open_calls: u32,
}

impl BreakerEntry {
    fn new() -> Self {
        Self {
            state: State::Closed,
            failures: VecDeque::new(),
            opened_at: None,
            half_open_calls: 0,
        }
    }
}

/// Per-`(workspace_id, tool)` CLOSED/OPEN/HALF_OPEN breaker. State
/// transitions are checked lazily on `is_open()` access rather than by a
/// background timer. Grounded on `tests/test_circuit_breaker.py`, whose
/// reason strings are part of the contract this mirrors verbatim.
pub struct CircuitBreaker {
    failure_threshold: u32,
    window: Duration,
    cooldown: Duration,
    half_open_max_calls: u32,
    entries: DashMap<(String, String), BreakerEntry>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, window_seconds: u64, cooldown_seconds: u64, half_open_max_calls: u32) -> Self {
        Self {
            failure_threshold,
            window: Duration::from_secs(window_seconds),
            cooldown: Duration::from_secs(cooldown_seconds),
            half_open_max_calls,
            entries: DashMap::new(),
        }
    }

    fn key(workspace_id: &str, tool: &str) -> (String, String) {
        (workspace_id.to_string(), tool.to_string())
    }

    /// Returns `(is_open, reason)`. An empty reason means the call is
    /// allowed to proceed; `is_open=false` while HALF_OPEN also means the
    /// call is a permitted test call.
    pub fn is_open(&self, workspace_id: &str, tool: &str) -> (bool, String) {
        let mut entry = self.entries.entry(Self::key(workspace_id, tool)).or_insert_with(BreakerEntry::new);
        let now = Instant::now();
        prune(&mut entry.failures, now, self.window);

        match entry.state {
            State::Closed => (false, String::new()),
            State::Open => {
                let elapsed = entry.opened_at.map(|t| now.duration_since(t)).unwrap_or_default();
                if elapsed >= self.cooldown {
                    entry.state = State::HalfOpen;
                    entry.half_open_calls = 0;
                    self.try_half_open_call(&mut entry)
                } else {
                    (
                        true,
                        format!(
                            "Circuit breaker OPEN ({} failures in window, cooldown {}s)",
                            entry.failures.len(),
                            self.cooldown.as_secs()
                        ),
                    )
                }
            }
            State::HalfOpen => self.try_half_open_call(&mut entry),
        }
    }

    fn try_half_open_call(&self, entry: &mut BreakerEntry) -> (bool, String) {
        if entry.half_open_calls >= self.half_open_max_calls {
            return (
                true,
                format!("Circuit breaker OPEN (HALF_OPEN, max {} test calls)", self.half_open_max_calls),
            );
        }
        entry.half_open_calls += 1;
        (false, String::new())
    }

    pub fn record_failure(&self, workspace_id: &str, tool: &str) {
        let mut entry = self.entries.entry(Self::key(workspace_id, tool)).or_insert_with(BreakerEntry::new);
        let now = Instant::now();

        if entry.state == State::HalfOpen {
            entry.state = State::Open;
            entry.opened_at = Some(now);
            entry.half_open_calls = 0;
            entry.failures.clear();
            entry.failures.push_back(now);
            return;
        }

        entry.failures.push_back(now);
        prune(&mut entry.failures, now, self.window);

        if entry.failures.len() as u32 >= self.failure_threshold {
            entry.state = State::Open;
            entry.opened_at = Some(now);
        }
    }

    pub fn record_success(&self, workspace_id: &str, tool: &str) {
        let mut entry = self.entries.entry(Self::key(workspace_id, tool)).or_insert_with(BreakerEntry::new);
        if entry.state == State::HalfOpen {
            entry.state = State::Closed;
            entry.opened_at = None;
            entry.half_open_calls = 0;
        }
        entry.failures.clear();
    }

    /// Admin override: force an OPEN breaker straight into HALF_OPEN
    /// without waiting for cooldown.
    pub fn force_half_open(&self, workspace_id: &str, tool: &str) {
        let mut entry = self.entries.entry(Self::key(workspace_id, tool)).or_insert_with(BreakerEntry::new);
        entry.state = State::HalfOpen;
        entry.half_open_calls = 0;
    }
}

fn prune(failures: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(front) = failures.front() {
        if now.duration_since(*front) >= window {
            failures.pop_front();
        } else {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_to_open_on_n_failures() {
        let cb = CircuitBreaker::new(3, 60, 30, 1);
        let (open, reason) = cb.is_open("ws1", "get_services");
        assert!(!open);
        assert_eq!(reason, "");

        cb.record_failure("ws1", "get_services");
        cb.record_failure("ws1", "get_services");
        let (open, _) = cb.is_open("ws1", "get_services");
        assert!(!open);

        cb.record_failure("ws1", "get_services");
        let (open, reason) = cb.is_open("ws1", "get_services");
        assert!(open);
        assert!(reason.contains("Circuit breaker OPEN"));
        assert!(reason.contains("30s"));
    }

    #[test]
    fn open_to_half_open_after_zero_cooldown() {
        let cb = CircuitBreaker::new(2, 60, 0, 1);
        cb.record_failure("ws1", "get_services");
        cb.record_failure("ws1", "get_services");
        let (open, _) = cb.is_open("ws1", "get_services");
        assert!(open);

        let (open, _) = cb.is_open("ws1", "get_services");
        assert!(!open);
    }

    #[test]
    fn half_open_success_closes() {
        let cb = CircuitBreaker::new(2, 60, 0, 1);
        cb.record_failure("ws1", "get_services");
        cb.record_failure("ws1", "get_services");
        cb.is_open("ws1", "get_services");

        cb.record_success("ws1", "get_services");
        let (open, reason) = cb.is_open("ws1", "get_services");
        assert!(!open);
        assert_eq!(reason, "");
    }

    #[test]
    fn half_open_failure_reopens() {
        let cb = CircuitBreaker::new(2, 60, 0, 1);
        cb.record_failure("ws1", "get_services");
        cb.record_failure("ws1", "get_services");
        cb.is_open("ws1", "get_services");

        cb.record_failure("ws1", "get_services");
        let (open, reason) = cb.is_open("ws1", "get_services");
        assert!(open);
        assert!(reason.contains("Circuit breaker OPEN"));
    }

    #[test]
    fn half_open_respects_max_calls() {
        let cb = CircuitBreaker::new(2, 60, 0, 1);
        cb.record_failure("ws1", "get_services");
        cb.record_failure("ws1", "get_services");

        let (open, _) = cb.is_open("ws1", "get_services");
        assert!(!open);

        let (open, reason) = cb.is_open("ws1", "get_services");
        assert!(open);
        assert!(reason.contains("max 1 test calls"));
    }

    #[test]
    fn sliding_window_ignores_old_failures() {
        let cb = CircuitBreaker::new(3, 1, 30, 1);
        cb.record_failure("ws1", "get_services");
        cb.record_failure("ws1", "get_services");
        std::thread::sleep(Duration::from_millis(1100));
        cb.record_failure("ws1", "get_services");
        let (open, _) = cb.is_open("ws1", "get_services");
        assert!(!open);
    }

    #[test]
    fn isolated_per_workspace_and_tool() {
        let cb = CircuitBreaker::new(2, 60, 0, 1);
        cb.record_failure("ws1", "tool1");
        cb.record_failure("ws1", "tool1");
        let (open, _) = cb.is_open("ws1", "tool1");
        assert!(open);

        let (open, _) = cb.is_open("ws1", "tool2");
        assert!(!open);
        let (open, _) = cb.is_open("ws2", "tool1");
        assert!(!open);
    }

    #[test]
    fn force_half_open_bypasses_cooldown() {
        let cb = CircuitBreaker::new(2, 60, 30, 1);
        cb.record_failure("ws1", "get_services");
        cb.record_failure("ws1", "get_services");
        let (open, _) = cb.is_open("ws1", "get_services");
        assert!(open);

        cb.force_half_open("ws1", "get_services");
        let (open, _) = cb.is_open("ws1", "get_services");
        assert!(!open);
    }

    #[test]
    fn multiple_rapid_failures_reports_count() {
        let cb = CircuitBreaker::new(5, 60, 0, 1);
        for _ in 0..10 {
            cb.record_failure("ws1", "batch_process");
        }
        let (open, reason) = cb.is_open("ws1", "batch_process");
        assert!(open);
        assert!(reason.contains("10 failures"));
    }
}
