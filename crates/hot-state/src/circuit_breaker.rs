//! Hand-rolled circuit breaker guarding the hot-state client (§5).
//!
//! Sliding window of 60s, opens after 5 failures, resets to half-open after
//! 30s, closes again after one success. Deliberately not a crate dependency:
//! the teacher implements its own settlement-indexing circuit breaker by
//! hand rather than reaching for one, and this is the same shape of
//! problem (a handful of counters behind a mutex).
use std::{
    collections::VecDeque,
    sync::Mutex,
    time::{Duration, Instant},
};

const FAILURE_THRESHOLD: usize = 5;
const WINDOW: Duration = Duration::from_secs(60);
const RESET_AFTER: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Closed,
    Open,
    HalfOpen,
}

pub struct CircuitBreaker {
    state: Mutex<(State, Option<Instant>)>,
    failures: Mutex<VecDeque<Instant>>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self {
            state: Mutex::new((State::Closed, None)),
            failures: Mutex::new(VecDeque::new()),
        }
    }
}

impl CircuitBreaker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a call should be allowed through right now. A half-open
    /// breaker allows exactly the probing call; callers report its outcome
    /// via [`Self::record_success`]/[`Self::record_failure`].
    pub fn allow(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        match state.0 {
            State::Closed => true,
            State::HalfOpen => true,
            State::Open => {
                let opened_at = state.1.expect("open state always carries a timestamp");
                if opened_at.elapsed() >= RESET_AFTER {
                    *state = (State::HalfOpen, None);
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut state = self.state.lock().unwrap();
        *state = (State::Closed, None);
        self.failures.lock().unwrap().clear();
    }

    pub fn record_failure(&self) {
        let now = Instant::now();
        let mut failures = self.failures.lock().unwrap();
        failures.push_back(now);
        while let Some(&front) = failures.front() {
            if now.duration_since(front) > WINDOW {
                failures.pop_front();
            } else {
                break;
            }
        }
        let should_open = failures.len() >= FAILURE_THRESHOLD;
        drop(failures);

        let mut state = self.state.lock().unwrap();
        match state.0 {
            State::HalfOpen => *state = (State::Open, Some(now)),
            State::Closed if should_open => *state = (State::Open, Some(now)),
            _ => {}
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state.lock().unwrap().0, State::Open)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_after_threshold_failures() {
        let cb = CircuitBreaker::new();
        for _ in 0..FAILURE_THRESHOLD {
            assert!(cb.allow());
            cb.record_failure();
        }
        assert!(!cb.allow());
    }

    #[test]
    fn success_resets_failure_count() {
        let cb = CircuitBreaker::new();
        for _ in 0..FAILURE_THRESHOLD - 1 {
            cb.record_failure();
        }
        cb.record_success();
        cb.record_failure();
        assert!(cb.allow());
    }

    #[test]
    fn half_open_reopens_on_failure() {
        let cb = CircuitBreaker::new();
        for _ in 0..FAILURE_THRESHOLD {
            cb.record_failure();
        }
        assert!(!cb.allow());
        // Simulate reset window elapsed by forcing half-open directly via
        // the public API is not possible; this test documents the intent
        // that a real 30s wait would flip Open -> HalfOpen on next `allow`.
    }
}
