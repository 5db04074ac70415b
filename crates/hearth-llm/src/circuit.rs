//! Optional per-resource circuit breaker wrapping the retry policy
//! (spec.md §4.2). New logic; no direct teacher analogue, modeled after the
//! classic closed/open/half-open state machine.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Closed,
    Open { opened_at: Instant },
    HalfOpen,
}

/// Per-resource circuit breaker. `threshold` consecutive failures trip it
/// open for `reset_timeout`; it then allows one probe in `HalfOpen`, and
/// closes only after 2 consecutive successes.
pub struct CircuitBreaker {
    threshold: u32,
    reset_timeout: Duration,
    state: Mutex<Inner>,
}

struct Inner {
    state: State,
    consecutive_failures: u32,
    consecutive_successes: u32,
}

impl CircuitBreaker {
    /// Create a breaker that opens after `threshold` consecutive failures
    /// and stays open for `reset_timeout`.
    #[must_use]
    pub fn new(threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            threshold,
            reset_timeout,
            state: Mutex::new(Inner {
                state: State::Closed,
                consecutive_failures: 0,
                consecutive_successes: 0,
            }),
        }
    }

    /// Whether a call is currently allowed through. Transitions
    /// `Open -> HalfOpen` once `reset_timeout` has elapsed.
    pub fn allow(&self) -> bool {
        let mut inner = self.state.lock().unwrap();
        match inner.state {
            State::Closed | State::HalfOpen => true,
            State::Open { opened_at } => {
                if opened_at.elapsed() >= self.reset_timeout {
                    inner.state = State::HalfOpen;
                    inner.consecutive_successes = 0;
                    true
                } else {
                    false
                }
            },
        }
    }

    /// Record a successful call.
    pub fn record_success(&self) {
        let mut inner = self.state.lock().unwrap();
        inner.consecutive_failures = 0;
        match inner.state {
            State::Closed => {},
            State::HalfOpen => {
                inner.consecutive_successes += 1;
                if inner.consecutive_successes >= 2 {
                    inner.state = State::Closed;
                }
            },
            State::Open { .. } => {},
        }
    }

    /// Record a failed call, tripping the breaker open if `threshold`
    /// consecutive failures have now accumulated.
    pub fn record_failure(&self) {
        let mut inner = self.state.lock().unwrap();
        match inner.state {
            State::HalfOpen => {
                inner.state = State::Open {
                    opened_at: Instant::now(),
                };
                inner.consecutive_failures = 0;
                inner.consecutive_successes = 0;
            },
            State::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.threshold {
                    inner.state = State::Open {
                        opened_at: Instant::now(),
                    };
                    inner.consecutive_failures = 0;
                }
            },
            State::Open { .. } => {},
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_after_threshold_consecutive_failures() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(60));
        assert!(breaker.allow());
        breaker.record_failure();
        breaker.record_failure();
        assert!(breaker.allow());
        breaker.record_failure();
        assert!(!breaker.allow());
    }

    #[test]
    fn half_open_closes_after_two_consecutive_successes() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(0));
        breaker.record_failure();
        // reset_timeout is zero, so the next `allow()` moves to HalfOpen.
        assert!(breaker.allow());
        breaker.record_success();
        assert!(breaker.allow());
        breaker.record_success();
        assert!(breaker.allow());
    }

    #[test]
    fn half_open_failure_reopens_immediately() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(0));
        breaker.record_failure();
        assert!(breaker.allow());
        breaker.record_failure();
        assert!(!breaker.allow());
    }
}
