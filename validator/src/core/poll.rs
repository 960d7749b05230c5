//! Bounded polling: retry a probe at a fixed interval until it yields or attempts run out.

use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollPolicy {
    /// Upper bound on time spent sleeping between attempts.
    pub fn max_wait(&self) -> Duration {
        self.interval * self.max_attempts.saturating_sub(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    Ready { value: T, attempts: u32 },
    TimedOut { attempts: u32 },
}

/// Call `probe` (with the 1-based attempt number) until it returns `Some`.
///
/// Sleeps `interval` between attempts, never after the last one.
pub fn wait_until<T, F>(policy: PollPolicy, mut probe: F) -> PollOutcome<T>
where
    F: FnMut(u32) -> Option<T>,
{
    for attempt in 1..=policy.max_attempts {
        if let Some(value) = probe(attempt) {
            return PollOutcome::Ready {
                value,
                attempts: attempt,
            };
        }
        if attempt < policy.max_attempts {
            thread::sleep(policy.interval);
        }
    }
    PollOutcome::TimedOut {
        attempts: policy.max_attempts,
    }
}
