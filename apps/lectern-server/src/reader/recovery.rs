//! Bounded recovery for speech engine failures

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

/// Sliding-window failure budget
///
/// The N-th failure inside `window` may be recovered iff `N <= max_recoveries`.
#[derive(Debug)]
pub struct RecoveryPolicy {
    max_recoveries: usize,
    window: Duration,
    failures: VecDeque<Instant>,
}

impl RecoveryPolicy {
    pub fn new(max_recoveries: usize, window: Duration) -> Self {
        Self {
            max_recoveries,
            window,
            failures: VecDeque::new(),
        }
    }

    /// Record a failure at `now`; returns whether a recovery attempt is allowed
    pub fn record_failure(&mut self, now: Instant) -> bool {
        while let Some(&oldest) = self.failures.front() {
            if now.saturating_duration_since(oldest) >= self.window {
                self.failures.pop_front();
            } else {
                break;
            }
        }
        self.failures.push_back(now);
        self.failures.len() <= self.max_recoveries
    }

    /// Failures currently inside the window
    pub fn recent_failures(&self) -> usize {
        self.failures.len()
    }
}
