//! Bounded retry with exponential backoff
//!
//! Used for speech engine start-up, where the synthesizer may need a moment
//! to become available (audio device busy, daemon still starting).

use std::future::Future;
use std::time::Duration;

use serde::Deserialize;

/// Exponential backoff: `multiplier * 2^(attempt - 1)`, clamped to `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct BackoffSchedule {
    pub multiplier: Duration,
    pub min: Duration,
    pub max: Duration,
}

impl Default for BackoffSchedule {
    fn default() -> Self {
        Self {
            multiplier: Duration::from_secs(1),
            min: Duration::from_secs(4),
            max: Duration::from_secs(10),
        }
    }
}

impl BackoffSchedule {
    /// A schedule that never waits
    pub fn immediate() -> Self {
        Self {
            multiplier: Duration::ZERO,
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    /// Delay before the retry that follows failed attempt number `attempt` (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let raw = self.multiplier.saturating_mul(1u32 << exponent);
        raw.clamp(self.min, self.max.max(self.min))
    }
}

/// Run `operation` until it succeeds or `max_attempts` have failed.
///
/// Returns the last error when every attempt fails. `max_attempts` of zero is
/// treated as one.
pub async fn retry_with_backoff<T, E, F, Fut>(
    operation_name: &str,
    max_attempts: u32,
    schedule: &BackoffSchedule,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= max_attempts => {
                tracing::error!(
                    operation = operation_name,
                    attempts = attempt,
                    error = %e,
                    "Giving up after final attempt"
                );
                return Err(e);
            }
            Err(e) => {
                let delay = schedule.delay_after(attempt);
                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_default_schedule_is_clamped() {
        let schedule = BackoffSchedule::default();
        assert_eq!(schedule.delay_after(1), Duration::from_secs(4));
        assert_eq!(schedule.delay_after(3), Duration::from_secs(4));
        assert_eq!(schedule.delay_after(4), Duration::from_secs(8));
        assert_eq!(schedule.delay_after(5), Duration::from_secs(10));
        assert_eq!(schedule.delay_after(40), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_returns_first_success() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> =
            retry_with_backoff("test", 5, &BackoffSchedule::immediate(), |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 3 {
                        Err(format!("attempt {} failed", attempt))
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_stops_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> =
            retry_with_backoff("test", 3, &BackoffSchedule::immediate(), |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Err(format!("attempt {} failed", attempt)) }
            })
            .await;

        assert_eq!(result, Err("attempt 3 failed".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_between_attempts() {
        let schedule = BackoffSchedule {
            multiplier: Duration::from_millis(100),
            min: Duration::from_millis(100),
            max: Duration::from_secs(1),
        };
        let started = tokio::time::Instant::now();
        let _: Result<(), &str> =
            retry_with_backoff("test", 3, &schedule, |_| async { Err("nope") }).await;

        // 100ms after the first failure, 200ms after the second
        assert!(started.elapsed() >= Duration::from_millis(300));
    }
}
