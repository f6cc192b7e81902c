//! Wall-clock access and tick alignment.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

/// Smallest multiple of `interval` since the Unix epoch strictly after `now`.
///
/// `next = (floor(now / interval) + 1) * interval`. Always computed from the
/// current time, never by adding a fixed delay to the previous tick, so slow
/// ticks cannot accumulate drift.
pub fn next_tick(now: DateTime<Utc>, interval: Duration) -> DateTime<Utc> {
    let step_ms = i64::try_from(interval.as_millis()).unwrap_or(i64::MAX).max(1);
    let next_ms = now
        .timestamp_millis()
        .div_euclid(step_ms)
        .saturating_add(1)
        .saturating_mul(step_ms);
    DateTime::from_timestamp_millis(next_ms).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Source of wall-clock time for the scheduler.
#[async_trait::async_trait]
pub trait Clock: Send + Sync + 'static {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;

    /// Suspend until `deadline`; returns immediately if it already passed.
    async fn sleep_until(&self, deadline: DateTime<Utc>);
}

/// The system clock, sleeping on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait::async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep_until(&self, deadline: DateTime<Utc>) {
        // Sleep for the remaining gap to the boundary, not a fixed delay
        let wait = (deadline - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        tokio::time::sleep(wait).await;
    }
}

/// Clock that only moves when told to.
///
/// `sleep_until` jumps straight to the deadline, so long schedules run
/// instantly in tests and simulations.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Create a clock reading `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let by = TimeDelta::from_std(by).unwrap_or(TimeDelta::MAX);
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now = now.checked_add_signed(by).unwrap_or(DateTime::<Utc>::MAX_UTC);
    }

    /// Set the clock to `to` (may move backwards).
    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = to;
    }
}

#[async_trait::async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn sleep_until(&self, deadline: DateTime<Utc>) {
        {
            let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
            if deadline > *now {
                *now = deadline;
            }
        }
        tokio::task::yield_now().await;
    }
}

#[async_trait::async_trait]
impl<C: Clock> Clock for Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }

    async fn sleep_until(&self, deadline: DateTime<Utc>) {
        (**self).sleep_until(deadline).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at_ms(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    #[test]
    fn test_next_tick_rounds_up() {
        let ten = Duration::from_secs(10);
        assert_eq!(next_tick(at_ms(3_000), ten), at_ms(10_000));
        assert_eq!(next_tick(at_ms(9_999), ten), at_ms(10_000));
        assert_eq!(next_tick(at_ms(10_001), ten), at_ms(20_000));
    }

    #[test]
    fn test_next_tick_is_strictly_after_boundary() {
        let ten = Duration::from_secs(10);
        assert_eq!(next_tick(at_ms(10_000), ten), at_ms(20_000));
        assert_eq!(next_tick(at_ms(0), ten), at_ms(10_000));
    }

    #[test]
    fn test_next_tick_aligned_to_epoch() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 34, 56).unwrap();
        let next = next_tick(now, Duration::from_secs(60));
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 5, 1, 12, 35, 0).unwrap());

        let next = next_tick(now, Duration::from_secs(7));
        assert_eq!(next.timestamp() % 7, 0);
        assert!(next > now && next - now <= TimeDelta::seconds(7));
    }

    #[test]
    fn test_next_tick_sequence_matches_formula() {
        let interval = Duration::from_secs(10);
        let t0 = at_ms(123_456);
        let mut tick = next_tick(t0, interval);
        for k in 1..=20 {
            let expected = (123_456_i64.div_euclid(10_000) + k) * 10_000;
            assert_eq!(tick, at_ms(expected));
            tick = next_tick(tick, interval);
        }
    }

    #[tokio::test]
    async fn test_manual_clock_sleep_jumps_forward() {
        let clock = ManualClock::new(at_ms(1_000));
        clock.sleep_until(at_ms(10_000)).await;
        assert_eq!(clock.now(), at_ms(10_000));

        // Deadlines in the past leave the clock alone
        clock.sleep_until(at_ms(5_000)).await;
        assert_eq!(clock.now(), at_ms(10_000));

        clock.advance(Duration::from_millis(250));
        assert_eq!(clock.now(), at_ms(10_250));
    }

    #[tokio::test]
    async fn test_system_clock_past_deadline_returns() {
        let clock = SystemClock;
        let past = clock.now() - TimeDelta::seconds(5);
        tokio::time::timeout(Duration::from_secs(1), clock.sleep_until(past))
            .await
            .unwrap();
    }
}
