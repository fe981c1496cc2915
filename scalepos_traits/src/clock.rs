use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Time source for the station: stamps weight samples and paces the poll loop.
///
/// The detector only compares instants it received from the same clock, so a
/// simulated clock can stand in for wall time in tests.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);

    /// Sleep until `deadline`; no-op when the deadline is not in the future.
    fn sleep_until(&self, deadline: Instant) {
        let remaining = deadline.saturating_duration_since(self.now());
        self.sleep(remaining);
    }

    /// Milliseconds elapsed since `epoch`, saturating at 0 on underflow.
    fn ms_since(&self, epoch: Instant) -> u64 {
        let dur = self.now().saturating_duration_since(epoch);
        dur.as_millis() as u64
    }
}

/// Wall-clock pacing via `Instant::now` and `thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        thread::sleep(d);
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    #[inline]
    fn now(&self) -> Instant {
        (**self).now()
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        (**self).sleep(d)
    }
}

#[cfg(any(test, feature = "test-clock"))]
pub mod test_clock {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Clock that only moves when told to. `sleep` advances it instantly, so a
    /// loop paced by this clock runs as fast as the CPU allows. Clones share
    /// the same timeline.
    #[derive(Debug, Clone)]
    pub struct TestClock {
        origin: Instant,
        offset: Arc<Mutex<Duration>>,
    }

    impl Default for TestClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TestClock {
        pub fn new() -> Self {
            Self {
                origin: Instant::now(),
                offset: Arc::new(Mutex::new(Duration::ZERO)),
            }
        }

        /// Advance the clock by the given duration.
        pub fn advance(&self, d: Duration) {
            if let Ok(mut off) = self.offset.lock() {
                *off = off.saturating_add(d);
            }
        }

        /// Time elapsed since the clock was created.
        pub fn elapsed(&self) -> Duration {
            self.offset.lock().map(|g| *g).unwrap_or(Duration::ZERO)
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> Instant {
            self.origin + self.elapsed()
        }

        fn sleep(&self, d: Duration) {
            self.advance(d);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_clock::TestClock;
    use super::*;

    #[test]
    fn tick_deadline_moves_simulated_time() {
        let clock = TestClock::new();
        let start = clock.now();
        for tick in 1..=3u64 {
            clock.sleep_until(start + Duration::from_millis(100 * tick));
        }
        assert_eq!(clock.ms_since(start), 300);
    }

    #[test]
    fn clones_share_one_timeline() {
        let clock = TestClock::new();
        let shared = Arc::new(clock.clone());
        shared.sleep(Duration::from_millis(40));
        assert_eq!(clock.elapsed(), Duration::from_millis(40));
    }

    #[test]
    fn overrun_tick_does_not_rewind() {
        let clock = TestClock::new();
        let start = clock.now();
        clock.advance(Duration::from_millis(250));
        clock.sleep_until(start + Duration::from_millis(100));
        assert_eq!(clock.ms_since(start), 250);
    }
}
