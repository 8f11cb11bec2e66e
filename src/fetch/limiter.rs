use std::time::{Duration, Instant};

use tokio::time::sleep;

/// Source of "now" for the rate gate.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Keeps consecutive provider fetches at least `min_interval` apart.
///
/// Owned by a single consume loop; sharing it between consumers would need a
/// mutex around it.
#[derive(Debug)]
pub struct RateLimiter<C: Clock = SystemClock> {
    min_interval: Duration,
    last_fetch: Option<Instant>,
    clock: C,
}

impl RateLimiter<SystemClock> {
    pub fn new(min_interval: Duration) -> Self {
        Self::with_clock(min_interval, SystemClock)
    }
}

impl<C: Clock> RateLimiter<C> {
    pub fn with_clock(min_interval: Duration, clock: C) -> Self {
        Self {
            min_interval,
            last_fetch: None,
            clock,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until the next fetch is allowed and record it. Returns the time spent waiting.
    pub async fn gate(&mut self) -> Duration {
        let mut waited = Duration::ZERO;

        if let Some(last) = self.last_fetch {
            let earliest = last + self.min_interval;
            let now = self.clock.now();
            if earliest > now {
                waited = earliest - now;
                log::debug!("Rate gate holding next fetch for {:?}", waited);
                sleep(waited).await;
            }
        }

        self.last_fetch = Some(self.clock.now());
        waited
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone)]
    struct ManualClock(Arc<Mutex<Instant>>);

    impl ManualClock {
        fn advance(&self, by: Duration) {
            *self.0.lock().unwrap() += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            *self.0.lock().unwrap()
        }
    }

    #[tokio::test]
    async fn consecutive_gates_are_spaced() {
        let interval = Duration::from_millis(80);
        let mut limiter = RateLimiter::new(interval);

        let mut completions = Vec::new();
        for _ in 0..3 {
            limiter.gate().await;
            completions.push(Instant::now());
        }

        for pair in completions.windows(2) {
            let gap = pair[1] - pair[0];
            assert!(gap >= interval, "gates only {:?} apart", gap);
        }
    }

    #[tokio::test]
    async fn first_gate_does_not_wait() {
        let mut limiter = RateLimiter::new(Duration::from_secs(60));
        assert_eq!(limiter.gate().await, Duration::ZERO);
    }

    #[tokio::test]
    async fn no_wait_once_interval_has_elapsed() {
        let clock = ManualClock(Arc::new(Mutex::new(Instant::now())));
        let mut limiter = RateLimiter::with_clock(Duration::from_secs(1), clock.clone());

        limiter.gate().await;
        clock.advance(Duration::from_secs(2));
        assert_eq!(limiter.gate().await, Duration::ZERO);

        clock.advance(Duration::from_millis(990));
        let waited = limiter.gate().await;
        assert_eq!(waited, Duration::from_millis(10));
    }
}
