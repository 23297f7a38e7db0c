use std::fmt;
use std::num::NonZeroU32;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use governor::clock::{Clock, DefaultClock};
use governor::{DefaultDirectRateLimiter, Quota};
use tracing::debug;

/// Default cooldown after the provider signals a rate limit
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(60);

/// Request spacing plus cooldown gate for one provider.
///
/// Spacing is a one-request quota per `min_interval`; a zero interval means
/// no spacing. The cooldown window is separate state entered by [`trip`].
///
/// [`trip`]: RateLimiter::trip
pub struct RateLimiter {
    min_interval: Duration,
    cooldown: Duration,
    spacing: Option<DefaultDirectRateLimiter>,
    clock: DefaultClock,
    cooling_until: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration, cooldown: Duration) -> Self {
        let spacing = Quota::with_period(min_interval)
            .map(|quota| DefaultDirectRateLimiter::direct(quota.allow_burst(NonZeroU32::MIN)));
        Self {
            min_interval,
            cooldown,
            spacing,
            clock: DefaultClock::default(),
            cooling_until: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Block until the quota allows another request, then take it
    pub fn wait(&self) {
        let Some(spacing) = &self.spacing else {
            return;
        };

        while let Err(not_until) = spacing.check() {
            let wait_time = not_until.wait_time_from(self.clock.now());
            debug!("Rate limiting: waiting {:?}", wait_time);
            std::thread::sleep(wait_time);
        }
    }

    /// Enter the cooldown window
    pub fn trip(&self) {
        let mut cooling_until = self
            .cooling_until
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *cooling_until = Some(Instant::now() + self.cooldown);
    }

    /// Time left in the cooldown window, if any
    pub fn cooldown_remaining(&self) -> Option<Duration> {
        let mut cooling_until = self
            .cooling_until
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let until = (*cooling_until)?;
        let now = Instant::now();
        if now < until {
            Some(until - now)
        } else {
            *cooling_until = None;
            None
        }
    }

    pub fn is_cooling_down(&self) -> bool {
        self.cooldown_remaining().is_some()
    }
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("min_interval", &self.min_interval)
            .field("cooldown", &self.cooldown)
            .field("cooling_down", &self.is_cooling_down())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_enforces_interval() {
        let limiter = RateLimiter::new(Duration::from_millis(50), DEFAULT_COOLDOWN);
        let start = Instant::now();
        limiter.wait();
        limiter.wait();
        assert!(start.elapsed() >= Duration::from_millis(45));
    }

    #[test]
    fn test_first_wait_does_not_block() {
        let limiter = RateLimiter::new(Duration::from_secs(5), DEFAULT_COOLDOWN);
        let start = Instant::now();
        limiter.wait();
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_zero_interval_never_blocks() {
        let limiter = RateLimiter::new(Duration::ZERO, DEFAULT_COOLDOWN);
        let start = Instant::now();
        for _ in 0..100 {
            limiter.wait();
        }
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_spacing_holds_across_threads() {
        let limiter = RateLimiter::new(Duration::from_millis(30), DEFAULT_COOLDOWN);
        let start = Instant::now();
        std::thread::scope(|scope| {
            for _ in 0..3 {
                scope.spawn(|| limiter.wait());
            }
        });
        // First request is free, the other two each wait one interval
        assert!(start.elapsed() >= Duration::from_millis(55));
    }

    #[test]
    fn test_cooldown_expires() {
        let limiter = RateLimiter::new(Duration::ZERO, Duration::from_millis(20));
        assert!(!limiter.is_cooling_down());

        limiter.trip();
        assert!(limiter.is_cooling_down());

        std::thread::sleep(Duration::from_millis(30));
        assert!(!limiter.is_cooling_down());
    }
}
