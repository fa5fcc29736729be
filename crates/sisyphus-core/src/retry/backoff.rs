//! Backoff ceilings and full-jitter sampling.

use rand::Rng;
use std::time::Duration;

/// Sequence of backoff ceilings for one retry run.
///
/// Yields `initial`, then doubles on every step, capped at `max`. Doubling
/// that would overflow `Duration` saturates at `max` as well. The sequence
/// never ends; the caller decides when to stop pulling from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    current: Duration,
    max: Duration,
}

impl Backoff {
    /// `initial` must not exceed `max`; `Retrier` guarantees this.
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            current: initial.min(max),
            max,
        }
    }

    /// Ceiling that the next call to `next` will return.
    pub fn peek(&self) -> Duration {
        self.current
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let ceiling = self.current;
        self.current = match ceiling.checked_mul(2) {
            Some(doubled) if doubled <= self.max => doubled,
            _ => self.max,
        };
        Some(ceiling)
    }
}

/// Wait drawn uniformly from `[0, ceiling)` using the thread-local RNG.
/// A zero ceiling yields a zero wait.
pub fn jitter(ceiling: Duration) -> Duration {
    jitter_with(&mut rand::thread_rng(), ceiling)
}

/// Like [`jitter`], sampling from `rng`.
pub fn jitter_with<R: Rng + ?Sized>(rng: &mut R, ceiling: Duration) -> Duration {
    let nanos = ceiling.as_nanos();
    if nanos == 0 {
        return Duration::ZERO;
    }
    duration_from_nanos(rng.gen_range(0..nanos))
}

/// Resolution of the tokio timer: every sleep is rounded up to a whole tick.
pub const TIMER_TICK: Duration = Duration::from_millis(1);

/// Wait drawn uniformly from `[0, ceiling)` in whole [`TIMER_TICK`]s.
///
/// A sleep of `k` ticks lasts less than `k + 1` ticks after rounding, so the
/// observed wait stays below `ceiling`. Ceilings shorter than one tick wait
/// zero.
pub fn timer_jitter(ceiling: Duration) -> Duration {
    timer_jitter_with(&mut rand::thread_rng(), ceiling)
}

/// Like [`timer_jitter`], sampling from `rng`.
pub fn timer_jitter_with<R: Rng + ?Sized>(rng: &mut R, ceiling: Duration) -> Duration {
    let tick = TIMER_TICK.as_nanos();
    let ticks = ceiling.as_nanos() / tick;
    if ticks == 0 {
        return Duration::ZERO;
    }
    duration_from_nanos(rng.gen_range(0..ticks) * tick)
}

/// Callers pass values below some `Duration::as_nanos()`, so the seconds fit.
fn duration_from_nanos(nanos: u128) -> Duration {
    Duration::new(
        (nanos / 1_000_000_000) as u64,
        (nanos % 1_000_000_000) as u32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn ceilings_double_then_cap() {
        let seq: Vec<_> = Backoff::new(Duration::from_millis(1), Duration::from_millis(30))
            .take(8)
            .map(|d| d.as_millis())
            .collect();
        assert_eq!(seq, vec![1, 2, 4, 8, 16, 30, 30, 30]);
    }

    #[test]
    fn equal_bounds_stay_flat() {
        let mut b = Backoff::new(Duration::from_secs(5), Duration::from_secs(5));
        assert_eq!(b.next(), Some(Duration::from_secs(5)));
        assert_eq!(b.next(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn overflow_saturates_at_max() {
        let huge = Duration::MAX - Duration::from_secs(1);
        let mut b = Backoff::new(huge, Duration::MAX);
        assert_eq!(b.next(), Some(huge));
        assert_eq!(b.next(), Some(Duration::MAX));
        assert_eq!(b.next(), Some(Duration::MAX));
    }

    #[test]
    fn peek_does_not_advance() {
        let mut b = Backoff::new(Duration::from_secs(1), Duration::from_secs(30));
        assert_eq!(b.peek(), Duration::from_secs(1));
        b.next();
        assert_eq!(b.peek(), Duration::from_secs(2));
    }

    #[test]
    fn jitter_stays_below_ceiling() {
        let mut rng = StdRng::seed_from_u64(7);
        for ceiling in [
            Duration::from_nanos(1),
            Duration::from_millis(3),
            Duration::from_secs(30),
            Duration::MAX,
        ] {
            for _ in 0..200 {
                assert!(jitter_with(&mut rng, ceiling) < ceiling);
            }
        }
    }

    #[test]
    fn jitter_of_one_nanosecond_is_zero() {
        assert_eq!(jitter(Duration::from_nanos(1)), Duration::ZERO);
    }

    #[test]
    fn zero_ceiling_means_no_wait() {
        assert_eq!(jitter(Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn timer_jitter_draws_whole_ticks_below_ceiling() {
        let mut rng = StdRng::seed_from_u64(3);
        let ceiling = Duration::from_micros(7_500);
        for _ in 0..500 {
            let wait = timer_jitter_with(&mut rng, ceiling);
            assert_eq!(wait.subsec_nanos() % 1_000_000, 0, "{:?} is not whole ticks", wait);
            assert!(wait + TIMER_TICK <= ceiling, "{:?} may round up past {:?}", wait, ceiling);
        }
    }

    #[test]
    fn timer_jitter_below_one_tick_is_zero() {
        assert_eq!(timer_jitter(Duration::from_micros(999)), Duration::ZERO);
        assert_eq!(timer_jitter(Duration::from_millis(1)), Duration::ZERO);
        assert_eq!(timer_jitter(Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn timer_jitter_handles_the_largest_ceiling() {
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..100 {
            assert!(timer_jitter_with(&mut rng, Duration::MAX) < Duration::MAX);
        }
    }

    #[test]
    fn jitter_spreads_over_the_whole_range() {
        let mut rng = StdRng::seed_from_u64(42);
        let ceiling = Duration::from_millis(100);
        let samples: Vec<_> = (0..1000).map(|_| jitter_with(&mut rng, ceiling)).collect();
        assert!(samples.iter().any(|d| *d < Duration::from_millis(10)));
        assert!(samples.iter().any(|d| *d > Duration::from_millis(90)));
    }
}
