//! Delays and randomness used by the scheduler, behind traits so tests can replace them.

use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng as _, SeedableRng as _};

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Returns immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSleep;

#[async_trait]
impl Sleeper for NoSleep {
    async fn sleep(&self, _duration: Duration) {}
}

pub trait RandomSource: Send {
    /// Uniform index in `0..len`. `len` is never zero.
    fn index(&mut self, len: usize) -> usize;

    /// Uniform duration in `min..max`, or `min` when the window is empty.
    fn duration_between(&mut self, min: Duration, max: Duration) -> Duration;
}

#[derive(Debug)]
pub struct StdRandom(StdRng);

impl StdRandom {
    #[must_use]
    pub fn from_entropy() -> Self {
        Self(StdRng::from_entropy())
    }

    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl Default for StdRandom {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl RandomSource for StdRandom {
    fn index(&mut self, len: usize) -> usize {
        self.0.gen_range(0..len)
    }

    fn duration_between(&mut self, min: Duration, max: Duration) -> Duration {
        if max <= min {
            return min;
        }
        self.0.gen_range(min..max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_stay_inside_the_window() {
        let mut random = StdRandom::seeded(7);
        let (min, max) = (Duration::from_millis(5_000), Duration::from_millis(10_000));
        for _ in 0..1_000 {
            let d = random.duration_between(min, max);
            assert!(d >= min && d < max);
        }
    }

    #[test]
    fn empty_window_yields_its_lower_bound() {
        let mut random = StdRandom::seeded(7);
        let d = Duration::from_millis(250);
        assert_eq!(random.duration_between(d, d), d);
    }
}
