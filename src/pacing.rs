//! Sleep-based request pacing.
//!
//! Every wait in the tool (page pauses, batch pauses, retry backoff) goes
//! through a [`Sleeper`], so the timing policy can be swapped without
//! touching the fetch or resolution logic.

use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Something that can suspend the current task for a while.
pub trait Sleeper: Clone {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// Real wall-clock sleeper backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}

/// Pauses for `delay` on every `every`-th call to [`Throttle::tick`].
#[derive(Debug, Clone)]
pub struct Throttle {
    every: usize,
    delay: Duration,
    calls: usize,
}

impl Throttle {
    pub fn new(every: usize, delay: Duration) -> Self {
        Self {
            every: every.max(1),
            delay,
            calls: 0,
        }
    }

    /// A throttle that pauses on every call.
    pub fn each(delay: Duration) -> Self {
        Self::new(1, delay)
    }

    /// Count one call and pause if it lands on the period.
    ///
    /// Returns whether a pause was taken.
    pub async fn tick<S: Sleeper>(&mut self, sleeper: &S) -> bool {
        self.calls += 1;

        if self.delay.is_zero() || self.calls % self.every != 0 {
            return false;
        }

        debug!(
            "Pacing: sleeping {}ms after {} calls",
            self.delay.as_millis(),
            self.calls
        );
        sleeper.sleep(self.delay).await;
        true
    }

    /// Number of calls counted so far.
    pub fn calls(&self) -> usize {
        self.calls
    }
}
