//! Randomized delay bounds and the cancellable single-shot timer used between
//! arming a trial and presenting its stimulus.

use std::time::Duration;

use rand::Rng;
use tokio::{
    task::JoinHandle,
    time::{Instant, sleep},
};
use uuid::Uuid;

/// Inclusive bounds for the randomized pre-stimulus delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    min: Duration,
    max: Duration,
}

impl DelayRange {
    /// Build a range, swapping the bounds when they are given in reverse.
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// Convenience constructor taking millisecond bounds.
    pub fn from_millis(min_ms: u64, max_ms: u64) -> Self {
        Self::new(Duration::from_millis(min_ms), Duration::from_millis(max_ms))
    }

    /// Lower bound of the range.
    pub fn min(&self) -> Duration {
        self.min
    }

    /// Upper bound of the range.
    pub fn max(&self) -> Duration {
        self.max
    }

    /// Draw a delay uniformly within the bounds at millisecond granularity.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let low = self.min.as_millis() as u64;
        let high = self.max.as_millis() as u64;
        Duration::from_millis(rng.random_range(low..=high))
    }

    /// Whether `delay` lies within the bounds.
    pub fn contains(&self, delay: Duration) -> bool {
        self.min <= delay && delay <= self.max
    }
}

impl Default for DelayRange {
    fn default() -> Self {
        Self::from_millis(1_000, 5_000)
    }
}

/// Identifies one arming of the timer so stale fires can be told apart from the
/// one the machine is currently waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArmToken {
    /// Session the trial belongs to.
    pub session: Uuid,
    /// Monotonic arm counter within the owning machine.
    pub seq: u32,
}

/// Holds at most one pending single-shot timer.
///
/// Scheduling replaces (and aborts) the previous timer; dropping the slot
/// aborts whatever is still pending so nothing fires into a disposed game.
#[derive(Debug, Default)]
pub struct TimerSlot {
    pending: Option<(ArmToken, JoinHandle<()>)>,
}

impl TimerSlot {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the timer: after `delay`, `fire` runs with the token and the instant
    /// the timer elapsed.
    pub fn schedule<F>(&mut self, token: ArmToken, delay: Duration, fire: F)
    where
        F: FnOnce(ArmToken, Instant) + Send + 'static,
    {
        self.cancel();
        let handle = tokio::spawn(async move {
            sleep(delay).await;
            fire(token, Instant::now());
        });
        self.pending = Some((token, handle));
    }

    /// Abort the pending timer, returning its token when one was armed.
    pub fn cancel(&mut self) -> Option<ArmToken> {
        self.pending.take().map(|(token, handle)| {
            handle.abort();
            token
        })
    }

    /// Forget the pending timer once its fire has been delivered.
    pub fn settle(&mut self, token: ArmToken) {
        if self.pending() == Some(token) {
            self.pending = None;
        }
    }

    /// Token of the currently pending timer, if any.
    pub fn pending(&self) -> Option<ArmToken> {
        self.pending.as_ref().map(|(token, _)| *token)
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn token(seq: u32) -> ArmToken {
        ArmToken {
            session: Uuid::nil(),
            seq,
        }
    }

    #[test]
    fn samples_stay_within_bounds() {
        let range = DelayRange::from_millis(1_000, 5_000);
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..500 {
            assert!(range.contains(range.sample(&mut rng)));
        }
    }

    #[test]
    fn reversed_bounds_are_swapped() {
        let range = DelayRange::from_millis(900, 300);
        assert_eq!(range.min(), Duration::from_millis(300));
        assert_eq!(range.max(), Duration::from_millis(900));
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_delay() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let mut slot = TimerSlot::new();
        let start = Instant::now();

        slot.schedule(token(1), Duration::from_millis(1_500), move |t, at| {
            assert_eq!(t.seq, 1);
            assert_eq!(at.duration_since(start), Duration::from_millis(1_500));
            counter.fetch_add(1, Ordering::SeqCst);
        });

        sleep(Duration::from_millis(1_499)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        sleep(Duration::from_millis(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_slot_aborts_pending_timer() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let mut slot = TimerSlot::new();
        slot.schedule(token(1), Duration::from_millis(100), move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        drop(slot);

        sleep(Duration::from_millis(500)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_replaces_previous_timer() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut slot = TimerSlot::new();

        let first = fired.clone();
        slot.schedule(token(1), Duration::from_millis(100), move |_, _| {
            first.fetch_add(1, Ordering::SeqCst);
        });
        let second = fired.clone();
        slot.schedule(token(2), Duration::from_millis(200), move |_, _| {
            second.fetch_add(10, Ordering::SeqCst);
        });
        assert_eq!(slot.pending(), Some(token(2)));

        sleep(Duration::from_millis(300)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 10);
    }
}
