// src/watch/debounce.rs

use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

/// Trailing, single-slot debouncer.
///
/// Semantics:
/// - [`schedule`](Self::schedule) records `args` and (re)starts the delay.
///   Anything already pending is replaced.
/// - Once the delay elapses with no further `schedule`, the owner collects the
///   *last* args via [`take_due`](Self::take_due).
/// - [`cancel`](Self::cancel) discards the pending call.
///
/// The debouncer holds no timer of its own; the owning event loop sleeps until
/// [`deadline`](Self::deadline) and then calls `take_due`. That keeps the
/// firing on the same task as every other piece of watcher work.
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<Pending<T>>,
}

#[derive(Debug)]
struct Pending<T> {
    deadline: Instant,
    args: T,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// When the pending call becomes due, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    /// Record a call, replacing any pending one. Returns true if a pending
    /// call was superseded.
    pub fn schedule(&mut self, args: T, now: Instant) -> bool {
        let superseded = self.pending.is_some();
        if superseded {
            trace!(delay_ms = self.delay.as_millis() as u64, "debounce window restarted");
        }
        self.pending = Some(Pending {
            deadline: now + self.delay,
            args,
        });
        superseded
    }

    /// Drop the pending call without running it.
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|p| p.args)
    }

    /// Take the pending args if their deadline has passed.
    pub fn take_due(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some(p) if p.deadline <= now => self.pending.take().map(|p| p.args),
            _ => None,
        }
    }
}

/// Sleep until `deadline`, or forever when there is none.
///
/// Used as a `tokio::select!` branch next to the event channel.
pub async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const DELAY: Duration = Duration::from_millis(100);

    #[test]
    fn nothing_fires_before_the_delay() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(DELAY);
        d.schedule("a", t0);

        assert_eq!(d.take_due(t0 + Duration::from_millis(99)), None);
        assert_eq!(d.take_due(t0 + DELAY), Some("a"));
        assert!(!d.is_pending());
    }

    #[test]
    fn reschedule_restarts_window_and_keeps_last_args() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(DELAY);
        assert!(!d.schedule("J", t0));
        assert!(d.schedule("Jo", t0 + Duration::from_millis(50)));
        assert!(d.schedule("John", t0 + Duration::from_millis(100)));

        assert_eq!(d.take_due(t0 + Duration::from_millis(150)), None);
        assert_eq!(d.deadline(), Some(t0 + Duration::from_millis(200)));
        assert_eq!(d.take_due(t0 + Duration::from_millis(200)), Some("John"));
    }

    #[test]
    fn cancel_discards_pending_call() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(DELAY);
        d.schedule(1, t0);

        assert_eq!(d.cancel(), Some(1));
        assert_eq!(d.take_due(t0 + DELAY * 2), None);
        assert_eq!(d.deadline(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn sleep_until_deadline_wakes_at_deadline() {
        let t0 = Instant::now();
        sleep_until_deadline(Some(t0 + DELAY)).await;
        assert_eq!(Instant::now() - t0, DELAY);
    }

    proptest! {
        // Any burst of schedules whose gaps are all shorter than the delay
        // collapses into one call carrying the last args.
        #[test]
        fn burst_collapses_to_last(gaps in proptest::collection::vec(0u64..100, 1..20)) {
            let t0 = Instant::now();
            let mut d = Debouncer::new(DELAY);
            let mut now = t0;
            let mut fired = Vec::new();

            for (i, gap) in gaps.iter().enumerate() {
                now += Duration::from_millis(*gap);
                if let Some(v) = d.take_due(now) {
                    fired.push(v);
                }
                d.schedule(i, now);
            }
            if let Some(v) = d.take_due(now + DELAY) {
                fired.push(v);
            }

            prop_assert_eq!(fired, vec![gaps.len() - 1]);
        }
    }
}
