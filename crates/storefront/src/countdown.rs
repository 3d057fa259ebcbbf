//! Live auction countdown.
//!
//! A [`CountdownTimer`] owns a background task that ticks a [`TimeLeft`]
//! once per second and publishes each value on a `watch` channel. The task
//! stops by itself at zero and is aborted when the timer is dropped, so a
//! closed product view never leaves a ticker behind.

use std::time::Duration;

use marketplace_core::TimeLeft;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};
use tracing::debug;

const TICK: Duration = Duration::from_secs(1);

/// Per-second countdown for one auction view.
#[derive(Debug)]
pub struct CountdownTimer {
    rx: watch::Receiver<TimeLeft>,
    task: Option<JoinHandle<()>>,
}

impl CountdownTimer {
    /// Start counting down from `initial`.
    ///
    /// Must be called from within a Tokio runtime. An already expired
    /// `initial` starts no task.
    #[must_use]
    pub fn start(initial: TimeLeft) -> Self {
        let (tx, rx) = watch::channel(initial);
        if initial.is_expired() {
            return Self { rx, task: None };
        }

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + TICK, TICK);
            let mut left = initial;
            while left.tick() {
                ticker.tick().await;
                tx.send_replace(left);
                if left.is_expired() {
                    debug!("Countdown reached zero");
                    break;
                }
            }
        });

        Self {
            rx,
            task: Some(task),
        }
    }

    /// The latest published value.
    #[must_use]
    pub fn current(&self) -> TimeLeft {
        *self.rx.borrow()
    }

    /// A receiver that sees every following tick. Its `changed()` fails once
    /// the countdown finishes or the timer is dropped.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<TimeLeft> {
        let mut rx = self.rx.clone();
        rx.mark_unchanged();
        rx
    }

    /// Whether the background task is still ticking.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop ticking. The last published value stays readable.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_counts_down_to_zero() {
        let timer = CountdownTimer::start(TimeLeft::new(0, 0, 0, 3));
        let mut rx = timer.subscribe();

        let mut seen = Vec::new();
        while rx.changed().await.is_ok() {
            seen.push(*rx.borrow_and_update());
        }

        assert_eq!(
            seen,
            vec![
                TimeLeft::new(0, 0, 0, 2),
                TimeLeft::new(0, 0, 0, 1),
                TimeLeft::ZERO,
            ]
        );
        assert!(timer.current().is_expired());
        assert_eq!(timer.current().to_string(), "Ended");
    }

    #[tokio::test(start_paused = true)]
    async fn test_borrows_across_units() {
        let timer = CountdownTimer::start(TimeLeft::new(1, 0, 0, 0));
        let mut rx = timer.subscribe();

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), TimeLeft::new(0, 23, 59, 59));
        assert!(timer.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_once_per_second() {
        let timer = CountdownTimer::start(TimeLeft::new(0, 0, 5, 0));
        let start = Instant::now();
        let mut rx = timer.subscribe();

        rx.changed().await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_secs(2));
        assert_eq!(timer.current(), TimeLeft::new(0, 0, 4, 58));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_start_has_no_task() {
        let timer = CountdownTimer::start(TimeLeft::ZERO);
        assert!(!timer.is_running());
        assert!(timer.subscribe().changed().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_ticking() {
        let timer = CountdownTimer::start(TimeLeft::new(2, 14, 0, 0));
        let mut rx = timer.subscribe();
        drop(timer);

        assert!(rx.changed().await.is_err());
        assert_eq!(*rx.borrow(), TimeLeft::new(2, 14, 0, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_keeps_last_value() {
        let mut timer = CountdownTimer::start(TimeLeft::new(0, 0, 0, 10));
        let mut rx = timer.subscribe();
        rx.changed().await.unwrap();

        timer.stop();
        assert!(!timer.is_running());
        assert_eq!(timer.current(), TimeLeft::new(0, 0, 0, 9));
    }
}
