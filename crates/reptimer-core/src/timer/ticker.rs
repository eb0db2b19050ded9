//! One-tick-per-second source for the timer engine.
//!
//! A `Ticker` owns a spawned tokio task. Cancelling or dropping the
//! ticker aborts the task, so a ticker can never outlive its owner.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

pub struct Ticker {
    rx: mpsc::Receiver<u64>,
    handle: JoinHandle<()>,
    cancelled: bool,
}

impl Ticker {
    /// Spawn a ticker on the current tokio runtime. The first tick arrives
    /// one period after the call.
    pub fn spawn() -> Self {
        Self::with_period(TICK_PERIOD)
    }

    pub fn with_period(period: Duration) -> Self {
        let (tx, rx) = mpsc::channel(1);
        let handle = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut count = 0u64;
            loop {
                interval.tick().await;
                count += 1;
                if tx.send(count).await.is_err() {
                    break;
                }
            }
        });
        tracing::trace!(?period, "ticker spawned");
        Self {
            rx,
            handle,
            cancelled: false,
        }
    }

    /// Wait for the next tick. `None` once the ticker is cancelled.
    pub async fn next(&mut self) -> Option<u64> {
        if self.cancelled {
            return None;
        }
        self.rx.recv().await
    }

    /// Stop the task and discard any tick already queued.
    pub fn cancel(&mut self) {
        if self.cancelled {
            return;
        }
        self.cancelled = true;
        self.handle.abort();
        self.rx.close();
        while self.rx.try_recv().is_ok() {}
        tracing::trace!("ticker cancelled");
    }

    pub fn is_active(&self) -> bool {
        !self.cancelled
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_second() {
        let start = Instant::now();
        let mut ticker = Ticker::spawn();

        assert_eq!(ticker.next().await, Some(1));
        assert_eq!(ticker.next().await, Some(2));
        assert_eq!(ticker.next().await, Some(3));

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(3));
        assert!(elapsed < Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_ticker_yields_nothing() {
        let mut ticker = Ticker::spawn();
        assert_eq!(ticker.next().await, Some(1));

        ticker.cancel();
        assert!(!ticker.is_active());
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(ticker.next().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_is_idempotent() {
        let mut ticker = Ticker::spawn();
        ticker.cancel();
        ticker.cancel();
        assert_eq!(ticker.next().await, None);
    }
}
