//! Scheduled refresh with explicit cancellation.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

/// Cloneable cancellation signal. Cancelling any clone cancels all of them.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx: Arc::new(tx), rx }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the token is cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // The sender lives as long as any token clone, so this only errors if
        // it was dropped, which cannot happen while `self` exists.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs a task on a fixed period until cancelled or `max_ticks` is reached.
#[derive(Debug, Clone, Copy)]
pub struct ScheduledRefresh {
    pub period: Duration,
    /// `None` runs until cancelled.
    pub max_ticks: Option<usize>,
}

impl ScheduledRefresh {
    pub fn every(period: Duration) -> Self {
        Self {
            period,
            max_ticks: None,
        }
    }

    pub fn with_max_ticks(mut self, max_ticks: usize) -> Self {
        self.max_ticks = Some(max_ticks);
        self
    }

    /// Runs `task` immediately and then once per period. A failing task is
    /// logged and the schedule continues. Returns the number of ticks run.
    pub async fn run<F, Fut>(self, token: CancellationToken, mut task: F) -> usize
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = anyhow::Result<()>>,
    {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks = 0usize;

        loop {
            if self.max_ticks.is_some_and(|max| ticks >= max) {
                break;
            }

            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    info!(ticks, "Refresh cancelled");
                    break;
                }
                _ = interval.tick() => {}
            }

            ticks += 1;
            debug!(tick = ticks, "Refresh tick");

            // A cancel during the task stops the task too.
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    info!(ticks, "Refresh cancelled mid-tick");
                    break;
                }
                result = task(ticks) => {
                    if let Err(e) = result {
                        error!(tick = ticks, error = %e, "Refresh task failed");
                    }
                }
            }
        }

        ticks
    }

    /// Spawns [`ScheduledRefresh::run`] onto the runtime.
    pub fn spawn<F, Fut>(self, token: CancellationToken, task: F) -> JoinHandle<usize>
    where
        F: FnMut(usize) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        tokio::spawn(self.run(token, task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_runs_max_ticks() {
        let counter = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&counter);

        let ticks = ScheduledRefresh::every(Duration::from_millis(5))
            .with_max_ticks(3)
            .run(CancellationToken::new(), move |_| {
                let seen = Arc::clone(&seen);
                async move {
                    seen.fetch_add(1, Ordering::SeqCst);
                    Ok::<(), anyhow::Error>(())
                }
            })
            .await;

        assert_eq!(ticks, 3);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_task_errors_do_not_stop_schedule() {
        let ticks = ScheduledRefresh::every(Duration::from_millis(1))
            .with_max_ticks(2)
            .run(CancellationToken::new(), |_| async { Err::<(), _>(anyhow::anyhow!("API unavailable")) })
            .await;
        assert_eq!(ticks, 2);
    }

    #[tokio::test]
    async fn test_cancel_stops_spawned_refresh() {
        let token = CancellationToken::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handle = ScheduledRefresh::every(Duration::from_secs(3600)).spawn(token.clone(), move |tick| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(tick);
                Ok::<(), anyhow::Error>(())
            }
        });

        // First tick fires immediately; the next one is an hour away.
        assert_eq!(rx.recv().await, Some(1));
        token.cancel();

        assert_eq!(handle.await.unwrap(), 1);
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_before_start_runs_nothing() {
        let token = CancellationToken::new();
        token.cancel();
        let ticks = ScheduledRefresh::every(Duration::from_millis(1))
            .run(token, |_| async { Ok::<(), anyhow::Error>(()) })
            .await;
        assert_eq!(ticks, 0);
    }
}
