//! Scheduler — runs a cycle immediately and then on a fixed interval.
//!
//! Cycles run inline on the scheduler task, so two cycles never overlap.
//! Ticks sit on a fixed grid `start + k * interval`. Ticks that fall due
//! while a cycle is still running are skipped rather than queued: the next
//! cycle starts on the first grid point after the slow one finished. A
//! failing cycle is logged and the next tick still fires.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    interval: Duration,
}

impl Scheduler {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run `cycle` until the shutdown signal changes or its sender is dropped.
    ///
    /// A cycle in flight when shutdown is signalled runs to completion.
    pub async fn run<F, Fut, T, E>(&self, mut cycle: F, mut shutdown: watch::Receiver<bool>)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        info!(
            interval_ms = self.interval.as_millis() as u64,
            "scheduler started"
        );

        let mut deadline = Instant::now();
        let mut tick: u64 = 0;

        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => {
                    tick += 1;
                    let started = Instant::now();
                    match cycle().await {
                        Ok(_) => debug!(tick, "cycle finished"),
                        Err(e) => error!(tick, error = %e, "crawl cycle failed"),
                    }
                    let finished = Instant::now();
                    let (next, skipped) = next_deadline(deadline, self.interval, finished);
                    if skipped > 0 {
                        warn!(
                            tick,
                            skipped,
                            elapsed_ms = (finished - started).as_millis() as u64,
                            "cycle overran the interval, skipping missed ticks"
                        );
                    }
                    deadline = next;
                }
                _ = shutdown.changed() => {
                    info!(ticks = tick, "scheduler shutting down");
                    break;
                }
            }
        }
    }

    /// Spawn the loop on the runtime and return its stop hook.
    pub fn spawn<F, Fut, T, E>(self, cycle: F) -> SchedulerHandle
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Display + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            self.run(cycle, shutdown_rx).await;
        });
        SchedulerHandle { shutdown_tx, task }
    }
}

/// First grid point after `previous` that is not earlier than `finished`,
/// and how many grid points were passed over to reach it.
fn next_deadline(previous: Instant, interval: Duration, finished: Instant) -> (Instant, u32) {
    let next = previous + interval;
    if finished <= next || interval.is_zero() {
        return (next, 0);
    }
    let behind = (finished - next).as_nanos();
    let step = interval.as_nanos();
    let skipped = u32::try_from(behind.div_ceil(step)).unwrap_or(u32::MAX);
    (next + interval * skipped, skipped)
}

/// Stop hook for a spawned scheduler.
pub struct SchedulerHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Signal shutdown and wait for the loop to exit.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            error!(error = %e, "scheduler task ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_cycle(
        count: Arc<AtomicUsize>,
        fail: bool,
    ) -> impl FnMut() -> std::pin::Pin<Box<dyn Future<Output = Result<(), String>> + Send>> {
        move || {
            let count = count.clone();
            Box::pin(async move {
                count.fetch_add(1, Ordering::SeqCst);
                if fail {
                    Err("registry offline".to_string())
                } else {
                    Ok(())
                }
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn runs_immediately_then_every_interval() {
        let count = Arc::new(AtomicUsize::new(0));
        let handle = Scheduler::new(Duration::from_secs(60))
            .spawn(counting_cycle(count.clone(), false));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // Ticks at 0s, 60s, 120s.
        tokio::time::sleep(Duration::from_secs(149)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn failing_cycles_do_not_stop_the_loop() {
        let count = Arc::new(AtomicUsize::new(0));
        let handle = Scheduler::new(Duration::from_secs(60))
            .spawn(counting_cycle(count.clone(), true));

        tokio::time::sleep(Duration::from_secs(150)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert!(!handle.is_finished());

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn slow_cycles_never_overlap() {
        let started = Arc::new(AtomicUsize::new(0));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_in_flight = Arc::new(AtomicUsize::new(0));

        let cycle = {
            let (started, in_flight, max_in_flight) =
                (started.clone(), in_flight.clone(), max_in_flight.clone());
            move || {
                let (started, in_flight, max_in_flight) =
                    (started.clone(), in_flight.clone(), max_in_flight.clone());
                async move {
                    started.fetch_add(1, Ordering::SeqCst);
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    max_in_flight.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_secs(90)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, String>(())
                }
            }
        };

        let handle = Scheduler::new(Duration::from_secs(60)).spawn(cycle);
        tokio::time::sleep(Duration::from_secs(300)).await;
        handle.stop().await;

        assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
        // 90s cycles on a 60s interval start at 0s, 120s and 240s; the ticks
        // due at 60s and 180s fall mid-cycle and are skipped.
        assert_eq!(started.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_cycle_resumes_on_the_interval_grid() {
        let starts = Arc::new(std::sync::Mutex::new(Vec::new()));
        let origin = Instant::now();

        let cycle = {
            let starts = starts.clone();
            move || {
                let starts = starts.clone();
                async move {
                    let n = {
                        let mut starts = starts.lock().unwrap();
                        starts.push(origin.elapsed().as_secs());
                        starts.len()
                    };
                    // Only the first cycle is slow.
                    if n == 1 {
                        tokio::time::sleep(Duration::from_secs(130)).await;
                    }
                    Ok::<_, String>(())
                }
            }
        };

        let handle = Scheduler::new(Duration::from_secs(60)).spawn(cycle);
        tokio::time::sleep(Duration::from_secs(250)).await;
        handle.stop().await;

        assert_eq!(*starts.lock().unwrap(), vec![0, 180, 240]);
    }

    #[test]
    fn next_deadline_skips_overrun_grid_points() {
        let start = Instant::now();
        let minute = Duration::from_secs(60);

        assert_eq!(
            next_deadline(start, minute, start + Duration::from_secs(5)),
            (start + minute, 0)
        );
        assert_eq!(next_deadline(start, minute, start + minute), (start + minute, 0));
        assert_eq!(
            next_deadline(start, minute, start + Duration::from_secs(90)),
            (start + Duration::from_secs(120), 1)
        );
        assert_eq!(
            next_deadline(start, minute, start + Duration::from_secs(180)),
            (start + Duration::from_secs(180), 2)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stop_hook_halts_the_loop() {
        let count = Arc::new(AtomicUsize::new(0));
        let handle = Scheduler::new(Duration::from_secs(60))
            .spawn(counting_cycle(count.clone(), false));

        tokio::time::sleep(Duration::from_secs(1)).await;
        handle.stop().await;
        let after_stop = count.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(count.load(Ordering::SeqCst), after_stop);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_sender_ends_run() {
        let count = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(false);
        drop(tx);

        Scheduler::new(Duration::from_secs(60))
            .run(counting_cycle(count.clone(), false), rx)
            .await;

        assert!(count.load(Ordering::SeqCst) <= 1);
    }
}
