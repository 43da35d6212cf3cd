use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, warn};

/// Pause between a job being picked up and its operation touching the
/// filesystem. A submitted file may still be referenced by a status or
/// preview read of the previous snapshot; the delay gives those readers
/// time to release it, and a job still inside its delay counts as
/// not-started for cancellation purposes.
pub const HANDOFF_DELAY: Duration = Duration::from_millis(250);

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A fixed-size pool of worker threads pulling jobs from a single FIFO
/// queue. The pool size is set at construction and never resized.
///
/// Shutdown comes in two flavors:
/// - [`stop_wait`](Self::stop_wait) (drain): every queued job runs before
///   the call returns.
/// - [`stop`](Self::stop) (cancel): jobs not yet past their handoff delay
///   are discarded; only jobs already executing run to completion.
pub struct OperationExecutor {
    job_tx: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    cancelled: Arc<AtomicBool>,
}

impl OperationExecutor {
    pub fn new(num_workers: usize) -> Self {
        Self::with_delay(num_workers, HANDOFF_DELAY)
    }

    pub fn with_delay(num_workers: usize, delay: Duration) -> Self {
        let (job_tx, job_rx) = unbounded::<Job>();
        let cancelled = Arc::new(AtomicBool::new(false));

        let workers = (0..num_workers.max(1))
            .map(|id| {
                let job_rx = job_rx.clone();
                let cancelled = cancelled.clone();
                std::thread::Builder::new()
                    .name(format!("op-worker-{id}"))
                    .spawn(move || worker_loop(id, job_rx, cancelled, delay))
                    .expect("failed to spawn worker thread")
            })
            .collect();

        Self {
            job_tx: Some(job_tx),
            workers,
            cancelled,
        }
    }

    /// Enqueues a job for eventual execution. Never blocks beyond the
    /// queue insertion; silently ignored once the pool is stopping.
    pub fn submit(&self, job: impl FnOnce() + Send + 'static) {
        if let Some(tx) = &self.job_tx {
            if tx.send(Box::new(job)).is_err() {
                warn!("operation submitted to a stopped executor, dropped");
            }
        }
    }

    /// Drain shutdown: runs everything already queued, then returns.
    pub fn stop_wait(mut self) {
        self.shutdown(false);
    }

    /// Cancel shutdown: discards queued jobs, waits only for jobs already
    /// executing, then returns.
    pub fn stop(mut self) {
        self.shutdown(true);
    }

    fn shutdown(&mut self, cancel: bool) {
        if cancel {
            self.cancelled.store(true, Ordering::SeqCst);
        }
        // Closing the channel lets each worker drain (or discard) the
        // remaining queue and exit.
        self.job_tx.take();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

impl Drop for OperationExecutor {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            self.shutdown(true);
        }
    }
}

fn worker_loop(id: usize, job_rx: Receiver<Job>, cancelled: Arc<AtomicBool>, delay: Duration) {
    debug!("worker {id} started");
    while let Ok(job) = job_rx.recv() {
        if cancelled.load(Ordering::SeqCst) {
            continue;
        }
        std::thread::sleep(delay);
        // Re-check after the delay: a cancel landing inside the window
        // means this job never started.
        if cancelled.load(Ordering::SeqCst) {
            continue;
        }
        job();
    }
    debug!("worker {id} stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    const TEST_DELAY: Duration = Duration::from_millis(50);

    #[test]
    fn test_stop_wait_runs_every_queued_job() {
        let executor = OperationExecutor::with_delay(1, TEST_DELAY);
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..4 {
            let counter = counter.clone();
            executor.submit(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        executor.stop_wait();
        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_stop_discards_jobs_still_in_their_delay() {
        let executor = OperationExecutor::with_delay(2, TEST_DELAY);
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..4 {
            let counter = counter.clone();
            executor.submit(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        // Cancel lands well inside the 50ms handoff window, so nothing
        // may execute.
        executor.stop();
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_stop_lets_in_flight_jobs_finish() {
        let executor = OperationExecutor::with_delay(1, Duration::from_millis(1));
        let counter = Arc::new(AtomicUsize::new(0));
        let started = Arc::new(AtomicBool::new(false));
        {
            let counter = counter.clone();
            let started = started.clone();
            executor.submit(move || {
                started.store(true, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(100));
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        while !started.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(1));
        }
        executor.stop();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_jobs_run_in_parallel_across_workers() {
        let executor = OperationExecutor::with_delay(4, Duration::from_millis(1));
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        for _ in 0..4 {
            let running = running.clone();
            let peak = peak.clone();
            executor.submit(move || {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(50));
                running.fetch_sub(1, Ordering::SeqCst);
            });
        }
        executor.stop_wait();
        assert!(peak.load(Ordering::SeqCst) > 1);
    }
}
