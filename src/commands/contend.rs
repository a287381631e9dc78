use crate::commands::{hold_for, ops_per_sec, print_report};
use crate::config::SpinConfig;
use crate::error::{Result, SpinLockError};
use crate::locking::{CancellationToken, EnterRequest, TicketSpinLock};
use log::{debug, info};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::thread;
use std::time::Instant;

#[derive(Debug, Clone, Serialize)]
pub struct ContendReport {
    pub threads: usize,
    pub iterations_per_thread: u64,
    pub owner_tracking: bool,
    pub completed: u64,
    pub counter: u64,
    pub max_concurrent_holders: usize,
    pub cancelled: bool,
    pub elapsed_ms: f64,
    pub ops_per_sec: f64,
}

/// Hammers one lock with `enter`/`exit` pairs from several threads.
pub struct ContendCommand<'a> {
    config: &'a SpinConfig,
    cancellation: CancellationToken,
}

impl<'a> ContendCommand<'a> {
    pub fn new(config: &'a SpinConfig, cancellation: CancellationToken) -> Result<Self> {
        Ok(Self {
            config,
            cancellation,
        })
    }

    pub fn execute(
        &self,
        threads: Option<usize>,
        iterations: Option<u64>,
        json: bool,
    ) -> Result<ContendReport> {
        let report = self.run(threads, iterations)?;
        let rows = [
            ("Threads", report.threads.to_string()),
            ("Iterations/thread", report.iterations_per_thread.to_string()),
            ("Owner tracking", report.owner_tracking.to_string()),
            ("Completed", report.completed.to_string()),
            ("Counter", report.counter.to_string()),
            ("Max holders", report.max_concurrent_holders.to_string()),
            ("Elapsed", format!("{:.2} ms", report.elapsed_ms)),
            ("Throughput", format!("{:.0} ops/s", report.ops_per_sec)),
        ];
        print_report("contend", &rows, &report, json)?;
        Ok(report)
    }

    pub fn run(&self, threads: Option<usize>, iterations: Option<u64>) -> Result<ContendReport> {
        let threads = threads.unwrap_or(self.config.stress.threads);
        let iterations = iterations.unwrap_or(self.config.stress.iterations);
        if threads == 0 {
            return Err(SpinLockError::InvalidArgument(
                "--threads must be at least 1".to_string(),
            ));
        }

        let owner_tracking = self.config.lock.owner_tracking;
        let hold_spins = self.config.stress.hold_spins;
        let lock = TicketSpinLock::new(owner_tracking);
        // Updated with a separate load and store so lost updates expose overlap.
        let counter = AtomicU64::new(0);
        let holders = AtomicUsize::new(0);
        let max_holders = AtomicUsize::new(0);
        let completed = AtomicU64::new(0);

        info!("Contending with {threads} threads x {iterations} iterations");
        let started = Instant::now();
        let outcomes: Vec<Result<()>> = thread::scope(|scope| {
            let workers: Vec<_> = (0..threads)
                .map(|_| {
                    scope.spawn(|| -> Result<()> {
                        for _ in 0..iterations {
                            let mut taken = false;
                            let request =
                                EnterRequest::new().with_cancellation(self.cancellation.clone());
                            match lock.enter_with(&mut taken, request) {
                                Ok(()) => {}
                                Err(SpinLockError::Cancelled { ticket }) => {
                                    debug!("Worker stopped waiting at ticket {ticket}");
                                    return Ok(());
                                }
                                Err(err) => return Err(err),
                            }

                            let inside = holders.fetch_add(1, Ordering::SeqCst) + 1;
                            max_holders.fetch_max(inside, Ordering::SeqCst);
                            let value = counter.load(Ordering::Relaxed);
                            hold_for(hold_spins);
                            counter.store(value + 1, Ordering::Relaxed);
                            holders.fetch_sub(1, Ordering::SeqCst);

                            lock.exit()?;
                            completed.fetch_add(1, Ordering::Relaxed);
                        }
                        Ok(())
                    })
                })
                .collect();

            workers
                .into_iter()
                .map(|worker| {
                    worker.join().unwrap_or_else(|_| {
                        Err(SpinLockError::StressFailure("worker panicked".to_string()))
                    })
                })
                .collect()
        });
        let elapsed = started.elapsed();
        outcomes.into_iter().collect::<Result<Vec<()>>>()?;

        let report = ContendReport {
            threads,
            iterations_per_thread: iterations,
            owner_tracking,
            completed: completed.load(Ordering::SeqCst),
            counter: counter.load(Ordering::SeqCst),
            max_concurrent_holders: max_holders.load(Ordering::SeqCst),
            cancelled: self.cancellation.is_cancelled(),
            elapsed_ms: elapsed.as_secs_f64() * 1_000.0,
            ops_per_sec: ops_per_sec(completed.load(Ordering::SeqCst), elapsed.as_secs_f64()),
        };

        if report.counter != report.completed || report.max_concurrent_holders > 1 {
            return Err(SpinLockError::StressFailure(format!(
                "mutual exclusion violated: counter {} vs {} completed sections, {} concurrent \
                 holders",
                report.counter, report.completed, report.max_concurrent_holders
            )));
        }
        if lock.is_held() {
            return Err(SpinLockError::StressFailure(format!(
                "lock still held after all workers finished ({:?})",
                lock.snapshot()
            )));
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contend_counts_every_critical_section() {
        let mut config = SpinConfig::default();
        config.stress.hold_spins = 4;
        let command = ContendCommand::new(&config, CancellationToken::new()).unwrap();

        let report = command.run(Some(4), Some(500)).unwrap();
        assert_eq!(report.completed, 2_000);
        assert_eq!(report.counter, 2_000);
        assert_eq!(report.max_concurrent_holders, 1);
        assert!(!report.cancelled);
    }

    #[test]
    fn contend_rejects_zero_threads() {
        let config = SpinConfig::default();
        let command = ContendCommand::new(&config, CancellationToken::new()).unwrap();
        assert!(matches!(
            command.run(Some(0), Some(1)),
            Err(SpinLockError::InvalidArgument(_))
        ));
    }

    #[test]
    fn pre_cancelled_run_stops_cleanly() {
        let mut config = SpinConfig::default();
        config.lock.owner_tracking = false;
        let token = CancellationToken::new();
        token.cancel();
        let command = ContendCommand::new(&config, token).unwrap();

        let report = command.run(Some(2), Some(100)).unwrap();
        assert!(report.cancelled);
        assert_eq!(report.counter, report.completed);
    }
}
