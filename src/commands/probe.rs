use crate::commands::{hold_for, ops_per_sec, print_report};
use crate::config::SpinConfig;
use crate::error::{Result, SpinLockError};
use crate::locking::{
    CancellationToken, SpinTimeout, SpinTimeoutResolution, TicketSpinLock, TryEnterRequest,
};
use log::info;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Slice length for infinite waits, so cancellation is still noticed.
const CANCEL_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub threads: usize,
    pub attempts_per_thread: u64,
    pub timeout: String,
    pub timeout_source: String,
    pub acquired: u64,
    pub timed_out: u64,
    pub elapsed_ms: f64,
    pub acquisitions_per_sec: f64,
}

/// Measures how often bounded `try_enter` wins under contention.
pub struct ProbeCommand<'a> {
    config: &'a SpinConfig,
    cancellation: CancellationToken,
}

impl<'a> ProbeCommand<'a> {
    pub fn new(config: &'a SpinConfig, cancellation: CancellationToken) -> Result<Self> {
        Ok(Self {
            config,
            cancellation,
        })
    }

    pub fn execute(
        &self,
        threads: Option<usize>,
        attempts: Option<u64>,
        timeout_override: Option<&str>,
        json: bool,
    ) -> Result<ProbeReport> {
        let resolution = self.config.resolve_try_timeout(timeout_override)?;
        let report = self.run(threads, attempts, resolution)?;
        let rows = [
            ("Threads", report.threads.to_string()),
            ("Attempts/thread", report.attempts_per_thread.to_string()),
            (
                "Timeout",
                format!("{} ({})", report.timeout, report.timeout_source),
            ),
            ("Acquired", report.acquired.to_string()),
            ("Timed out", report.timed_out.to_string()),
            ("Elapsed", format!("{:.2} ms", report.elapsed_ms)),
            (
                "Throughput",
                format!("{:.0} acquisitions/s", report.acquisitions_per_sec),
            ),
        ];
        print_report("probe", &rows, &report, json)?;
        Ok(report)
    }

    pub fn run(
        &self,
        threads: Option<usize>,
        attempts: Option<u64>,
        resolution: SpinTimeoutResolution,
    ) -> Result<ProbeReport> {
        let threads = threads.unwrap_or(self.config.stress.threads);
        let attempts = attempts.unwrap_or(self.config.stress.iterations);
        if threads == 0 {
            return Err(SpinLockError::InvalidArgument(
                "--threads must be at least 1".to_string(),
            ));
        }

        let timeout = resolution.value;
        let hold_spins = self.config.stress.hold_spins;
        let lock = TicketSpinLock::new(self.config.lock.owner_tracking);
        let acquired = AtomicU64::new(0);
        let timed_out = AtomicU64::new(0);

        info!(
            "Probing with {threads} threads x {attempts} attempts, timeout {timeout} from {}",
            resolution.source
        );
        let started = Instant::now();
        let outcomes: Vec<Result<()>> = thread::scope(|scope| {
            let workers: Vec<_> = (0..threads)
                .map(|_| {
                    scope.spawn(|| -> Result<()> {
                        for _ in 0..attempts {
                            if self.cancellation.is_cancelled() {
                                break;
                            }
                            if !try_acquire(&lock, timeout, &self.cancellation)? {
                                if self.cancellation.is_cancelled() {
                                    break;
                                }
                                timed_out.fetch_add(1, Ordering::Relaxed);
                                continue;
                            }
                            hold_for(hold_spins);
                            lock.exit()?;
                            acquired.fetch_add(1, Ordering::Relaxed);
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

        let acquired = acquired.load(Ordering::SeqCst);
        Ok(ProbeReport {
            threads,
            attempts_per_thread: attempts,
            timeout: timeout.to_string(),
            timeout_source: resolution.source.to_string(),
            acquired,
            timed_out: timed_out.load(Ordering::SeqCst),
            elapsed_ms: elapsed.as_secs_f64() * 1_000.0,
            acquisitions_per_sec: ops_per_sec(acquired, elapsed.as_secs_f64()),
        })
    }
}

/// Attempts one acquisition within `timeout`.
///
/// An infinite wait is split into bounded attempts and gives up with `false`
/// once `cancellation` trips.
fn try_acquire(
    lock: &TicketSpinLock,
    timeout: SpinTimeout,
    cancellation: &CancellationToken,
) -> Result<bool> {
    let slice = if timeout.is_infinite() {
        SpinTimeout::from(CANCEL_POLL)
    } else {
        timeout
    };
    loop {
        let mut taken = false;
        lock.try_enter_with(&mut taken, TryEnterRequest::new(slice))?;
        if taken || !timeout.is_infinite() || cancellation.is_cancelled() {
            return Ok(taken);
        }
    }
}
