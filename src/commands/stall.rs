use crate::commands::print_report;
use crate::config::SpinConfig;
use crate::error::{Result, SpinLockError};
use crate::locking::{CancellationToken, EnterRequest, LoggingSpinWaitObserver, TicketSpinLock};
use log::{debug, info};
use serde::Serialize;
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

const DRAW_DEADLINE: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Serialize)]
pub struct StallReport {
    pub waiters: usize,
    pub abandoned: Vec<usize>,
    pub stalled_after_cancel: usize,
    pub acquisition_order: Vec<usize>,
    pub final_serve: u32,
    pub final_issue: u32,
    pub elapsed_ms: f64,
}

/// Queues waiters behind a held lock, cancels some, and checks the rest still get through.
pub struct StallCommand<'a> {
    config: &'a SpinConfig,
}

impl<'a> StallCommand<'a> {
    pub fn new(config: &'a SpinConfig) -> Result<Self> {
        Ok(Self { config })
    }

    pub fn execute(&self, waiters: usize, abandon: usize, json: bool) -> Result<StallReport> {
        let report = self.run(waiters, abandon)?;
        let rows = [
            ("Waiters", report.waiters.to_string()),
            ("Abandoned", format!("{:?}", report.abandoned)),
            ("Stalled tickets", report.stalled_after_cancel.to_string()),
            ("Acquisition order", format!("{:?}", report.acquisition_order)),
            (
                "Final tickets",
                format!("serve={} issue={}", report.final_serve, report.final_issue),
            ),
            ("Elapsed", format!("{:.2} ms", report.elapsed_ms)),
        ];
        print_report("stall", &rows, &report, json)?;
        Ok(report)
    }

    pub fn run(&self, waiters: usize, abandon: usize) -> Result<StallReport> {
        if abandon > waiters {
            return Err(SpinLockError::InvalidArgument(format!(
                "cannot abandon {abandon} of {waiters} waiters"
            )));
        }

        let abandoned = abandoned_indices(waiters, abandon);
        let lock = TicketSpinLock::new(self.config.lock.owner_tracking);
        let observer = LoggingSpinWaitObserver::new("stall");
        let tokens: Vec<CancellationToken> =
            (0..waiters).map(|_| CancellationToken::new()).collect();
        let order = Mutex::new(Vec::with_capacity(waiters));

        info!("Queueing {waiters} waiters, abandoning {abandoned:?}");
        let started = Instant::now();
        let mut holder = false;
        lock.enter(&mut holder)?;

        let (stalled_after_cancel, outcomes) = thread::scope(|scope| {
            let mut handles = Vec::with_capacity(waiters);
            for (index, token) in tokens.iter().enumerate() {
                let lock = &lock;
                let order = &order;
                let observer = &observer;
                handles.push(scope.spawn(move || -> Result<bool> {
                    let mut taken = false;
                    let request = EnterRequest::new()
                        .with_cancellation(token.clone())
                        .with_observer(observer);
                    match lock.enter_with(&mut taken, request) {
                        Ok(()) => {
                            order
                                .lock()
                                .map_err(|_| {
                                    SpinLockError::StressFailure("order log poisoned".to_string())
                                })?
                                .push(index);
                            lock.exit()?;
                            Ok(true)
                        }
                        Err(SpinLockError::Cancelled { .. }) => Ok(false),
                        Err(err) => Err(err),
                    }
                }));
                // Serialize ticket draws so ticket order matches spawn order.
                if let Err(err) = wait_for_issue(&lock, index as u32 + 2) {
                    tokens.iter().for_each(CancellationToken::cancel);
                    lock.exit()?;
                    return Err(err);
                }
            }

            for index in &abandoned {
                tokens[*index].cancel();
            }
            while lock.pending_stalls() < abandoned.len() {
                thread::yield_now();
            }
            let stalled = lock.pending_stalls();
            debug!("{stalled} ticket(s) stalled; releasing the holder");
            lock.exit()?;

            let outcomes: Vec<Result<bool>> = handles
                .into_iter()
                .map(|handle| {
                    handle.join().unwrap_or_else(|_| {
                        Err(SpinLockError::StressFailure("waiter panicked".to_string()))
                    })
                })
                .collect();
            Ok::<_, SpinLockError>((stalled, outcomes))
        })?;
        let elapsed = started.elapsed();

        let acquired: Vec<bool> = outcomes.into_iter().collect::<Result<_>>()?;
        let acquisition_order = order
            .into_inner()
            .map_err(|_| SpinLockError::StressFailure("order log poisoned".to_string()))?;
        let expected: Vec<usize> = (0..waiters).filter(|i| !abandoned.contains(i)).collect();

        let acquired_count = acquired.iter().filter(|a| **a).count();
        if acquisition_order != expected || acquired_count != expected.len() {
            return Err(SpinLockError::StressFailure(format!(
                "waiters acquired in order {acquisition_order:?}, expected {expected:?}"
            )));
        }

        let snapshot = lock.snapshot();
        if snapshot.is_held() || lock.pending_stalls() != 0 {
            return Err(SpinLockError::StressFailure(format!(
                "ticket sequence did not settle: {snapshot}, {} pending stall(s)",
                lock.pending_stalls()
            )));
        }

        Ok(StallReport {
            waiters,
            abandoned,
            stalled_after_cancel,
            acquisition_order,
            final_serve: snapshot.serve,
            final_issue: snapshot.issue,
            elapsed_ms: elapsed.as_secs_f64() * 1_000.0,
        })
    }
}

/// Spreads `abandon` cancellations evenly across the queue.
fn abandoned_indices(waiters: usize, abandon: usize) -> Vec<usize> {
    if abandon == 0 {
        return Vec::new();
    }
    let stride = waiters / abandon;
    (0..abandon).map(|n| n * stride + stride / 2).collect()
}

fn wait_for_issue(lock: &TicketSpinLock, issue: u32) -> Result<()> {
    let deadline = Instant::now() + DRAW_DEADLINE;
    while lock.snapshot().issue != issue {
        if Instant::now() >= deadline {
            return Err(SpinLockError::StressFailure(format!(
                "waiter did not draw ticket {} in time",
                issue - 1
            )));
        }
        thread::yield_now();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abandoned_indices_are_spread_and_in_range() {
        assert_eq!(abandoned_indices(5, 0), Vec::<usize>::new());
        assert_eq!(abandoned_indices(3, 1), vec![1]);
        assert_eq!(abandoned_indices(6, 2), vec![1, 4]);
        assert_eq!(abandoned_indices(4, 4), vec![0, 1, 2, 3]);
    }

    #[test]
    fn remaining_waiters_acquire_in_ticket_order() {
        let config = SpinConfig::default();
        let report = StallCommand::new(&config).unwrap().run(5, 2).unwrap();

        assert_eq!(report.abandoned, vec![1, 3]);
        assert_eq!(report.stalled_after_cancel, 2);
        assert_eq!(report.acquisition_order, vec![0, 2, 4]);
        assert_eq!(report.final_serve, report.final_issue);
        assert_eq!(report.final_issue, 6);
    }

    #[test]
    fn abandoning_more_than_queued_is_rejected() {
        let config = SpinConfig::default();
        let result = StallCommand::new(&config).unwrap().run(2, 3);
        assert!(matches!(result, Err(SpinLockError::InvalidArgument(_))));
    }
}
