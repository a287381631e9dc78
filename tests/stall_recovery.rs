use std::panic::{self, AssertUnwindSafe};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use ticket_spin::locking::{CancellationToken, EnterRequest, SpinWaitObserver, TicketSnapshot};
use ticket_spin::{SpinLockError, TicketSpinLock};

fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        thread::yield_now();
    }
}

#[test]
fn abandoned_middle_ticket_does_not_block_later_ticket() {
    let lock = TicketSpinLock::new(true);
    let order = Mutex::new(Vec::new());
    let cancel_middle = CancellationToken::new();

    // Ticket 0: this thread.
    let mut taken = false;
    lock.enter(&mut taken).unwrap();

    thread::scope(|scope| {
        // Ticket 1: abandons.
        let middle = scope.spawn(|| {
            let mut taken = false;
            let request = EnterRequest::new().with_cancellation(cancel_middle.clone());
            let result = lock.enter_with(&mut taken, request);
            assert!(!taken);
            result
        });
        wait_until(|| lock.snapshot().issue == 2);

        // Ticket 2: must still get through.
        let last = scope.spawn(|| {
            let mut taken = false;
            lock.enter(&mut taken).unwrap();
            order.lock().unwrap().push(2);
            lock.exit().unwrap();
        });
        wait_until(|| lock.snapshot().issue == 3);

        cancel_middle.cancel();
        let result = middle.join().unwrap();
        assert!(matches!(result, Err(SpinLockError::Cancelled { ticket: 1 })));
        assert_eq!(lock.pending_stalls(), 1);

        order.lock().unwrap().push(0);
        lock.exit().unwrap();
        last.join().unwrap();
    });

    assert_eq!(order.into_inner().unwrap(), vec![0, 2]);
    assert_eq!(lock.snapshot(), TicketSnapshot::new(3, 3));
    assert_eq!(lock.pending_stalls(), 0);
}

#[test]
fn consecutive_abandoned_tickets_are_all_skipped() {
    let lock = TicketSpinLock::new(false);
    let mut taken = false;
    lock.enter(&mut taken).unwrap();

    let tokens: Vec<_> = (0..3).map(|_| CancellationToken::new()).collect();
    thread::scope(|scope| {
        let mut handles = Vec::new();
        for (index, token) in tokens.iter().enumerate() {
            let lock = &lock;
            handles.push(scope.spawn(move || {
                let mut taken = false;
                lock.enter_with(&mut taken, EnterRequest::new().with_cancellation(token.clone()))
            }));
            wait_until(|| lock.snapshot().issue == index as u32 + 2);
        }
        tokens.iter().for_each(CancellationToken::cancel);
        for handle in handles {
            assert!(matches!(
                handle.join().unwrap(),
                Err(SpinLockError::Cancelled { .. })
            ));
        }
    });

    assert_eq!(lock.pending_stalls(), 3);
    lock.exit().unwrap();
    assert!(!lock.is_held());
    assert_eq!(lock.snapshot(), TicketSnapshot::new(4, 4));

    // The sequence keeps working afterwards.
    let mut taken = false;
    lock.enter(&mut taken).unwrap();
    assert_eq!(lock.snapshot(), TicketSnapshot::new(4, 5));
    lock.exit().unwrap();
}

#[test]
fn release_skips_stall_so_try_enter_wins() {
    let lock = TicketSpinLock::new(true);
    let mut taken = false;
    lock.enter(&mut taken).unwrap();
    let token = CancellationToken::new();

    thread::scope(|scope| {
        let abandoning = scope.spawn(|| {
            let mut taken = false;
            lock.enter_with(&mut taken, EnterRequest::new().with_cancellation(token.clone()))
        });
        wait_until(|| lock.snapshot().issue == 2);
        token.cancel();
        assert!(abandoning.join().unwrap().is_err());
    });

    lock.exit().unwrap();
    // Ticket 1 was skipped by the release itself.
    let mut taken = false;
    lock.try_enter(&mut taken).unwrap();
    assert!(taken);
    lock.exit().unwrap();
}

struct InterruptAfter {
    spins: u64,
}

impl SpinWaitObserver for InterruptAfter {
    fn on_spin(&self, _ticket: u32, _serving: u32, iteration: u64) {
        if iteration >= self.spins {
            panic!("simulated interruption");
        }
    }
}

#[test]
fn panicking_waiter_leaves_its_ticket_for_others() {
    let lock = TicketSpinLock::new(true);
    let mut taken = false;
    lock.enter(&mut taken).unwrap();
    let acquired = AtomicU64::new(0);

    thread::scope(|scope| {
        let interrupted = scope.spawn(|| {
            let observer = InterruptAfter { spins: 3 };
            panic::catch_unwind(AssertUnwindSafe(|| {
                let mut taken = false;
                let _ = lock.enter_with(&mut taken, EnterRequest::new().with_observer(&observer));
            }))
            .is_err()
        });
        assert!(interrupted.join().unwrap());
        assert_eq!(lock.pending_stalls(), 1);

        let follower = scope.spawn(|| {
            let mut taken = false;
            lock.enter(&mut taken).unwrap();
            acquired.fetch_add(1, Ordering::SeqCst);
            lock.exit().unwrap();
        });
        wait_until(|| lock.snapshot().issue == 3);
        lock.exit().unwrap();
        follower.join().unwrap();
    });

    assert_eq!(acquired.load(Ordering::SeqCst), 1);
    assert!(!lock.is_held());
}

#[test]
fn random_cancellations_never_wedge_the_queue() {
    let lock = TicketSpinLock::new(true);
    let completed = AtomicU64::new(0);
    let cancelled = AtomicU64::new(0);

    thread::scope(|scope| {
        for worker in 0..6u64 {
            let lock = &lock;
            let completed = &completed;
            let cancelled = &cancelled;
            scope.spawn(move || {
                for round in 0..200u64 {
                    let token = CancellationToken::new();
                    // Roughly one attempt in five gives up straight away.
                    if (worker * 31 + round * 17) % 5 == 0 {
                        token.cancel();
                    }
                    let mut taken = false;
                    match lock.enter_with(&mut taken, EnterRequest::new().with_cancellation(token))
                    {
                        Ok(()) => {
                            assert!(taken);
                            completed.fetch_add(1, Ordering::Relaxed);
                            lock.exit().unwrap();
                        }
                        Err(SpinLockError::Cancelled { .. }) => {
                            assert!(!taken);
                            cancelled.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(err) => panic!("unexpected error: {err}"),
                    }
                }
            });
        }
    });

    let completed = completed.load(Ordering::SeqCst);
    let cancelled = cancelled.load(Ordering::SeqCst);
    assert_eq!(completed + cancelled, 1_200);
    assert!(!lock.is_held());
    assert_eq!(lock.pending_stalls(), 0);
    assert_eq!(lock.snapshot().issue, 1_200);
}
