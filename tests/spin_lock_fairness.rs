use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};
use ticket_spin::TicketSpinLock;
use ticket_spin::locking::TicketSnapshot;

fn wait_for_issue(lock: &TicketSpinLock, issue: u32) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while lock.snapshot().issue != issue {
        assert!(Instant::now() < deadline, "ticket {issue} was never drawn");
        thread::yield_now();
    }
}

#[test]
fn enter_serves_waiters_in_ticket_order() {
    let lock = TicketSpinLock::new(true);
    let order = Mutex::new(Vec::new());
    let mut taken = false;
    lock.enter(&mut taken).unwrap();

    thread::scope(|scope| {
        for index in 0..6u32 {
            let lock = &lock;
            let order = &order;
            scope.spawn(move || {
                let mut taken = false;
                lock.enter(&mut taken).unwrap();
                order.lock().unwrap().push(index);
                lock.exit().unwrap();
            });
            wait_for_issue(&lock, index + 2);
        }
        lock.exit().unwrap();
    });

    assert_eq!(order.into_inner().unwrap(), vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(lock.snapshot(), TicketSnapshot::new(7, 7));
}

#[test]
fn failed_try_enter_does_not_join_the_queue() {
    let lock = TicketSpinLock::new(false);
    let mut taken = false;
    lock.enter(&mut taken).unwrap();

    thread::scope(|scope| {
        scope.spawn(|| {
            let mut taken = false;
            lock.try_enter_millis(3, &mut taken).unwrap();
            assert!(!taken);
        });
    });

    assert_eq!(lock.snapshot(), TicketSnapshot::new(0, 1));
    lock.exit().unwrap();
    assert!(!lock.is_held());
}

#[test]
fn try_enter_claims_as_next_issuer_and_server() {
    let lock = TicketSpinLock::new(true);
    for round in 0..3u32 {
        let mut taken = false;
        lock.try_enter(&mut taken).unwrap();
        assert!(taken);
        assert_eq!(lock.snapshot(), TicketSnapshot::new(round, round + 1));
        lock.exit().unwrap();
    }
    assert_eq!(lock.snapshot(), TicketSnapshot::new(3, 3));
}
