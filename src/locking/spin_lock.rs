// Copyright 2025 dentsusoken
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::error::{Result, SpinLockError};
use crate::locking::acquisition::{EnterRequest, TryEnterRequest, WaitBudget};
use crate::locking::clock::Stopwatch;
use crate::locking::owner::OwnerSlot;
use crate::locking::scoped_guard::SpinLockGuard;
use crate::locking::stall::StallRegistry;
use crate::locking::ticket::{TicketSnapshot, TicketState};
use crate::locking::timeout::SpinTimeout;
use crate::locking::wait_observer::SpinWaitObserver;
use crossbeam_utils::Backoff;
use log::{debug, trace};
use std::fmt;
use std::sync::atomic::{self, Ordering};
use std::time::Duration;

/// Busy-wait mutual exclusion with FIFO ticket ordering.
///
/// `enter` draws a ticket and spins until the serve counter reaches it.
/// `try_enter*` never queues: it claims the lock with one compare-and-swap
/// when the lock is free, so it can overtake threads spinning in `enter`.
///
/// A waiter that is cancelled, or unwinds, after drawing a ticket leaves the
/// ticket in a stall registry. Every other participant skips registered
/// tickets when it finds `serve` parked on one, so an abandoned ticket never
/// wedges the queue.
///
/// With owner tracking enabled the lock remembers the holding thread,
/// rejects re-entry by that thread and rejects `exit` from any other thread.
/// Without it neither check happens, and re-entry spins forever.
pub struct TicketSpinLock {
    ticket: TicketState,
    stalls: StallRegistry,
    owner: OwnerSlot,
    owner_tracking: bool,
}

impl TicketSpinLock {
    pub const fn new(enable_owner_tracking: bool) -> Self {
        Self {
            ticket: TicketState::new(),
            stalls: StallRegistry::new(),
            owner: OwnerSlot::new(),
            owner_tracking: enable_owner_tracking,
        }
    }

    /// Advisory; the answer may be stale by the time the caller acts on it.
    pub fn is_held(&self) -> bool {
        self.ticket.snapshot(Ordering::Relaxed).is_held()
    }

    /// Without owner tracking this is the same as [`is_held`](Self::is_held).
    pub fn is_held_by_current_thread(&self) -> bool {
        if self.owner_tracking {
            self.is_held() && self.owner.is_current_thread()
        } else {
            self.is_held()
        }
    }

    pub fn is_thread_owner_tracking_enabled(&self) -> bool {
        self.owner_tracking
    }

    pub fn snapshot(&self) -> TicketSnapshot {
        self.ticket.snapshot(Ordering::Acquire)
    }

    /// Abandoned tickets that nobody has skipped yet.
    pub fn pending_stalls(&self) -> usize {
        self.stalls.pending()
    }

    /// Token of the holding thread.
    ///
    /// See [`current_thread_token`](crate::locking::current_thread_token).
    pub fn owner_token(&self) -> Option<u64> {
        if self.owner_tracking {
            self.owner.get()
        } else {
            None
        }
    }

    pub fn enter(&self, lock_taken: &mut bool) -> Result<()> {
        self.enter_with(lock_taken, EnterRequest::default())
    }

    /// Waits in ticket order until the lock is granted.
    ///
    /// Returns [`SpinLockError::Cancelled`] if the request's cancellation
    /// token trips first; `lock_taken` then stays `false` and the ticket is
    /// left for others to skip.
    pub fn enter_with(&self, lock_taken: &mut bool, request: EnterRequest<'_>) -> Result<()> {
        self.check_entry(*lock_taken)?;

        let observer = request.observer();
        let stopwatch = Stopwatch::start();
        let reservation = TicketReservation::draw(self);
        let ticket = reservation.ticket;
        if let Some(observer) = observer {
            observer.on_ticket_drawn(ticket);
        }

        let backoff = Backoff::new();
        let mut iteration: u64 = 0;
        loop {
            let serving = self.ticket.serve(Ordering::Acquire);
            if serving == ticket {
                break;
            }

            if request.is_cancelled() {
                if reservation.abandon() {
                    // Served while giving up: keep the lock rather than drop it.
                    self.grant(lock_taken);
                    return Ok(());
                }
                if let Some(observer) = observer {
                    observer.on_abandoned(ticket, stopwatch.elapsed());
                }
                return Err(SpinLockError::Cancelled { ticket });
            }

            if let Some(observer) = observer {
                observer.on_spin(ticket, serving, iteration);
            }
            backoff.snooze();
            iteration = iteration.wrapping_add(1);
            self.skip_stalled(observer);
        }

        reservation.settle();
        self.grant(lock_taken);
        if let Some(observer) = observer {
            observer.on_acquired(ticket, stopwatch.elapsed());
        }
        Ok(())
    }

    /// Single attempt with no waiting.
    pub fn try_enter(&self, lock_taken: &mut bool) -> Result<()> {
        self.try_enter_with(lock_taken, TryEnterRequest::new(SpinTimeout::ZERO))
    }

    /// `Duration::MAX` waits indefinitely.
    pub fn try_enter_for(&self, timeout: Duration, lock_taken: &mut bool) -> Result<()> {
        self.try_enter_with(lock_taken, TryEnterRequest::new(SpinTimeout::from(timeout)))
    }

    /// `-1` waits indefinitely; anything below `-1` is rejected.
    pub fn try_enter_millis(&self, timeout_millis: i64, lock_taken: &mut bool) -> Result<()> {
        let timeout = SpinTimeout::from_millis(timeout_millis)?;
        self.try_enter_with(lock_taken, TryEnterRequest::new(timeout))
    }

    /// Retries a free-lock compare-and-swap until it wins or the timeout passes.
    ///
    /// Timing out is not an error: the call returns `Ok(())` with
    /// `lock_taken` still `false`.
    pub fn try_enter_with(
        &self,
        lock_taken: &mut bool,
        request: TryEnterRequest<'_>,
    ) -> Result<()> {
        self.check_entry(*lock_taken)?;

        let observer = request.observer();
        let budget = WaitBudget::start(request.timeout());
        let backoff = Backoff::new();
        loop {
            self.skip_stalled(observer);

            let issue = self.ticket.snapshot(Ordering::Relaxed).issue;
            if self.ticket.try_claim(issue) {
                self.grant(lock_taken);
                if let Some(observer) = observer {
                    observer.on_acquired(issue, budget.elapsed());
                }
                return Ok(());
            }

            if budget.is_expired() {
                if let Some(observer) = observer {
                    observer.on_timeout(budget.timeout(), budget.elapsed());
                }
                return Ok(());
            }
            backoff.snooze();
        }
    }

    pub fn exit(&self) -> Result<()> {
        self.exit_with_barrier(false)
    }

    /// Hands the lock to the next ticket.
    ///
    /// `use_memory_barrier` makes the serve increment sequentially
    /// consistent instead of a release store.
    pub fn exit_with_barrier(&self, use_memory_barrier: bool) -> Result<()> {
        if self.owner_tracking {
            if !self.is_held_by_current_thread() {
                return Err(SpinLockError::NotOwner);
            }
            self.owner.clear();
        }

        let order = if use_memory_barrier {
            Ordering::SeqCst
        } else {
            Ordering::Release
        };
        self.ticket.advance_serve(order);
        if !use_memory_barrier {
            // Orders the serve increment before the stall check below.
            atomic::fence(Ordering::SeqCst);
        }
        self.skip_stalled(None);
        Ok(())
    }

    pub fn lock(&self) -> Result<SpinLockGuard<'_>> {
        let mut taken = false;
        self.enter(&mut taken)?;
        Ok(SpinLockGuard::new(self))
    }

    pub fn try_lock(&self) -> Result<Option<SpinLockGuard<'_>>> {
        self.try_lock_for(Duration::ZERO)
    }

    pub fn try_lock_for(&self, timeout: Duration) -> Result<Option<SpinLockGuard<'_>>> {
        let mut taken = false;
        self.try_enter_for(timeout, &mut taken)?;
        Ok(taken.then(|| SpinLockGuard::new(self)))
    }

    fn check_entry(&self, lock_taken: bool) -> Result<()> {
        if lock_taken {
            return Err(SpinLockError::LockTakenAlreadySet);
        }
        if self.owner_tracking && self.is_held_by_current_thread() {
            return Err(SpinLockError::Recursion);
        }
        Ok(())
    }

    fn grant(&self, lock_taken: &mut bool) {
        *lock_taken = true;
        if self.owner_tracking {
            self.owner.claim();
        }
    }

    /// Advances `serve` past every registered ticket it is parked on.
    fn skip_stalled(&self, observer: Option<&dyn SpinWaitObserver>) {
        loop {
            let serving = self.ticket.serve(Ordering::Acquire);
            if !self.stalls.try_skip(serving) {
                return;
            }
            // Removing the entry makes this thread the only one allowed to move past it.
            self.ticket.advance_serve(Ordering::SeqCst);
            trace!("Skipped stalled ticket {serving}");
            if let Some(observer) = observer {
                observer.on_stalled_skipped(serving);
            }
        }
    }

    /// Gives up `ticket`. Returns `true` if it was already being served.
    ///
    /// A served ticket is passed straight on when `pass_on` is set; otherwise
    /// the caller keeps the lock.
    fn abandon_ticket(&self, ticket: u32, pass_on: bool) -> bool {
        if self.ticket.serve(Ordering::SeqCst) == ticket {
            if pass_on {
                debug!("Ticket {ticket} was served while being abandoned; passing the lock on");
                self.ticket.advance_serve(Ordering::SeqCst);
                self.skip_stalled(None);
            }
            return true;
        }

        self.register_stalled(ticket);
        false
    }

    /// Records an unserved `ticket` for others to skip, skipping it here if
    /// `serve` reached it in the meantime.
    fn register_stalled(&self, ticket: u32) {
        self.stalls.record(ticket);
        debug!("Ticket {ticket} abandoned before acquisition; registered as stalled");

        // The releaser may have drained just before the entry became visible.
        if self.ticket.serve(Ordering::SeqCst) == ticket && self.stalls.try_skip(ticket) {
            self.ticket.advance_serve(Ordering::SeqCst);
            self.skip_stalled(None);
        }
    }
}

impl Default for TicketSpinLock {
    fn default() -> Self {
        Self::new(true)
    }
}

impl fmt::Debug for TicketSpinLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.ticket.snapshot(Ordering::Relaxed);
        f.debug_struct("TicketSpinLock")
            .field("is_held", &snapshot.is_held())
            .field("serve", &snapshot.serve)
            .field("issue", &snapshot.issue)
            .field("owner_tracking", &self.owner_tracking)
            .field("pending_stalls", &self.stalls.pending())
            .finish()
    }
}

/// A drawn ticket that must either be granted or handed to the stall registry.
///
/// Dropping an unsettled reservation (an unwinding waiter) abandons the
/// ticket, passing the lock on if it was already served.
struct TicketReservation<'a> {
    lock: &'a TicketSpinLock,
    ticket: u32,
    settled: bool,
}

impl<'a> TicketReservation<'a> {
    fn draw(lock: &'a TicketSpinLock) -> Self {
        Self {
            ticket: lock.ticket.draw(),
            lock,
            settled: false,
        }
    }

    fn settle(mut self) {
        self.settled = true;
    }

    fn abandon(mut self) -> bool {
        self.settled = true;
        self.lock.abandon_ticket(self.ticket, false)
    }
}

impl Drop for TicketReservation<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.lock.abandon_ticket(self.ticket, true);
        }
    }
}
