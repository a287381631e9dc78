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

use crate::error::Result;
use crate::locking::spin_lock::TicketSpinLock;
use log::warn;
use std::marker::PhantomData;

/// RAII guard that exits a [`TicketSpinLock`] when dropped.
///
/// Not `Send`: an owner-tracked lock must be released by the thread that
/// acquired it.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct SpinLockGuard<'a> {
    lock: &'a TicketSpinLock,
    released: bool,
    _not_send: PhantomData<*const ()>,
}

impl<'a> SpinLockGuard<'a> {
    pub(crate) fn new(lock: &'a TicketSpinLock) -> Self {
        Self {
            lock,
            released: false,
            _not_send: PhantomData,
        }
    }

    pub fn lock(&self) -> &'a TicketSpinLock {
        self.lock
    }

    pub fn release(self) -> Result<()> {
        self.release_with_barrier(false)
    }

    pub fn release_with_barrier(mut self, use_memory_barrier: bool) -> Result<()> {
        self.released = true;
        self.lock.exit_with_barrier(use_memory_barrier)
    }
}

impl Drop for SpinLockGuard<'_> {
    fn drop(&mut self) {
        if !self.released
            && let Err(err) = self.lock.exit()
        {
            warn!("Failed to release spin lock on guard drop: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn guard_releases_on_drop() {
        let lock = TicketSpinLock::new(true);
        {
            let guard = lock.lock().unwrap();
            assert!(guard.lock().is_held_by_current_thread());
        }
        assert!(!lock.is_held());
    }

    #[test]
    fn explicit_release_reports_result_once() {
        let lock = TicketSpinLock::new(true);
        let guard = lock.try_lock().unwrap().expect("free lock");
        guard.release_with_barrier(true).unwrap();
        assert!(!lock.is_held());
        assert_eq!(lock.snapshot().serve, 1);
    }

    #[test]
    fn contended_try_lock_yields_none() {
        let lock = TicketSpinLock::new(false);
        let _held = lock.lock().unwrap();
        let attempt = std::thread::scope(|scope| {
            scope
                .spawn(|| lock.try_lock_for(Duration::from_millis(2)).map(|g| g.is_none()))
                .join()
                .unwrap()
        });
        assert!(attempt.unwrap());
    }
}
