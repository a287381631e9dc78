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

use dashmap::DashSet;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Tickets that were drawn and then abandoned before their holder acquired.
///
/// The backing set is created on the first abandonment. Every participant
/// may skip an entry; whoever removes a ticket owns the duty of advancing
/// `serve` past it.
#[derive(Debug, Default)]
pub(crate) struct StallRegistry {
    tickets: OnceLock<DashSet<u32>>,
    pending: AtomicUsize,
}

impl StallRegistry {
    pub(crate) const fn new() -> Self {
        Self {
            tickets: OnceLock::new(),
            pending: AtomicUsize::new(0),
        }
    }

    /// Records an abandoned ticket, creating the set on first use.
    ///
    /// Returns `false` if the ticket was already registered.
    pub(crate) fn record(&self, ticket: u32) -> bool {
        // Count first so `pending` never drops below the number of entries.
        self.pending.fetch_add(1, Ordering::SeqCst);
        let inserted = self.tickets.get_or_init(DashSet::new).insert(ticket);
        if !inserted {
            self.pending.fetch_sub(1, Ordering::SeqCst);
        }
        inserted
    }

    /// Removes `ticket` if it is registered. Never allocates the set.
    pub(crate) fn try_skip(&self, ticket: u32) -> bool {
        if self.pending.load(Ordering::SeqCst) == 0 {
            return false;
        }
        let Some(tickets) = self.tickets.get() else {
            return false;
        };
        if tickets.remove(&ticket).is_some() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            true
        } else {
            false
        }
    }

    pub(crate) fn pending(&self) -> usize {
        self.pending.load(Ordering::Relaxed)
    }

    #[cfg(test)]
    pub(crate) fn is_initialized(&self) -> bool {
        self.tickets.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn skip_without_entries_leaves_set_uninitialized() {
        let registry = StallRegistry::new();
        assert!(!registry.try_skip(0));
        assert!(!registry.is_initialized());
    }

    #[test]
    fn record_then_skip_once() {
        let registry = StallRegistry::new();
        assert!(registry.record(4));
        assert!(!registry.record(4));
        assert_eq!(registry.pending(), 1);

        assert!(!registry.try_skip(5));
        assert!(registry.try_skip(4));
        assert!(!registry.try_skip(4));
        assert_eq!(registry.pending(), 0);
        assert!(registry.is_initialized());
    }

    #[test]
    fn concurrent_skippers_remove_each_ticket_once() {
        let registry = Arc::new(StallRegistry::new());
        for ticket in 0..64 {
            registry.record(ticket);
        }

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || (0..64).filter(|t| registry.try_skip(*t)).count())
            })
            .collect();

        let removed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(removed, 64);
        assert_eq!(registry.pending(), 0);
    }

    #[test]
    fn racing_first_records_share_one_set() {
        let registry = Arc::new(StallRegistry::new());
        let handles: Vec<_> = (0..8u32)
            .map(|ticket| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.record(ticket))
            })
            .collect();

        assert!(handles.into_iter().all(|h| h.join().unwrap()));
        assert_eq!(registry.pending(), 8);
        for ticket in 0..8 {
            assert!(registry.try_skip(ticket));
        }
    }
}
