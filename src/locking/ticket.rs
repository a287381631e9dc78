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

//! Packed ticket counters.
//!
//! The lock keeps both counters in one `AtomicU64`: `serve` (the ticket that
//! may hold the lock) in the low lane and `issue` (the next ticket handed out)
//! in the high lane. Every mutation goes through an atomic primitive on the
//! whole word, and a lane that wraps never carries into its neighbour.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

const LANE_BITS: u32 = 32;
const SERVE_MASK: u64 = 0xFFFF_FFFF;
const ISSUE_ONE: u64 = 1 << LANE_BITS;

/// Decoded view of the packed ticket word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TicketSnapshot {
    pub serve: u32,
    pub issue: u32,
}

impl TicketSnapshot {
    pub const fn new(serve: u32, issue: u32) -> Self {
        Self { serve, issue }
    }

    pub const fn from_word(word: u64) -> Self {
        Self {
            serve: (word & SERVE_MASK) as u32,
            issue: (word >> LANE_BITS) as u32,
        }
    }

    pub const fn to_word(self) -> u64 {
        ((self.issue as u64) << LANE_BITS) | self.serve as u64
    }

    pub const fn is_held(self) -> bool {
        self.serve != self.issue
    }

    /// Threads currently waiting for or holding the lock.
    pub const fn waiters(self) -> u32 {
        self.issue.wrapping_sub(self.serve)
    }
}

impl fmt::Display for TicketSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "serve={} issue={}", self.serve, self.issue)
    }
}

/// Atomic pair of ticket counters.
pub(crate) struct TicketState {
    word: AtomicU64,
}

impl TicketState {
    pub(crate) const fn new() -> Self {
        Self {
            word: AtomicU64::new(0),
        }
    }

    #[cfg(test)]
    pub(crate) const fn with_snapshot(snapshot: TicketSnapshot) -> Self {
        Self {
            word: AtomicU64::new(snapshot.to_word()),
        }
    }

    pub(crate) fn snapshot(&self, order: Ordering) -> TicketSnapshot {
        TicketSnapshot::from_word(self.word.load(order))
    }

    pub(crate) fn serve(&self, order: Ordering) -> u32 {
        self.snapshot(order).serve
    }

    /// Post-increments `issue` and returns the drawn ticket.
    ///
    /// The issue lane is the top half of the word, so the wrapping add drops
    /// its carry off the end instead of disturbing `serve`.
    pub(crate) fn draw(&self) -> u32 {
        let previous = self.word.fetch_add(ISSUE_ONE, Ordering::AcqRel);
        TicketSnapshot::from_word(previous).issue
    }

    /// Advances `serve` by one and returns the new value.
    pub(crate) fn advance_serve(&self, order: Ordering) -> u32 {
        let load_order = match order {
            Ordering::SeqCst => Ordering::SeqCst,
            _ => Ordering::Relaxed,
        };
        let previous = self
            .word
            .fetch_update(order, load_order, |word| {
                let mut snapshot = TicketSnapshot::from_word(word);
                snapshot.serve = snapshot.serve.wrapping_add(1);
                Some(snapshot.to_word())
            })
            .unwrap_or_else(|word| word);
        TicketSnapshot::from_word(previous).serve.wrapping_add(1)
    }

    /// Claims the lock in one step if it is free with `issue == ticket`.
    ///
    /// Swaps `(serve = ticket, issue = ticket)` for
    /// `(serve = ticket, issue = ticket + 1)`.
    pub(crate) fn try_claim(&self, ticket: u32) -> bool {
        let free = TicketSnapshot::new(ticket, ticket);
        let held = TicketSnapshot::new(ticket, ticket.wrapping_add(1));
        self.word
            .compare_exchange(
                free.to_word(),
                held.to_word(),
                Ordering::AcqRel,
                Ordering::Relaxed,
            )
            .is_ok()
    }
}
