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

//! Busy-wait ticket lock for very short critical sections.
//!
//! [`TicketSpinLock`] serves `enter` callers strictly in ticket order, offers
//! bounded `try_enter` variants, optionally tracks the owning thread, and
//! keeps its ticket sequence moving when a waiter gives up after drawing a
//! ticket.
//!
//! ```
//! use ticket_spin::TicketSpinLock;
//!
//! let lock = TicketSpinLock::new(true);
//! let mut taken = false;
//! lock.enter(&mut taken).unwrap();
//! assert!(lock.is_held_by_current_thread());
//! lock.exit().unwrap();
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod locking;
pub mod logging;

pub use error::{Result, SpinLockError};
pub use locking::{SpinLockGuard, TicketSpinLock};
