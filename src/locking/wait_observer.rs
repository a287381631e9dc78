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

//! Observer interfaces for spin wait instrumentation.
//!
//! Observers are only consulted when a caller attaches one to a request, so
//! the plain `enter`/`try_enter` paths pay nothing for them. Hooks run on the
//! waiting thread; a hook that panics unwinds out of the acquisition and the
//! drawn ticket is handed to the stall registry on the way out.

use crate::locking::timeout::SpinTimeout;
use log::{debug, trace};
use std::time::Duration;

/// Observer hooks for spin wait events.
pub trait SpinWaitObserver: Send + Sync {
    fn on_ticket_drawn(&self, _ticket: u32) {}

    /// Called once per spin iteration while `ticket` is not yet served.
    fn on_spin(&self, _ticket: u32, _serving: u32, _iteration: u64) {}

    fn on_stalled_skipped(&self, _stalled: u32) {}

    fn on_acquired(&self, _ticket: u32, _waited: Duration) {}

    fn on_timeout(&self, _timeout: SpinTimeout, _waited: Duration) {}

    fn on_abandoned(&self, _ticket: u32, _waited: Duration) {}
}

/// Observer implementation that performs no work.
#[derive(Debug, Default)]
pub struct NoopSpinWaitObserver;

impl SpinWaitObserver for NoopSpinWaitObserver {}

/// Observer that forwards wait events to the `log` facade.
#[derive(Debug, Default)]
pub struct LoggingSpinWaitObserver {
    label: String,
}

impl LoggingSpinWaitObserver {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl SpinWaitObserver for LoggingSpinWaitObserver {
    fn on_ticket_drawn(&self, ticket: u32) {
        trace!("[{}] drew ticket {ticket}", self.label);
    }

    fn on_stalled_skipped(&self, stalled: u32) {
        debug!("[{}] skipped stalled ticket {stalled}", self.label);
    }

    fn on_acquired(&self, ticket: u32, waited: Duration) {
        debug!(
            "[{}] acquired with ticket {ticket} after {:.3}ms",
            self.label,
            waited.as_secs_f64() * 1_000.0
        );
    }

    fn on_timeout(&self, timeout: SpinTimeout, waited: Duration) {
        debug!(
            "[{}] gave up after {:.3}ms (timeout {timeout})",
            self.label,
            waited.as_secs_f64() * 1_000.0
        );
    }

    fn on_abandoned(&self, ticket: u32, waited: Duration) {
        debug!(
            "[{}] abandoned ticket {ticket} after {:.3}ms",
            self.label,
            waited.as_secs_f64() * 1_000.0
        );
    }
}
