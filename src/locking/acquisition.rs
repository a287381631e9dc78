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

use crate::locking::cancellation::CancellationToken;
use crate::locking::clock::Stopwatch;
use crate::locking::timeout::SpinTimeout;
use crate::locking::wait_observer::SpinWaitObserver;
use std::time::Duration;

/// Tracks elapsed time against a timeout budget on the shared clock.
#[derive(Debug, Clone, Copy)]
pub struct WaitBudget {
    timeout: SpinTimeout,
    stopwatch: Stopwatch,
}

impl WaitBudget {
    pub fn start(timeout: SpinTimeout) -> Self {
        Self {
            timeout,
            stopwatch: Stopwatch::start(),
        }
    }

    pub fn timeout(&self) -> SpinTimeout {
        self.timeout
    }

    pub fn elapsed(&self) -> Duration {
        self.stopwatch.elapsed()
    }

    pub fn remaining(&self) -> Option<Duration> {
        match self.timeout {
            SpinTimeout::Infinite => None,
            SpinTimeout::Finite(limit) => Some(limit.saturating_sub(self.elapsed())),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.timeout.is_expired(self.elapsed())
    }
}

/// Options for an unconditional, queue-ordered acquisition.
#[derive(Default)]
pub struct EnterRequest<'a> {
    cancellation: Option<CancellationToken>,
    observer: Option<&'a dyn SpinWaitObserver>,
}

impl<'a> EnterRequest<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = Some(cancellation);
        self
    }

    pub fn with_observer(mut self, observer: &'a dyn SpinWaitObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    pub fn observer(&self) -> Option<&'a dyn SpinWaitObserver> {
        self.observer
    }
}

/// Options for a bounded acquisition attempt.
pub struct TryEnterRequest<'a> {
    timeout: SpinTimeout,
    observer: Option<&'a dyn SpinWaitObserver>,
}

impl<'a> TryEnterRequest<'a> {
    pub fn new(timeout: SpinTimeout) -> Self {
        Self {
            timeout,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: &'a dyn SpinWaitObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn timeout(&self) -> SpinTimeout {
        self.timeout
    }

    pub fn observer(&self) -> Option<&'a dyn SpinWaitObserver> {
        self.observer
    }
}

impl Default for TryEnterRequest<'_> {
    fn default() -> Self {
        Self::new(SpinTimeout::ZERO)
    }
}
