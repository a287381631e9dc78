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

use std::sync::atomic::{AtomicU64, Ordering};

/// Sentinel stored while nobody owns the lock.
pub(crate) const NO_OWNER: u64 = 0;

static NEXT_THREAD_TOKEN: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_TOKEN: u64 = NEXT_THREAD_TOKEN.fetch_add(1, Ordering::Relaxed);
}

/// Process-unique, never-zero identity of the calling thread.
pub fn current_thread_token() -> u64 {
    THREAD_TOKEN.with(|token| *token)
}

/// Identity of the thread that currently holds an owner-tracked lock.
#[derive(Debug)]
pub(crate) struct OwnerSlot {
    owner: AtomicU64,
}

impl OwnerSlot {
    pub(crate) const fn new() -> Self {
        Self {
            owner: AtomicU64::new(NO_OWNER),
        }
    }

    pub(crate) fn claim(&self) {
        self.owner.store(current_thread_token(), Ordering::Relaxed);
    }

    pub(crate) fn clear(&self) {
        self.owner.store(NO_OWNER, Ordering::Relaxed);
    }

    pub(crate) fn is_current_thread(&self) -> bool {
        self.owner.load(Ordering::Relaxed) == current_thread_token()
    }

    pub(crate) fn get(&self) -> Option<u64> {
        match self.owner.load(Ordering::Relaxed) {
            NO_OWNER => None,
            token => Some(token),
        }
    }
}
