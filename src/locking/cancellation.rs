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

use log::{debug, warn};
use signal_hook::SigId;
use signal_hook::consts::signal::{SIGINT, SIGTERM};
use signal_hook::flag;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

#[cfg(windows)]
use signal_hook::consts::signal::SIGBREAK;

/// Token a spinning waiter polls to learn it should abandon its ticket.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    pub(crate) fn from_shared(flag: Arc<AtomicBool>) -> Self {
        Self { flag }
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(windows)]
const CANCEL_SIGNALS: &[i32] = &[SIGINT, SIGTERM, SIGBREAK];
#[cfg(not(windows))]
const CANCEL_SIGNALS: &[i32] = &[SIGINT, SIGTERM];

/// Shared flag wired to the process termination signals.
#[derive(Debug)]
struct SignalFlag {
    flag: Arc<AtomicBool>,
    _registrations: Vec<SigId>,
}

impl SignalFlag {
    fn install() -> Self {
        let flag = Arc::new(AtomicBool::new(false));
        let registrations: Vec<SigId> = CANCEL_SIGNALS
            .iter()
            .filter_map(|signal| match flag::register(*signal, Arc::clone(&flag)) {
                Ok(id) => Some(id),
                Err(err) => {
                    warn!("Failed to register cancellation handler for signal {signal}: {err}");
                    None
                }
            })
            .collect();
        debug!(
            "Installed {} cancellation signal handler(s)",
            registrations.len()
        );

        Self {
            flag,
            _registrations: registrations,
        }
    }
}

static SIGNAL_FLAG: OnceLock<SignalFlag> = OnceLock::new();

/// Returns a token tripped by SIGINT/SIGTERM, installing the handlers on first use.
pub fn global_token() -> CancellationToken {
    let installed = SIGNAL_FLAG.get_or_init(SignalFlag::install);
    CancellationToken::from_shared(Arc::clone(&installed.flag))
}
