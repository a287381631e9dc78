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

//! Process-wide monotonic clock shared by every lock instance.

use std::sync::OnceLock;
use std::time::{Duration, Instant};

static EPOCH: OnceLock<Instant> = OnceLock::new();

/// Time elapsed since the clock was first read in this process.
pub fn elapsed() -> Duration {
    EPOCH.get_or_init(Instant::now).elapsed()
}

/// Stopwatch started against the shared clock.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    started_at: Duration,
}

impl Stopwatch {
    pub fn start() -> Self {
        Self {
            started_at: elapsed(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        elapsed().saturating_sub(self.started_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn clock_is_monotonic() {
        let first = elapsed();
        thread::sleep(Duration::from_millis(2));
        assert!(elapsed() > first);
    }

    #[test]
    fn stopwatch_measures_from_its_start() {
        let watch = Stopwatch::start();
        thread::sleep(Duration::from_millis(5));
        assert!(watch.elapsed() >= Duration::from_millis(5));
    }
}
