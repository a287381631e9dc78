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
use std::fmt;
use std::time::Duration;

/// Millisecond value meaning "wait indefinitely".
pub const INFINITE_MILLIS: i64 = -1;

/// Wait budget for a bounded acquisition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpinTimeout {
    Finite(Duration),
    Infinite,
}

impl SpinTimeout {
    pub const ZERO: SpinTimeout = SpinTimeout::Finite(Duration::ZERO);

    pub const fn from_millis_unchecked(millis: u64) -> Self {
        Self::Finite(Duration::from_millis(millis))
    }

    /// Interprets a millisecond count where `-1` means infinite.
    pub fn from_millis(millis: i64) -> Result<Self> {
        match millis {
            INFINITE_MILLIS => Ok(Self::Infinite),
            m if m < INFINITE_MILLIS => Err(SpinLockError::InvalidTimeout(m)),
            m => Ok(Self::Finite(Duration::from_millis(m as u64))),
        }
    }

    /// Millisecond form, `-1` for infinite. Saturates at `i64::MAX`.
    pub fn as_millis(&self) -> i64 {
        match self {
            SpinTimeout::Infinite => INFINITE_MILLIS,
            SpinTimeout::Finite(duration) => {
                i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
            }
        }
    }

    pub fn as_duration(&self) -> Duration {
        match self {
            SpinTimeout::Finite(duration) => *duration,
            SpinTimeout::Infinite => Duration::MAX,
        }
    }

    pub fn is_infinite(&self) -> bool {
        matches!(self, SpinTimeout::Infinite)
    }

    pub fn is_expired(&self, waited: Duration) -> bool {
        matches!(self, SpinTimeout::Finite(limit) if waited >= *limit)
    }
}

impl From<Duration> for SpinTimeout {
    /// `Duration::MAX` stands in for the infinite sentinel.
    fn from(duration: Duration) -> Self {
        if duration == Duration::MAX {
            SpinTimeout::Infinite
        } else {
            SpinTimeout::Finite(duration)
        }
    }
}

impl From<Option<Duration>> for SpinTimeout {
    fn from(duration: Option<Duration>) -> Self {
        duration.map_or(SpinTimeout::Infinite, SpinTimeout::from)
    }
}

impl fmt::Display for SpinTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpinTimeout::Infinite => f.write_str("infinite"),
            SpinTimeout::Finite(duration) => write!(f, "{}ms", duration.as_millis()),
        }
    }
}

/// Source precedence used when resolving the effective timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpinTimeoutSource {
    #[default]
    Default,
    Config,
    Environment,
    Cli,
}

impl fmt::Display for SpinTimeoutSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SpinTimeoutSource::Default => "built-in default",
            SpinTimeoutSource::Config => "configuration file",
            SpinTimeoutSource::Environment => "environment variable",
            SpinTimeoutSource::Cli => "CLI flag",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpinTimeoutResolution {
    pub value: SpinTimeout,
    pub source: SpinTimeoutSource,
}

/// Parses a timeout override given as milliseconds or the word `infinite`.
pub fn parse_timeout_override(value: &str) -> Result<SpinTimeout> {
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case("infinite") {
        return Ok(SpinTimeout::Infinite);
    }

    match trimmed.parse::<i64>() {
        Ok(millis) => SpinTimeout::from_millis(millis),
        Err(_) => Err(SpinLockError::InvalidArgument(format!(
            "Timeout value '{trimmed}' is invalid. Use an integer number of milliseconds, -1, \
             or the word 'infinite'."
        ))),
    }
}

/// Resolves the effective timeout based on CLI > env > config > default precedence.
pub struct SpinTimeoutResolver<'a> {
    cli_override: Option<&'a str>,
    env_override: Option<&'a str>,
    config_value: SpinTimeout,
    default_value: SpinTimeout,
}

impl<'a> SpinTimeoutResolver<'a> {
    pub fn new(
        cli_override: Option<&'a str>,
        env_override: Option<&'a str>,
        config_value: SpinTimeout,
        default_value: SpinTimeout,
    ) -> Self {
        Self {
            cli_override,
            env_override,
            config_value,
            default_value,
        }
    }

    pub fn resolve(self) -> Result<SpinTimeoutResolution> {
        if let Some(cli_value) = self.cli_override {
            let value = parse_timeout_override(cli_value)?;
            return Ok(SpinTimeoutResolution {
                value,
                source: SpinTimeoutSource::Cli,
            });
        }

        if let Some(env_value) = self.env_override {
            let value = parse_timeout_override(env_value)?;
            return Ok(SpinTimeoutResolution {
                value,
                source: SpinTimeoutSource::Environment,
            });
        }

        if self.config_value != self.default_value {
            return Ok(SpinTimeoutResolution {
                value: self.config_value,
                source: SpinTimeoutSource::Config,
            });
        }

        Ok(SpinTimeoutResolution {
            value: self.default_value,
            source: SpinTimeoutSource::Default,
        })
    }
}
