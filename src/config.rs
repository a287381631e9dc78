use crate::error::{Result, SpinLockError};
use crate::locking::timeout::{
    SpinTimeout, SpinTimeoutResolution, SpinTimeoutResolver, parse_timeout_override,
};
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const TRY_TIMEOUT_ENV: &str = "TICKET_SPIN_TRY_TIMEOUT";

const DEFAULT_THREADS: usize = 4;
const DEFAULT_ITERATIONS: u64 = 10_000;
const DEFAULT_HOLD_SPINS: u32 = 16;
const DEFAULT_TRY_TIMEOUT_MS: u64 = 10;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct SpinConfig {
    #[serde(default)]
    pub lock: LockConfig,

    #[serde(default)]
    pub stress: StressConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LockConfig {
    #[serde(default = "default_owner_tracking")]
    pub owner_tracking: bool,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            owner_tracking: default_owner_tracking(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StressConfig {
    #[serde(default = "default_threads")]
    pub threads: usize,

    #[serde(default = "default_iterations")]
    pub iterations: u64,

    /// Busy-loop iterations performed while holding the lock.
    #[serde(default = "default_hold_spins")]
    pub hold_spins: u32,

    /// Milliseconds, `-1`, or `infinite`.
    #[serde(default = "default_try_timeout")]
    pub try_timeout: String,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            iterations: default_iterations(),
            hold_spins: default_hold_spins(),
            try_timeout: default_try_timeout(),
        }
    }
}

fn default_owner_tracking() -> bool {
    true
}

fn default_threads() -> usize {
    DEFAULT_THREADS
}

fn default_iterations() -> u64 {
    DEFAULT_ITERATIONS
}

fn default_hold_spins() -> u32 {
    DEFAULT_HOLD_SPINS
}

fn default_try_timeout() -> String {
    DEFAULT_TRY_TIMEOUT_MS.to_string()
}

impl SpinConfig {
    /// Loads the config at `path`, falling back to defaults when it is absent.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("Config file not found at {path:?}, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let config: SpinConfig = toml::from_str(&contents).map_err(|e| {
            SpinLockError::ConfigError(format!("Failed to parse {}: {e}", path.display()))
        })?;
        config.validate()?;

        log::debug!("Loaded config from {path:?}");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.stress.threads == 0 {
            return Err(SpinLockError::ConfigError(
                "stress.threads must be at least 1".to_string(),
            ));
        }
        self.configured_try_timeout().map(|_| ())
    }

    pub fn configured_try_timeout(&self) -> Result<SpinTimeout> {
        parse_timeout_override(&self.stress.try_timeout)
            .map_err(|e| SpinLockError::ConfigError(format!("stress.try_timeout: {e}")))
    }

    /// Resolves the try-enter timeout: CLI > environment > config > default.
    pub fn resolve_try_timeout(&self, cli_override: Option<&str>) -> Result<SpinTimeoutResolution> {
        let env_value = std::env::var(TRY_TIMEOUT_ENV).ok();
        SpinTimeoutResolver::new(
            cli_override,
            env_value.as_deref(),
            self.configured_try_timeout()?,
            SpinTimeout::from_millis_unchecked(DEFAULT_TRY_TIMEOUT_MS),
        )
        .resolve()
    }
}
