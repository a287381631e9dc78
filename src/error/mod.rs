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

mod context;
mod exit_codes;
mod format;

pub use context::ErrorContext;
pub use exit_codes::get_exit_code;
pub use format::{format_error_chain, format_error_with_color};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpinLockError {
    #[error("lock_taken must be initialized to false")]
    LockTakenAlreadySet,

    #[error("Timeout of {0}ms is a negative number other than -1")]
    InvalidTimeout(i64),

    #[error("Lock is already held by the current thread")]
    Recursion,

    #[error("Current thread is not the owner of this lock")]
    NotOwner,

    #[error("Wait for ticket {ticket} was cancelled")]
    Cancelled { ticket: u32 },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Stress run failed: {0}")]
    StressFailure(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl SpinLockError {
    /// Caller misuse detected before any lock state changed.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            SpinLockError::LockTakenAlreadySet | SpinLockError::InvalidTimeout(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SpinLockError>;
