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

use crate::error::SpinLockError;
use std::fmt;

pub struct ErrorContext<'a> {
    pub error: &'a SpinLockError,
    pub suggestion: Option<String>,
    pub details: Option<String>,
}

impl<'a> ErrorContext<'a> {
    pub fn new(error: &'a SpinLockError) -> Self {
        let (suggestion, details) = match error {
            SpinLockError::LockTakenAlreadySet => (
                Some("Pass a fresh `false` flag to every enter/try_enter call.".to_string()),
                None,
            ),
            SpinLockError::InvalidTimeout(millis) => (
                Some(
                    "Use a non-negative number of milliseconds, or -1 to wait indefinitely."
                        .to_string(),
                ),
                Some(format!("Received timeout: {millis}ms")),
            ),
            SpinLockError::Recursion => (
                Some(
                    "The lock is not reentrant. Release it before acquiring it again on the same \
                     thread."
                        .to_string(),
                ),
                None,
            ),
            SpinLockError::NotOwner => (
                Some(
                    "Release the lock from the thread that acquired it, or disable owner \
                     tracking."
                        .to_string(),
                ),
                None,
            ),
            SpinLockError::Cancelled { ticket } => (
                None,
                Some(format!(
                    "Ticket {ticket} was registered as stalled and will be skipped by other \
                     waiters."
                )),
            ),
            SpinLockError::InvalidArgument(msg) => (
                Some("Run 'ticket-spin --help' to see accepted values.".to_string()),
                Some(msg.clone()),
            ),
            SpinLockError::ConfigError(msg) => (
                Some(
                    "Check the TOML file passed with --config; unknown or malformed keys are \
                     rejected."
                        .to_string(),
                ),
                Some(msg.clone()),
            ),
            SpinLockError::StressFailure(msg) => (
                Some(
                    "Re-run with -vv to log ticket activity, and report the configuration \
                     if it reproduces."
                        .to_string(),
                ),
                Some(msg.clone()),
            ),
            SpinLockError::Io(io_err) => {
                let suggestion = match io_err.kind() {
                    std::io::ErrorKind::NotFound => Some(
                        "Ensure the file or directory exists and the path is correct.".to_string(),
                    ),
                    std::io::ErrorKind::PermissionDenied => {
                        Some("Check file permissions.".to_string())
                    }
                    _ => None,
                };
                (suggestion, Some(format!("I/O error: {io_err}")))
            }
            SpinLockError::Json(json_err) => (None, Some(format!("JSON error: {json_err}"))),
        };

        Self {
            error,
            suggestion,
            details,
        }
    }
}

impl<'a> fmt::Display for ErrorContext<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error: {}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\n\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\n\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}
