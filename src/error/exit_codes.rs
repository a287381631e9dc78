use crate::error::SpinLockError;

pub fn get_exit_code(error: &SpinLockError) -> i32 {
    match error {
        SpinLockError::InvalidArgument(_)
        | SpinLockError::InvalidTimeout(_)
        | SpinLockError::ConfigError(_) => 2,

        SpinLockError::StressFailure(_) => 3,

        SpinLockError::LockTakenAlreadySet
        | SpinLockError::Recursion
        | SpinLockError::NotOwner => 4,

        SpinLockError::Cancelled { .. } => 130, // Conventional SIGINT exit code

        _ => 1,
    }
}
