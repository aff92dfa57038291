//! Error types for lockpool.
//!
//! Uses thiserror for derive macros. Contention (`NoLocksAvailable`) is a
//! variant here so mutators can signal it with `?`, but the executor treats it
//! as a wait, never as a failure.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for lockpool operations.
#[derive(Error, Debug)]
pub enum PoolError {
    /// Invalid request, invalid source, or an unreadable descriptor file.
    #[error("{0}")]
    UserError(String),

    /// A git command failed.
    #[error("Git operation failed: {0}")]
    GitError(String),

    /// No lock in the requested state is currently available.
    #[error("No locks to claim")]
    NoLocksAvailable,

    /// The pool mutation could not be pushed after repeated unexpected failures.
    #[error("too many unexpected errors broadcasting lock state: {diagnostic}")]
    TooManyUnexpectedErrors { diagnostic: String },
}

impl PoolError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            PoolError::UserError(_) => exit_codes::USER_ERROR,
            PoolError::GitError(_) => exit_codes::GIT_FAILURE,
            PoolError::NoLocksAvailable => exit_codes::LOCK_FAILURE,
            PoolError::TooManyUnexpectedErrors { .. } => exit_codes::LOCK_FAILURE,
        }
    }
}

/// Result type alias for lockpool operations.
pub type Result<T> = std::result::Result<T, PoolError>;
