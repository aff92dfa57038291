//! Exit code constants for the lockpool CLI.
//!
//! - 0: Success
//! - 1: User error (bad request, missing descriptor files)
//! - 3: Git operation failure (clone, reset, commit)
//! - 4: Lock failure (pool state could not be broadcast)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: malformed request, invalid source, unreadable descriptor.
pub const USER_ERROR: i32 = 1;

/// Git operation failure: clone, fetch, reset, or commit errors.
pub const GIT_FAILURE: i32 = 3;

/// Lock failure: the pool mutation could not be pushed to the remote.
pub const LOCK_FAILURE: i32 = 4;
