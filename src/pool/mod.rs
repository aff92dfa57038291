//! Lock pool subsystem.
//!
//! A pool is a directory in the pool branch with two state directories:
//!
//! ```text
//! <pool>/
//!   unclaimed/<lock>   available locks
//!   claimed/<lock>     locks held by a build
//! ```
//!
//! Lock files are opaque byte blobs; hidden files (such as `.gitkeep`) are
//! never treated as locks. A lock name appears in at most one of the two
//! directories at any pushed position.
//!
//! # Layers
//!
//! - [`LockHandler`] performs exactly one local mutation and commit.
//! - [`perform_robust_action`] wraps a mutation in the reset / mutate / push
//!   retry loop until the change lands on the remote.
//! - [`LockPool`] is the public operation surface used by the `out` command.

mod coordinator;
mod descriptor;
mod executor;
mod handler;

pub use coordinator::LockPool;
pub use descriptor::{read_lock_contents, read_lock_name, validate_lock_name};
pub use executor::{MAX_UNEXPECTED_ERRORS, Step, perform_robust_action};
pub use handler::LockHandler;

/// Which state directory a lock lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Unclaimed,
    Claimed,
}

impl LockState {
    /// Directory name of this state inside the pool.
    pub fn dir_name(&self) -> &'static str {
        match self {
            LockState::Unclaimed => "unclaimed",
            LockState::Claimed => "claimed",
        }
    }
}

impl std::fmt::Display for LockState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}
