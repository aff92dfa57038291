//! Remote store client.
//!
//! The pool's only shared state is a branch in a remote repository. Every
//! mutation is made in a disposable working clone and then published with a
//! push, which the remote accepts only if the clone was based on the current
//! tip. That push is the compare-and-swap the whole pool relies on, so its
//! outcome is reported as one of three cases:
//!
//! - [`PushOutcome::Accepted`]: the remote branch now points at our commit.
//! - [`PushOutcome::Conflict`]: someone else moved the branch first, or the
//!   remote already holds an identical commit. Both mean "rebuild and retry".
//! - [`PushOutcome::Failed`]: anything else, with the raw diagnostic.

mod classify;
mod git;

pub use classify::classify_push;
pub use git::GitStore;

use crate::error::Result;
use std::fmt;
use std::path::Path;

/// An opaque point in the pool's history (a commit SHA).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Position(String);

impl Position {
    /// Create a position, trimming surrounding whitespace from the reference.
    pub fn new(reference: impl AsRef<str>) -> Self {
        Self(reference.as_ref().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why a push was refused in a way that retrying can fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// The remote ref moved since our last reset (non-fast-forward or ref lock).
    Rejected,
    /// The remote already had our exact commit; another writer produced an
    /// identical advance in the same second.
    UpToDate,
}

/// Result of attempting to advance the remote branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    Accepted,
    Conflict(ConflictKind),
    Failed { diagnostic: String },
}

/// Primitive operations against the replicated pool branch.
///
/// All paths are relative to the root of the working clone.
pub trait RemoteStore {
    /// Materialize a fresh working clone at the tip of the branch.
    fn setup(&mut self) -> Result<()>;

    /// Fetch the branch and discard every local change, committed or not.
    fn reset_to_remote(&mut self) -> Result<()>;

    /// Names of the entries directly inside `dir`, sorted. A missing
    /// directory yields an empty list.
    fn list_dir(&self, dir: &Path) -> Result<Vec<String>>;

    fn exists(&self, path: &Path) -> bool;

    fn move_path(&mut self, from: &Path, to: &Path) -> Result<()>;

    fn write_file(&mut self, path: &Path, contents: &[u8]) -> Result<()>;

    /// Stage `path` for the next commit.
    fn add_path(&mut self, path: &Path) -> Result<()>;

    fn remove_path(&mut self, path: &Path) -> Result<()>;

    /// Commit everything staged. A commit is made even when nothing changed.
    fn commit(&mut self, message: &str) -> Result<()>;

    /// Try to advance the remote branch to the working clone's tip.
    fn push(&mut self) -> PushOutcome;

    /// The working clone's current tip.
    fn current_position(&self) -> Result<Position>;
}
