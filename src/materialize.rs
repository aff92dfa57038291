//! Write the lock touched by a pool version into a directory.
//!
//! The destination receives a `name` file and a `metadata` file with the
//! lock's contents at that version. A version that removed the lock yields
//! empty metadata.

use crate::error::{PoolError, Result};
use crate::fs::atomic_write;
use crate::git::{read_blob, run_git, run_git_status};
use crate::pool::LockState;
use crate::store::Position;
use std::path::Path;
use tracing::debug;

/// Name of the lock changed by `position` under `pool`.
///
/// Merges are compared against their first parent, so a lock brought in
/// from another branch still counts as changed.
pub fn changed_lock(repo: &Path, pool: &str, position: &Position) -> Result<String> {
    let pool = pool.trim_matches('/');
    let pathspec = if pool.is_empty() { "." } else { pool };
    let first_parent = format!("{}^1", position.as_str());
    let parent = run_git_status(repo, &["rev-parse", "--verify", "--quiet", &first_parent], &[])?;

    let output = if parent.success {
        run_git(
            repo,
            &[
                "diff",
                "--name-only",
                &parent.output.stdout,
                position.as_str(),
                "--",
                pathspec,
            ],
        )?
    } else {
        run_git(
            repo,
            &["ls-tree", "-r", "--name-only", position.as_str(), "--", pathspec],
        )?
    };

    output
        .lines()
        .into_iter()
        .find_map(|path| lock_name_in(path, pool))
        .ok_or_else(|| {
            PoolError::UserError(format!(
                "version {} does not change any lock in pool '{}'",
                position, pool
            ))
        })
}

/// The lock name if `path` is `<pool>/<state>/<name>` for a visible lock.
fn lock_name_in(path: &str, pool: &str) -> Option<String> {
    let relative = if pool.is_empty() {
        path
    } else {
        path.strip_prefix(pool)?.strip_prefix('/')?
    };

    let (state, name) = relative.split_once('/')?;
    let is_state = [LockState::Claimed, LockState::Unclaimed]
        .iter()
        .any(|s| s.dir_name() == state);

    (is_state && !name.is_empty() && !name.starts_with('.') && !name.contains('/'))
        .then(|| name.to_string())
}

/// Contents of `name` at `position`, whichever state it is in.
fn lock_contents(repo: &Path, pool: &str, position: &Position, name: &str) -> Result<Vec<u8>> {
    let pool = pool.trim_matches('/');
    for state in [LockState::Claimed, LockState::Unclaimed] {
        let path = if pool.is_empty() {
            format!("{}/{}", state.dir_name(), name)
        } else {
            format!("{}/{}/{}", pool, state.dir_name(), name)
        };
        if let Some(contents) = read_blob(repo, position.as_str(), &path)? {
            return Ok(contents);
        }
    }

    debug!(lock = %name, position = %position, "lock no longer exists at version");
    Ok(Vec::new())
}

/// Write `name` and `metadata` for the lock changed by `position` into
/// `destination`, returning the lock name.
pub fn materialize_lock(
    repo: &Path,
    pool: &str,
    position: &Position,
    destination: &Path,
) -> Result<String> {
    let name = changed_lock(repo, pool, position)?;
    let contents = lock_contents(repo, pool, position, &name)?;

    std::fs::create_dir_all(destination).map_err(|e| {
        PoolError::UserError(format!(
            "failed to create destination '{}': {}",
            destination.display(),
            e
        ))
    })?;
    atomic_write(destination.join("name"), name.as_bytes())?;
    atomic_write(destination.join("metadata"), &contents)?;

    Ok(name)
}
