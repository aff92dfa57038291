//! Version enumeration for the check command.
//!
//! A version is a commit that changed the pool subtree. Commits that only
//! touch other parts of the branch (or other pools sharing it) are skipped.
//!
//! A commit is a boundary when:
//! - it has no parents and the pool exists in it, or
//! - any parent's pool subtree differs from its own.
//!
//! Subtree hashes for the whole history are fetched in one batch and looked
//! up by commit, so shared ancestors of merges are resolved once.

mod git;


pub use git::GitHistory;

use crate::error::Result;
use crate::store::Position;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// A commit and its parent ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitNode {
    pub id: String,
    pub parents: Vec<String>,
}

impl CommitNode {
    pub fn new(id: impl Into<String>, parents: &[&str]) -> Self {
        Self {
            id: id.into(),
            parents: parents.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// Read access to a branch history.
pub trait CommitGraph {
    /// Every commit reachable from the tip, parents before children.
    fn commits(&self) -> Result<Vec<CommitNode>>;

    /// Content hash of `path` at each of `commits`, in order, with `None`
    /// where the path does not exist.
    fn subtree_hashes(&self, commits: &[&str], path: &str) -> Result<Vec<Option<String>>>;
}

/// Subtree hash of `pool` for every commit and parent in `commits`.
fn subtree_hashes<G: CommitGraph + ?Sized>(
    graph: &G,
    commits: &[CommitNode],
    pool: &str,
) -> Result<HashMap<String, Option<String>>> {
    let mut seen = HashSet::new();
    let ids: Vec<&str> = commits
        .iter()
        .flat_map(|c| std::iter::once(&c.id).chain(&c.parents))
        .map(String::as_str)
        .filter(|id| seen.insert(*id))
        .collect();

    let hashes = graph.subtree_hashes(&ids, pool)?;
    Ok(ids.into_iter().map(str::to_string).zip(hashes).collect())
}

/// Commits that changed `pool`, oldest first.
pub fn version_boundaries<G: CommitGraph + ?Sized>(graph: &G, pool: &str) -> Result<Vec<Position>> {
    let commits = graph.commits()?;
    let hashes = subtree_hashes(graph, &commits, pool)?;
    let hash_of = |id: &str| hashes.get(id).cloned().flatten();

    let boundaries = commits
        .iter()
        .filter(|commit| {
            let own = hash_of(&commit.id);
            if commit.parents.is_empty() {
                own.is_some()
            } else {
                commit.parents.iter().any(|parent| hash_of(parent) != own)
            }
        })
        .map(|commit| Position::new(&commit.id))
        .collect();

    Ok(boundaries)
}

/// Pick the versions to report given the caller's last known position.
///
/// A known `previous` yields it and everything newer. No `previous`, or one
/// that is not a boundary, yields only the newest boundary.
pub fn select_versions(boundaries: Vec<Position>, previous: Option<&Position>) -> Vec<Position> {
    if let Some(previous) = previous {
        if let Some(index) = boundaries.iter().position(|b| b == previous) {
            return boundaries[index..].to_vec();
        }
        debug!(previous = %previous, "previous version not found in history, resynchronizing");
    }

    boundaries.into_iter().last().into_iter().collect()
}

/// Versions of `pool` to report for a check.
pub fn enumerate_versions<G: CommitGraph + ?Sized>(
    graph: &G,
    pool: &str,
    previous: Option<&Position>,
) -> Result<Vec<Position>> {
    let boundaries = version_boundaries(graph, pool)?;
    debug!(pool = %pool, boundaries = boundaries.len(), "computed version boundaries");
    Ok(select_versions(boundaries, previous))
}
