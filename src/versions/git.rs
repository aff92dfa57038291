//! History of a local clone, read through the git CLI.

use super::{CommitGraph, CommitNode};
use crate::error::{PoolError, Result};
use crate::git::{run_git, run_git_with_input};
use std::path::PathBuf;

/// The ancestry of `rev` in the repository at `repo`.
pub struct GitHistory {
    repo: PathBuf,
    rev: String,
}

impl GitHistory {
    pub fn new(repo: impl Into<PathBuf>, rev: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            rev: rev.into(),
        }
    }
}

impl CommitGraph for GitHistory {
    fn commits(&self) -> Result<Vec<CommitNode>> {
        let output = run_git(
            &self.repo,
            &["rev-list", "--topo-order", "--reverse", "--parents", &self.rev],
        )?;

        output
            .lines()
            .into_iter()
            .map(|line| {
                let mut ids = line.split_whitespace();
                let id = ids.next().ok_or_else(|| {
                    PoolError::GitError(format!("unexpected rev-list output: '{}'", line))
                })?;
                Ok(CommitNode {
                    id: id.to_string(),
                    parents: ids.map(str::to_string).collect(),
                })
            })
            .collect()
    }

    fn subtree_hashes(&self, commits: &[&str], path: &str) -> Result<Vec<Option<String>>> {
        if commits.is_empty() {
            return Ok(Vec::new());
        }

        let path = path.trim_matches('/');
        let input: String = commits
            .iter()
            .map(|commit| {
                if path.is_empty() {
                    format!("{}^{{tree}}\n", commit)
                } else {
                    format!("{}:{}\n", commit, path)
                }
            })
            .collect();

        let output = run_git_with_input(&self.repo, &["cat-file", "--batch-check"], input)?;
        let hashes: Vec<Option<String>> = output.lines().into_iter().map(parse_batch_line).collect();

        if hashes.len() != commits.len() {
            return Err(PoolError::GitError(format!(
                "cat-file answered {} of {} objects",
                hashes.len(),
                commits.len()
            )));
        }
        Ok(hashes)
    }
}

/// Object id from a `--batch-check` line; `None` for objects git cannot find.
fn parse_batch_line(line: &str) -> Option<String> {
    if line.ends_with(" missing") || line.ends_with(" ambiguous") {
        return None;
    }
    line.split_whitespace().next().map(str::to_string)
}
