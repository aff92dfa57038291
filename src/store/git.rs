//! `RemoteStore` backed by the `git` command line.

use super::{Position, PushOutcome, RemoteStore, classify_push};
use crate::config::Source;
use crate::error::{PoolError, Result};
use crate::git::{self, GitOutput};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

const COMMITTER_NAME: &str = "CI Pool Resource";
const COMMITTER_EMAIL: &str = "ci-pool@localhost";

/// A disposable working clone of the pool branch.
///
/// The clone and any key material live in a scratch directory that is
/// removed when the store is dropped.
pub struct GitStore {
    uri: String,
    branch: String,
    private_key: Option<String>,
    scratch: Option<TempDir>,
    envs: Vec<(String, String)>,
}

impl GitStore {
    pub fn new(uri: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            branch: branch.into(),
            private_key: None,
            scratch: None,
            envs: Vec::new(),
        }
    }

    pub fn from_source(source: &Source) -> Self {
        Self::new(&source.uri, &source.branch).with_private_key(source.private_key.clone())
    }

    pub fn with_private_key(mut self, private_key: Option<String>) -> Self {
        self.private_key = private_key.filter(|key| !key.trim().is_empty());
        self
    }

    /// Root of the working clone.
    pub fn workdir(&self) -> Result<PathBuf> {
        self.scratch
            .as_ref()
            .map(|scratch| scratch.path().join("repo"))
            .ok_or_else(|| PoolError::GitError("working clone has not been set up".to_string()))
    }

    fn git(&self, args: &[&str]) -> Result<GitOutput> {
        git::run_git_with_env(self.workdir()?, args, &self.envs)
    }

    fn install_private_key(&mut self, scratch: &Path) -> Result<()> {
        let Some(key) = &self.private_key else {
            return Ok(());
        };

        let key_path = scratch.join("private_key");
        let mut contents = key.clone();
        if !contents.ends_with('\n') {
            contents.push('\n');
        }
        crate::fs::atomic_write(&key_path, contents.as_bytes())?;
        restrict_permissions(&key_path)?;

        self.envs.push((
            "GIT_SSH_COMMAND".to_string(),
            format!(
                "ssh -i {} -o StrictHostKeyChecking=no -o UserKnownHostsFile=/dev/null",
                key_path.display()
            ),
        ));
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| {
        PoolError::UserError(format!(
            "failed to restrict permissions on '{}': {}",
            path.display(),
            e
        ))
    })
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

impl RemoteStore for GitStore {
    fn setup(&mut self) -> Result<()> {
        let scratch = tempfile::Builder::new()
            .prefix("lockpool")
            .tempdir()
            .map_err(|e| PoolError::UserError(format!("failed to create scratch directory: {}", e)))?;

        self.envs.clear();
        self.install_private_key(scratch.path())?;

        let repo = scratch.path().join("repo");
        git::clone_branch(&self.uri, &self.branch, &repo, &self.envs)?;
        self.scratch = Some(scratch);

        self.git(&["config", "user.name", COMMITTER_NAME])?;
        self.git(&["config", "user.email", COMMITTER_EMAIL])?;

        debug!(uri = %self.uri, branch = %self.branch, "cloned pool repository");
        Ok(())
    }

    fn reset_to_remote(&mut self) -> Result<()> {
        let remote_ref = format!("origin/{}", self.branch);
        self.git(&["fetch", "origin", &self.branch])?;
        self.git(&["reset", "--hard", &remote_ref])?;
        self.git(&["clean", "-ffd"])?;
        Ok(())
    }

    fn list_dir(&self, dir: &Path) -> Result<Vec<String>> {
        let full = self.workdir()?.join(dir);
        let entries = match fs::read_dir(&full) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(PoolError::UserError(format!(
                    "failed to read pool directory '{}': {}",
                    full.display(),
                    e
                )));
            }
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                PoolError::UserError(format!("failed to read pool directory entry: {}", e))
            })?;
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        names.sort();
        Ok(names)
    }

    fn exists(&self, path: &Path) -> bool {
        self.workdir()
            .map(|root| root.join(path).exists())
            .unwrap_or(false)
    }

    fn move_path(&mut self, from: &Path, to: &Path) -> Result<()> {
        let root = self.workdir()?;
        if let Some(parent) = root.join(to).parent() {
            fs::create_dir_all(parent).map_err(|e| {
                PoolError::UserError(format!(
                    "failed to create directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let from = from.to_string_lossy().to_string();
        let to = to.to_string_lossy().to_string();
        self.git(&["mv", &from, &to])?;
        Ok(())
    }

    fn write_file(&mut self, path: &Path, contents: &[u8]) -> Result<()> {
        crate::fs::atomic_write(self.workdir()?.join(path), contents)
    }

    fn add_path(&mut self, path: &Path) -> Result<()> {
        let path = path.to_string_lossy().to_string();
        self.git(&["add", "--", &path])?;
        Ok(())
    }

    fn remove_path(&mut self, path: &Path) -> Result<()> {
        let path = path.to_string_lossy().to_string();
        self.git(&["rm", "--", &path])?;
        Ok(())
    }

    fn commit(&mut self, message: &str) -> Result<()> {
        self.git(&["commit", "--allow-empty", "-m", message])?;
        Ok(())
    }

    fn push(&mut self) -> PushOutcome {
        let workdir = match self.workdir() {
            Ok(workdir) => workdir,
            Err(e) => {
                return PushOutcome::Failed {
                    diagnostic: e.to_string(),
                };
            }
        };

        let refspec = format!("HEAD:refs/heads/{}", self.branch);
        match git::run_git_status(
            workdir,
            &["push", "--porcelain", "origin", &refspec],
            &self.envs,
        ) {
            Ok(status) => classify_push(&status),
            Err(e) => PushOutcome::Failed {
                diagnostic: e.to_string(),
            },
        }
    }

    fn current_position(&self) -> Result<Position> {
        Ok(Position::new(git::rev_parse(self.workdir()?, "HEAD")?))
    }
}
