//! Git command runner for lockpool.
//!
//! Provides a wrapper around git commands with captured stdout/stderr
//! and structured error handling. All git operations should go through this module.

use crate::error::{PoolError, Result};
use std::path::Path;
use std::io::Write;
use std::process::{Command, Output, Stdio};
use std::thread;

/// Captured output of a git command.
#[derive(Debug, Clone)]
pub struct GitOutput {
    /// Standard output from the command (trimmed).
    pub stdout: String,
    /// Standard error from the command (trimmed).
    pub stderr: String,
}

impl GitOutput {
    fn from_output(output: &Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    }

    /// Returns stdout lines as a vector.
    pub fn lines(&self) -> Vec<&str> {
        if self.stdout.is_empty() {
            Vec::new()
        } else {
            self.stdout.lines().collect()
        }
    }

    /// Stdout and stderr joined, for diagnostics.
    pub fn combined(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (true, _) => self.stderr.clone(),
            (false, true) => self.stdout.clone(),
            (false, false) => format!("{}\n{}", self.stdout, self.stderr),
        }
    }
}

/// Outcome of a git command whose exit status the caller wants to inspect.
#[derive(Debug, Clone)]
pub struct GitStatus {
    pub success: bool,
    pub code: Option<i32>,
    pub output: GitOutput,
}

/// Run a git command with the specified working directory.
///
/// # Returns
///
/// * `Ok(GitOutput)` - On successful execution (exit code 0)
/// * `Err(PoolError::GitError)` - On non-zero exit code or spawn failure
pub fn run_git<P: AsRef<Path>>(cwd: P, args: &[&str]) -> Result<GitOutput> {
    run_git_with_env(cwd, args, &[])
}

/// Run a git command with extra environment variables.
pub fn run_git_with_env<P: AsRef<Path>>(
    cwd: P,
    args: &[&str],
    envs: &[(String, String)],
) -> Result<GitOutput> {
    let status = run_git_status(cwd, args, envs)?;

    if status.success {
        Ok(status.output)
    } else {
        let error_msg = if status.output.stderr.is_empty() {
            status.output.stdout.clone()
        } else {
            status.output.stderr.clone()
        };

        Err(PoolError::GitError(format!(
            "git {} failed (exit code {}): {}",
            args.first().unwrap_or(&""),
            status.code.unwrap_or(-1),
            error_msg
        )))
    }
}

/// Run a git command and return its exit status alongside the output.
///
/// Only a failure to spawn git is an error; a non-zero exit is reported
/// through `GitStatus::success`.
pub fn run_git_status<P: AsRef<Path>>(
    cwd: P,
    args: &[&str],
    envs: &[(String, String)],
) -> Result<GitStatus> {
    let output = Command::new("git")
        .current_dir(cwd.as_ref())
        .args(args)
        .envs(envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .output()
        .map_err(|e| {
            PoolError::GitError(format!(
                "failed to execute git {}: {}",
                args.first().unwrap_or(&""),
                e
            ))
        })?;

    Ok(GitStatus {
        success: output.status.success(),
        code: output.status.code(),
        output: GitOutput::from_output(&output),
    })
}

/// Run a git command with `input` written to its stdin.
///
/// Stdin is fed from a separate thread so a large response cannot stall
/// the writer.
pub fn run_git_with_input<P: AsRef<Path>>(
    cwd: P,
    args: &[&str],
    input: String,
) -> Result<GitOutput> {
    let command = args.first().copied().unwrap_or("");
    let spawn_error =
        |e: std::io::Error| PoolError::GitError(format!("failed to execute git {}: {}", command, e));

    let mut child = Command::new("git")
        .current_dir(cwd.as_ref())
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(spawn_error)?;

    let stdin = child.stdin.take();
    let writer = thread::spawn(move || match stdin {
        Some(mut stdin) => stdin.write_all(input.as_bytes()),
        None => Ok(()),
    });

    let output = child.wait_with_output().map_err(spawn_error)?;
    let written = writer
        .join()
        .map_err(|_| PoolError::GitError(format!("stdin writer for git {} panicked", command)))?;
    let git_output = GitOutput::from_output(&output);

    if !output.status.success() {
        return Err(PoolError::GitError(format!(
            "git {} failed (exit code {}): {}",
            command,
            output.status.code().unwrap_or(-1),
            git_output.combined()
        )));
    }
    written.map_err(|e| PoolError::GitError(format!("failed to write to git {}: {}", command, e)))?;

    Ok(git_output)
}

/// Clone `uri` at `branch` into `dest`.
pub fn clone_branch(
    uri: &str,
    branch: &str,
    dest: &Path,
    envs: &[(String, String)],
) -> Result<()> {
    let dest_str = dest.to_string_lossy().to_string();
    let parent = dest.parent().unwrap_or(dest);

    run_git_with_env(
        parent,
        &["clone", "--branch", branch, uri, &dest_str],
        envs,
    )
    .map_err(|e| PoolError::GitError(format!("failed to clone '{}' ({}): {}", uri, branch, e)))?;

    Ok(())
}

/// Resolve `rev` to a full commit SHA.
pub fn rev_parse<P: AsRef<Path>>(cwd: P, rev: &str) -> Result<String> {
    Ok(run_git(cwd, &["rev-parse", rev])?.stdout)
}

/// Raw bytes of the blob `<rev>:<path>`, or `None` if it does not exist.
pub fn read_blob<P: AsRef<Path>>(cwd: P, rev: &str, path: &str) -> Result<Option<Vec<u8>>> {
    let object = format!("{}:{}", rev, path);
    let output = Command::new("git")
        .current_dir(cwd.as_ref())
        .args(["cat-file", "blob", &object])
        .output()
        .map_err(|e| PoolError::GitError(format!("failed to execute git cat-file: {}", e)))?;

    Ok(output.status.success().then_some(output.stdout))
}
