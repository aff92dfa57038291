use crate::error::{PoolError, Result};
use crate::store::{Position, PushOutcome, RemoteStore};
use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

pub(crate) fn create_test_repo() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path();

    init_main_repo(path);
    std::fs::write(path.join("README.md"), "# Test\n").unwrap();
    git(path, &["add", "."]);
    git(path, &["commit", "-m", "Initial commit"]);

    temp_dir
}

/// A bare remote holding a lock pool on `main`, plus a seed clone used to
/// make changes "from another machine".
pub(crate) struct PoolRemote {
    root: TempDir,
    pool: String,
}

impl PoolRemote {
    pub(crate) fn bare(&self) -> PathBuf {
        self.root.path().join("remote.git")
    }

    fn seed(&self) -> PathBuf {
        self.root.path().join("seed")
    }

    pub(crate) fn uri(&self) -> String {
        self.bare().to_string_lossy().to_string()
    }

    pub(crate) fn head(&self) -> String {
        git_stdout(&self.bare(), &["rev-parse", "refs/heads/main"])
    }

    /// Non-hidden lock names in `state` at the tip of `main`.
    pub(crate) fn locks(&self, state: &str) -> Vec<String> {
        let spec = format!("main:{}/{}", self.pool, state);
        let output = Command::new("git")
            .current_dir(self.bare())
            .args(["ls-tree", "--name-only", &spec])
            .output()
            .unwrap();
        if !output.status.success() {
            return Vec::new();
        }
        String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter(|name| !name.starts_with('.'))
            .map(str::to_string)
            .collect()
    }

    pub(crate) fn lock_contents(&self, state: &str, name: &str) -> Option<String> {
        let spec = format!("main:{}/{}/{}", self.pool, state, name);
        let output = Command::new("git")
            .current_dir(self.bare())
            .args(["show", &spec])
            .output()
            .unwrap();
        output
            .status
            .success()
            .then(|| String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Commit subjects on `main`, newest first.
    pub(crate) fn subjects(&self) -> Vec<String> {
        git_stdout(&self.bare(), &["log", "--format=%s", "main"])
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Apply `change` in the seed clone on top of the current tip and push it.
    pub(crate) fn commit_change(&self, message: &str, change: impl FnOnce(&Path)) -> String {
        let seed = self.seed();
        git(&seed, &["fetch", "origin", "main"]);
        git(&seed, &["reset", "--hard", "origin/main"]);
        change(&seed);
        git(&seed, &["add", "-A"]);
        git(&seed, &["commit", "--allow-empty", "-m", message]);
        git(&seed, &["push", "origin", "HEAD:refs/heads/main"]);
        git_stdout(&seed, &["rev-parse", "HEAD"])
    }

    /// Move a lock between state directories from the seed clone.
    pub(crate) fn move_lock(&self, name: &str, from: &str, to: &str) -> String {
        let pool = self.pool.clone();
        self.commit_change(&format!("moving {}", name), |seed| {
            std::fs::rename(
                seed.join(&pool).join(from).join(name),
                seed.join(&pool).join(to).join(name),
            )
            .unwrap();
        })
    }
}

pub(crate) fn create_pool_remote(pool: &str, unclaimed: &[&str], claimed: &[&str]) -> PoolRemote {
    let root = TempDir::new().unwrap();
    let bare = root.path().join("remote.git");
    let seed = root.path().join("seed");

    std::fs::create_dir_all(&bare).unwrap();
    git(&bare, &["init", "--bare"]);
    git(&bare, &["symbolic-ref", "HEAD", "refs/heads/main"]);

    std::fs::create_dir_all(&seed).unwrap();
    init_main_repo(&seed);

    std::fs::write(seed.join("README.md"), "# Pools\n").unwrap();
    for state in ["unclaimed", "claimed"] {
        let dir = seed.join(pool).join(state);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(".gitkeep"), "").unwrap();
    }
    for name in unclaimed {
        std::fs::write(
            seed.join(pool).join("unclaimed").join(name),
            format!("{} metadata\n", name),
        )
        .unwrap();
    }
    for name in claimed {
        std::fs::write(
            seed.join(pool).join("claimed").join(name),
            format!("{} metadata\n", name),
        )
        .unwrap();
    }

    git(&seed, &["add", "-A"]);
    git(&seed, &["commit", "-m", "initial pool"]);
    git(&seed, &["remote", "add", "origin", &bare.to_string_lossy()]);
    git(&seed, &["push", "origin", "HEAD:refs/heads/main"]);

    PoolRemote {
        root,
        pool: pool.to_string(),
    }
}

fn init_main_repo(path: &Path) {
    git(path, &["init"]);
    // Deterministic default branch name across environments.
    git(path, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    git(path, &["config", "user.email", "test@example.com"]);
    git(path, &["config", "user.name", "Test User"]);
}

pub(crate) fn git(repo_dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .current_dir(repo_dir)
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to execute git {}: {}", args.join(" "), e));

    if !output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!(
            "git {} failed (exit code {:?})\nstdout:\n{}\nstderr:\n{}",
            args.join(" "),
            output.status.code(),
            stdout,
            stderr
        );
    }
}

pub(crate) fn git_stdout(repo_dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .current_dir(repo_dir)
        .args(args)
        .output()
        .unwrap();
    assert!(output.status.success(), "git {} failed", args.join(" "));
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

pub(crate) type Files = BTreeMap<PathBuf, Vec<u8>>;

/// A change another writer makes to the remote while our push is in flight.
pub(crate) type RemoteEdit = Box<dyn FnOnce(&mut Files) + Send>;

pub(crate) fn remote_edit(edit: impl FnOnce(&mut Files) + Send + 'static) -> Option<RemoteEdit> {
    Some(Box::new(edit))
}

/// In-memory `RemoteStore` with scripted push outcomes.
#[derive(Default)]
pub(crate) struct FakeStore {
    pub remote: Files,
    local: Files,
    remote_head: u32,
    local_head: u32,
    pub push_script: VecDeque<(PushOutcome, Option<RemoteEdit>)>,
    pub setup_error: Option<String>,
    pub reset_error: Option<String>,
    /// Number of upcoming moves that fail before moves succeed again.
    pub fail_moves: usize,
    pub setup_calls: usize,
    pub reset_calls: usize,
    pub push_calls: usize,
    pub commit_messages: Vec<String>,
}

impl FakeStore {
    pub(crate) fn with_pool(pool: &str, unclaimed: &[&str], claimed: &[&str]) -> Self {
        let mut store = FakeStore::default();
        for state in ["unclaimed", "claimed"] {
            store
                .remote
                .insert(Path::new(pool).join(state).join(".gitkeep"), Vec::new());
        }
        for name in unclaimed {
            store.remote.insert(
                Path::new(pool).join("unclaimed").join(name),
                name.as_bytes().to_vec(),
            );
        }
        for name in claimed {
            store.remote.insert(
                Path::new(pool).join("claimed").join(name),
                name.as_bytes().to_vec(),
            );
        }
        store
    }

    pub(crate) fn script(&mut self, outcome: PushOutcome) {
        self.push_script.push_back((outcome, None));
    }

    pub(crate) fn remote_has(&self, path: &str) -> bool {
        self.remote.contains_key(Path::new(path))
    }
}

impl RemoteStore for FakeStore {
    fn setup(&mut self) -> Result<()> {
        self.setup_calls += 1;
        match &self.setup_error {
            Some(msg) => Err(PoolError::GitError(msg.clone())),
            None => Ok(()),
        }
    }

    fn reset_to_remote(&mut self) -> Result<()> {
        self.reset_calls += 1;
        if let Some(msg) = &self.reset_error {
            return Err(PoolError::GitError(msg.clone()));
        }
        self.local = self.remote.clone();
        self.local_head = self.remote_head;
        Ok(())
    }

    fn list_dir(&self, dir: &Path) -> Result<Vec<String>> {
        Ok(self
            .local
            .keys()
            .filter(|path| path.parent() == Some(dir))
            .filter_map(|path| path.file_name())
            .map(|name| name.to_string_lossy().to_string())
            .collect())
    }

    fn exists(&self, path: &Path) -> bool {
        self.local.contains_key(path)
    }

    fn move_path(&mut self, from: &Path, to: &Path) -> Result<()> {
        if self.fail_moves > 0 {
            self.fail_moves -= 1;
            return Err(PoolError::GitError("disaster".to_string()));
        }
        let contents = self.local.remove(from).ok_or_else(|| {
            PoolError::GitError(format!("bad source: {}", from.display()))
        })?;
        self.local.insert(to.to_path_buf(), contents);
        Ok(())
    }

    fn write_file(&mut self, path: &Path, contents: &[u8]) -> Result<()> {
        self.local.insert(path.to_path_buf(), contents.to_vec());
        Ok(())
    }

    fn add_path(&mut self, path: &Path) -> Result<()> {
        if self.local.contains_key(path) {
            Ok(())
        } else {
            Err(PoolError::GitError(format!(
                "pathspec '{}' did not match any files",
                path.display()
            )))
        }
    }

    fn remove_path(&mut self, path: &Path) -> Result<()> {
        self.local.remove(path).map(|_| ()).ok_or_else(|| {
            PoolError::GitError(format!(
                "pathspec '{}' did not match any files",
                path.display()
            ))
        })
    }

    fn commit(&mut self, message: &str) -> Result<()> {
        self.commit_messages.push(message.to_string());
        self.local_head = self.remote_head + 1;
        Ok(())
    }

    fn push(&mut self) -> PushOutcome {
        self.push_calls += 1;
        let (outcome, edit) = self
            .push_script
            .pop_front()
            .unwrap_or((PushOutcome::Accepted, None));

        if let Some(edit) = edit {
            edit(&mut self.remote);
            self.remote_head += 1;
        }

        if outcome == PushOutcome::Accepted {
            self.remote = self.local.clone();
            self.remote_head = self.local_head;
        }
        outcome
    }

    fn current_position(&self) -> Result<Position> {
        Ok(Position::new(format!("commit-{}", self.local_head)))
    }
}
