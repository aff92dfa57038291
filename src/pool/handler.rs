//! Pool-aware mutations of a working clone.
//!
//! Each method assumes the clone was just reset to the remote tip, performs
//! one mutation, and commits it. Nothing here pushes.

use super::LockState;
use crate::error::{PoolError, Result};
use crate::identity::CommitMessages;
use crate::store::RemoteStore;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};
use std::path::PathBuf;
use tracing::debug;

/// Applies lock state transitions to the pool inside a [`RemoteStore`].
pub struct LockHandler<S> {
    store: S,
    pool: PathBuf,
    messages: CommitMessages,
    rng: Box<dyn RngCore + Send>,
}

impl<S: RemoteStore> LockHandler<S> {
    pub fn new(store: S, pool: impl Into<PathBuf>, messages: CommitMessages) -> Self {
        Self {
            store,
            pool: pool.into(),
            messages,
            rng: Box::new(StdRng::from_entropy()),
        }
    }

    /// Replace the random source used to pick among available locks.
    pub fn with_rng(mut self, rng: impl RngCore + Send + 'static) -> Self {
        self.rng = Box::new(rng);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    fn state_dir(&self, state: LockState) -> PathBuf {
        self.pool.join(state.dir_name())
    }

    fn lock_path(&self, state: LockState, name: &str) -> PathBuf {
        self.state_dir(state).join(name)
    }

    /// Non-hidden lock names currently in `state`.
    pub fn locks_in(&self, state: LockState) -> Result<Vec<String>> {
        Ok(self
            .store
            .list_dir(&self.state_dir(state))?
            .into_iter()
            .filter(|name| !name.starts_with('.'))
            .collect())
    }

    /// Claim a uniformly random unclaimed lock, returning its name.
    pub fn grab_available_lock(&mut self) -> Result<String> {
        let available = self.locks_in(LockState::Unclaimed)?;
        let name = available
            .choose(&mut self.rng)
            .cloned()
            .ok_or(PoolError::NoLocksAvailable)?;

        debug!(lock = %name, candidates = available.len(), "selected lock");
        self.transition(&name, LockState::Unclaimed, LockState::Claimed, "claiming")?;
        Ok(name)
    }

    /// Claim a specific lock; waits (via `NoLocksAvailable`) while it is taken.
    pub fn claim_lock(&mut self, name: &str) -> Result<()> {
        if !self.store.exists(&self.lock_path(LockState::Unclaimed, name)) {
            return Err(PoolError::NoLocksAvailable);
        }
        self.transition(name, LockState::Unclaimed, LockState::Claimed, "claiming")
    }

    /// Move a claimed lock back to unclaimed.
    pub fn unclaim_lock(&mut self, name: &str) -> Result<()> {
        self.transition(name, LockState::Claimed, LockState::Unclaimed, "unclaiming")
    }

    /// Delete a claimed lock from the pool.
    pub fn remove_lock(&mut self, name: &str) -> Result<()> {
        let path = self.lock_path(LockState::Claimed, name);
        self.store.remove_path(&path)?;
        self.store.commit(&self.messages.format("removing", name))
    }

    /// Write a new lock directly into `state`.
    pub fn add_lock(&mut self, name: &str, contents: &[u8], state: LockState) -> Result<()> {
        let path = self.lock_path(state, name);
        self.store.write_file(&path, contents)?;
        self.store.add_path(&path)?;

        let action = match state {
            LockState::Claimed => "adding claimed",
            LockState::Unclaimed => "adding unclaimed",
        };
        self.store.commit(&self.messages.format(action, name))
    }

    /// Replace a lock's contents, leaving it unclaimed.
    ///
    /// A claimed lock is never replaced underneath its holder; the caller gets
    /// `NoLocksAvailable` and must retry after the lock is released.
    pub fn update_lock(&mut self, name: &str, contents: &[u8]) -> Result<()> {
        if self.store.exists(&self.lock_path(LockState::Claimed, name)) {
            return Err(PoolError::NoLocksAvailable);
        }

        let path = self.lock_path(LockState::Unclaimed, name);
        let existed = self.store.exists(&path);
        if existed {
            self.store.remove_path(&path)?;
        }
        self.store.write_file(&path, contents)?;
        self.store.add_path(&path)?;

        let action = if existed {
            "updating"
        } else {
            "adding unclaimed"
        };
        self.store.commit(&self.messages.format(action, name))
    }

    fn transition(
        &mut self,
        name: &str,
        from: LockState,
        to: LockState,
        action: &str,
    ) -> Result<()> {
        let source = self.lock_path(from, name);
        let destination = self.lock_path(to, name);
        self.store.move_path(&source, &destination)?;
        self.store.commit(&self.messages.format(action, name))
    }
}
