//! Public lock pool operations.

use super::descriptor::{read_lock_contents, read_lock_name, validate_lock_name};
use super::executor::{Step, perform_robust_action};
use super::handler::LockHandler;
use super::LockState;
use crate::config::Source;
use crate::error::{PoolError, Result};
use crate::identity::CommitMessages;
use crate::store::{GitStore, Position, RemoteStore};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A named pool and the retry policy used to mutate it.
pub struct LockPool<S> {
    pool: String,
    retry_delay: Duration,
    handler: LockHandler<S>,
}

impl LockPool<GitStore> {
    /// A pool backed by a git clone of `source`.
    pub fn from_source(source: &Source, messages: CommitMessages) -> Self {
        let store = GitStore::from_source(source);
        Self::new(
            &source.pool,
            source.retry_delay(),
            LockHandler::new(store, &source.pool, messages),
        )
    }
}

impl<S: RemoteStore> LockPool<S> {
    pub fn new(pool: impl Into<String>, retry_delay: Duration, handler: LockHandler<S>) -> Self {
        Self {
            pool: pool.into(),
            retry_delay,
            handler,
        }
    }

    pub fn handler(&self) -> &LockHandler<S> {
        &self.handler
    }

    /// Claim any available lock, waiting until one is free.
    pub fn acquire_lock(&mut self) -> Result<(String, Position)> {
        info!(pool = %self.pool, "acquiring lock");
        let pool = self.pool.clone();

        perform_robust_action(&mut self.handler, self.retry_delay, |handler| {
            match handler.grab_available_lock() {
                Ok(name) => Ok(Step::Push(name)),
                Err(PoolError::NoLocksAvailable) => {
                    debug!(pool = %pool, "no locks available, waiting");
                    Ok(Step::Wait)
                }
                Err(e) => {
                    warn!(pool = %pool, error = %e, "failed to acquire lock, retrying");
                    Ok(Step::Wait)
                }
            }
        })
    }

    /// Claim the named lock, waiting while another build holds it and
    /// retrying after any failed mutation.
    pub fn claim_lock(&mut self, name: &str) -> Result<Position> {
        validate_lock_name(name)?;
        info!(lock = %name, pool = %self.pool, "claiming lock");

        let ((), position) = perform_robust_action(&mut self.handler, self.retry_delay, |handler| {
            match handler.claim_lock(name) {
                Ok(()) => Ok(Step::Push(())),
                Err(PoolError::NoLocksAvailable) => {
                    debug!(lock = %name, "lock is claimed, waiting");
                    Ok(Step::Wait)
                }
                Err(e) => {
                    warn!(lock = %name, error = %e, "failed to claim lock, retrying");
                    Ok(Step::Wait)
                }
            }
        })?;
        Ok(position)
    }

    /// Release the lock named in `descriptor_dir/name`.
    pub fn release_lock(&mut self, descriptor_dir: &Path) -> Result<(String, Position)> {
        let name = read_lock_name(descriptor_dir)?;
        info!(lock = %name, pool = %self.pool, "releasing lock");

        let ((), position) = perform_robust_action(&mut self.handler, self.retry_delay, |handler| {
            handler.unclaim_lock(&name).map(Step::Push)
        })?;
        Ok((name, position))
    }

    /// Add the lock described in `descriptor_dir` as available.
    pub fn add_unclaimed_lock(&mut self, descriptor_dir: &Path) -> Result<(String, Position)> {
        self.add_lock(descriptor_dir, LockState::Unclaimed)
    }

    /// Add the lock described in `descriptor_dir` as already held.
    pub fn add_claimed_lock(&mut self, descriptor_dir: &Path) -> Result<(String, Position)> {
        self.add_lock(descriptor_dir, LockState::Claimed)
    }

    fn add_lock(&mut self, descriptor_dir: &Path, state: LockState) -> Result<(String, Position)> {
        let name = read_lock_name(descriptor_dir)?;
        let contents = read_lock_contents(descriptor_dir)?;
        info!(lock = %name, pool = %self.pool, %state, "adding lock");

        let ((), position) = perform_robust_action(&mut self.handler, self.retry_delay, |handler| {
            handler.add_lock(&name, &contents, state).map(Step::Push)
        })?;
        Ok((name, position))
    }

    /// Remove the claimed lock named in `descriptor_dir/name`.
    pub fn remove_lock(&mut self, descriptor_dir: &Path) -> Result<(String, Position)> {
        let name = read_lock_name(descriptor_dir)?;
        info!(lock = %name, pool = %self.pool, "removing lock");

        let ((), position) = perform_robust_action(&mut self.handler, self.retry_delay, |handler| {
            handler.remove_lock(&name).map(Step::Push)
        })?;
        Ok((name, position))
    }

    /// Replace the contents of the lock described in `descriptor_dir`,
    /// waiting until it is not claimed.
    pub fn update_lock(&mut self, descriptor_dir: &Path) -> Result<(String, Position)> {
        let name = read_lock_name(descriptor_dir)?;
        let contents = read_lock_contents(descriptor_dir)?;
        info!(lock = %name, pool = %self.pool, "updating lock");

        let ((), position) = perform_robust_action(&mut self.handler, self.retry_delay, |handler| {
            wait_while_contended(handler.update_lock(&name, &contents))
        })?;
        Ok((name, position))
    }
}

/// Contention becomes a wait; every other error stays fatal.
fn wait_while_contended<T>(result: Result<T>) -> Result<Step<T>> {
    match result {
        Ok(value) => Ok(Step::Push(value)),
        Err(PoolError::NoLocksAvailable) => {
            debug!("lock is claimed, waiting");
            Ok(Step::Wait)
        }
        Err(e) => Err(e),
    }
}
