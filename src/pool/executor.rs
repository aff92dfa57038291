//! Retry loop that turns one pool mutation into a durable remote change.
//!
//! ```text
//! Setup -> Attempt -> Broadcast -> Done
//!            ^  |         |
//!            |  v         v
//!            Backoff <----+
//! ```
//!
//! - `Setup` clones once; failure is fatal.
//! - `Attempt` resets the clone to the remote tip and runs the mutation. A
//!   mutation error is fatal; [`Step::Wait`] goes to `Backoff` without pushing.
//! - `Broadcast` pushes. A conflict is an expected collision with another
//!   writer and goes to `Backoff`. Any other failure counts toward
//!   [`MAX_UNEXPECTED_ERRORS`]; reaching it is fatal.
//!
//! Waiting and conflicts are never counted: under contention the loop runs
//! until it succeeds or the caller gives up on it.

use super::handler::LockHandler;
use crate::error::{PoolError, Result};
use crate::store::{Position, PushOutcome, RemoteStore};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Unexpected push failures tolerated before giving up.
pub const MAX_UNEXPECTED_ERRORS: u32 = 5;

/// What a mutation wants the executor to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step<T> {
    /// The mutation is committed locally; push it.
    Push(T),
    /// Nothing to push yet; back off and rebuild from the remote tip.
    Wait,
}

enum State<T> {
    Setup,
    Attempt,
    Broadcast(T),
    Backoff,
    Done(T, Position),
}

/// Run `action` against fresh clones until its commit is accepted.
///
/// Returns the action's value together with the position it landed at.
pub fn perform_robust_action<S, T, F>(
    handler: &mut LockHandler<S>,
    retry_delay: Duration,
    mut action: F,
) -> Result<(T, Position)>
where
    S: RemoteStore,
    F: FnMut(&mut LockHandler<S>) -> Result<Step<T>>,
{
    let mut unexpected_errors = 0;
    let mut state = State::Setup;

    loop {
        state = match state {
            State::Setup => {
                handler.store_mut().setup()?;
                State::Attempt
            }
            State::Attempt => {
                handler.store_mut().reset_to_remote()?;
                match action(handler)? {
                    Step::Push(value) => State::Broadcast(value),
                    Step::Wait => State::Backoff,
                }
            }
            State::Broadcast(value) => match handler.store_mut().push() {
                PushOutcome::Accepted => {
                    let position = handler.store().current_position()?;
                    State::Done(value, position)
                }
                PushOutcome::Conflict(kind) => {
                    debug!(?kind, "push conflicted with another writer, retrying");
                    State::Backoff
                }
                PushOutcome::Failed { diagnostic } => {
                    unexpected_errors += 1;
                    warn!(
                        attempt = unexpected_errors,
                        git_output = %diagnostic,
                        "failed to broadcast the change to lock state, retrying"
                    );
                    if unexpected_errors >= MAX_UNEXPECTED_ERRORS {
                        return Err(PoolError::TooManyUnexpectedErrors { diagnostic });
                    }
                    State::Backoff
                }
            },
            State::Backoff => {
                thread::sleep(retry_delay);
                State::Attempt
            }
            State::Done(value, position) => {
                info!(position = %position, "lock state broadcast");
                return Ok((value, position));
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::CommitMessages;
    use crate::store::ConflictKind;
    use crate::test_support::{FakeStore, remote_edit};
    use std::path::{Path, PathBuf};

    fn handler(store: FakeStore) -> LockHandler<FakeStore> {
        LockHandler::new(store, "pool", CommitMessages::default())
    }

    fn remove_b(h: &mut LockHandler<FakeStore>) -> Result<Step<()>> {
        h.remove_lock("b").map(Step::Push)
    }

    #[test]
    fn accepted_push_returns_position() {
        let mut h = handler(FakeStore::with_pool("pool", &[], &["b"]));

        let ((), position) = perform_robust_action(&mut h, Duration::ZERO, remove_b).unwrap();

        assert_eq!(position.as_str(), "commit-1");
        assert!(!h.store().remote_has("pool/claimed/b"));
        assert_eq!(h.store().setup_calls, 1);
        assert_eq!(h.store().reset_calls, 1);
        assert_eq!(h.store().push_calls, 1);
    }

    #[test]
    fn setup_failure_is_fatal() {
        let mut store = FakeStore::with_pool("pool", &[], &["b"]);
        store.setup_error = Some("clone failed".to_string());
        let mut h = handler(store);

        let err = perform_robust_action(&mut h, Duration::ZERO, remove_b).unwrap_err();

        assert!(err.to_string().contains("clone failed"));
        assert_eq!(h.store().reset_calls, 0);
    }

    #[test]
    fn reset_failure_is_fatal() {
        let mut store = FakeStore::with_pool("pool", &[], &["b"]);
        store.reset_error = Some("fetch failed".to_string());
        let mut h = handler(store);

        let err = perform_robust_action(&mut h, Duration::ZERO, remove_b).unwrap_err();

        assert!(err.to_string().contains("fetch failed"));
        assert_eq!(h.store().push_calls, 0);
    }

    #[test]
    fn mutation_error_is_fatal_without_push() {
        let mut h = handler(FakeStore::with_pool("pool", &["b"], &[]));

        let err = perform_robust_action(&mut h, Duration::ZERO, remove_b).unwrap_err();

        assert!(matches!(err, PoolError::GitError(_)));
        assert_eq!(h.store().reset_calls, 1);
        assert_eq!(h.store().push_calls, 0);
    }

    #[test]
    fn wait_retries_without_pushing_or_counting() {
        let mut h = handler(FakeStore::with_pool("pool", &[], &[]));
        let mut waits = 0;

        let (value, _) = perform_robust_action(&mut h, Duration::ZERO, |_| {
            waits += 1;
            Ok(if waits < 10 { Step::Wait } else { Step::Push(waits) })
        })
        .unwrap();

        assert_eq!(value, 10);
        assert_eq!(h.store().reset_calls, 10);
        assert_eq!(h.store().push_calls, 1);
    }

    #[test]
    fn conflicts_are_retried_without_counting() {
        let mut store = FakeStore::with_pool("pool", &[], &["b"]);
        for _ in 0..(MAX_UNEXPECTED_ERRORS + 2) {
            store.script(PushOutcome::Conflict(ConflictKind::Rejected));
        }
        store.script(PushOutcome::Conflict(ConflictKind::UpToDate));
        let mut h = handler(store);

        perform_robust_action(&mut h, Duration::ZERO, remove_b).unwrap();

        assert_eq!(h.store().push_calls, MAX_UNEXPECTED_ERRORS as usize + 4);
        assert_eq!(h.store().reset_calls, MAX_UNEXPECTED_ERRORS as usize + 4);
    }

    #[test]
    fn unexpected_failure_is_retried() {
        let mut store = FakeStore::with_pool("pool", &[], &["b"]);
        store.script(PushOutcome::Failed {
            diagnostic: "disaster".to_string(),
        });
        let mut h = handler(store);

        perform_robust_action(&mut h, Duration::ZERO, remove_b).unwrap();

        assert_eq!(h.store().reset_calls, 2);
        assert_eq!(h.store().push_calls, 2);
        assert_eq!(h.store().commit_messages.len(), 2);
    }

    #[test]
    fn five_unexpected_failures_are_fatal_with_diagnostic() {
        let mut store = FakeStore::with_pool("pool", &[], &["b"]);
        for _ in 0..10 {
            store.script(PushOutcome::Failed {
                diagnostic: "some git message".to_string(),
            });
        }
        let mut h = handler(store);

        let err = perform_robust_action(&mut h, Duration::ZERO, remove_b).unwrap_err();

        assert!(matches!(err, PoolError::TooManyUnexpectedErrors { .. }));
        assert!(err.to_string().contains("some git message"));
        assert_eq!(h.store().reset_calls, 5);
        assert_eq!(h.store().push_calls, 5);
        assert!(h.store().remote_has("pool/claimed/b"));
    }

    #[test]
    fn conflicts_do_not_reset_the_unexpected_budget() {
        let mut store = FakeStore::with_pool("pool", &[], &["b"]);
        for _ in 0..4 {
            store.script(PushOutcome::Failed {
                diagnostic: "flaky".to_string(),
            });
            store.script(PushOutcome::Conflict(ConflictKind::Rejected));
        }
        store.script(PushOutcome::Failed {
            diagnostic: "flaky".to_string(),
        });
        let mut h = handler(store);

        let err = perform_robust_action(&mut h, Duration::ZERO, remove_b).unwrap_err();

        assert!(matches!(err, PoolError::TooManyUnexpectedErrors { .. }));
        assert_eq!(h.store().push_calls, 9);
    }

    #[test]
    fn conflict_rebuilds_the_mutation_from_the_new_tip() {
        let mut store = FakeStore::with_pool("pool", &["a", "b"], &[]);
        // Another writer claims "a" while our first push is in flight.
        store.push_script.push_back((
            PushOutcome::Conflict(ConflictKind::Rejected),
            remote_edit(|remote| {
                let contents = remote.remove(Path::new("pool/unclaimed/a")).unwrap();
                remote.insert(PathBuf::from("pool/claimed/a"), contents);
            }),
        ));
        let mut h = handler(store).with_rng(rand::rngs::mock::StepRng::new(0, 0));

        let (name, _) = perform_robust_action(&mut h, Duration::ZERO, |h| {
            h.grab_available_lock().map(Step::Push)
        })
        .unwrap();

        assert_eq!(name, "b");
        assert!(h.store().remote_has("pool/claimed/a"));
        assert!(h.store().remote_has("pool/claimed/b"));
        assert!(!h.store().remote_has("pool/unclaimed/b"));
        assert_eq!(
            h.store().commit_messages,
            vec!["claiming: a", "claiming: b"]
        );
    }
}
