//! Implementation of the `lockpool out` command.

use super::{read_request, write_response};
use crate::error::Result;
use crate::identity::{BuildIdentity, CommitMessages};
use crate::pool::LockPool;
use crate::protocol::{OutOperation, OutRequest, Version, VersionResponse, lock_metadata};
use crate::store::{Position, RemoteStore};
use std::io::{Read, Write};
use std::path::Path;
use tracing::info;

/// Perform the single pool operation named in the request's params.
pub fn cmd_out(source_dir: &Path, input: impl Read, output: impl Write) -> Result<()> {
    let request: OutRequest = read_request(input)?;
    request.source.validate()?;
    let operation = request.params.operation(source_dir)?;

    let messages = CommitMessages::new(&BuildIdentity::from_env(), request.params.skip_trigger);
    let mut pool = LockPool::from_source(&request.source, messages);
    let (name, position) = run_operation(&mut pool, operation)?;

    info!(lock = %name, pool = %request.source.pool, version = %position, "pool updated");
    write_response(
        output,
        &VersionResponse {
            version: Version::from(&position),
            metadata: lock_metadata(&name, &request.source.pool),
        },
    )
}

fn run_operation<S: RemoteStore>(
    pool: &mut LockPool<S>,
    operation: OutOperation,
) -> Result<(String, Position)> {
    match operation {
        OutOperation::Acquire => pool.acquire_lock(),
        OutOperation::Claim(name) => {
            let position = pool.claim_lock(&name)?;
            Ok((name, position))
        }
        OutOperation::Release(dir) => pool.release_lock(&dir),
        OutOperation::Add(dir) => pool.add_unclaimed_lock(&dir),
        OutOperation::AddClaimed(dir) => pool.add_claimed_lock(&dir),
        OutOperation::Remove(dir) => pool.remove_lock(&dir),
        OutOperation::Update(dir) => pool.update_lock(&dir),
    }
}
