//! Implementation of the `lockpool in` command.

use super::{read_request, write_response};
use crate::error::Result;
use crate::materialize::materialize_lock;
use crate::protocol::{InRequest, VersionResponse, lock_metadata};
use crate::store::{GitStore, RemoteStore};
use std::io::{Read, Write};
use std::path::Path;
use tracing::info;

/// Fetch the lock changed by the requested version into `destination`.
pub fn cmd_in(destination: &Path, input: impl Read, output: impl Write) -> Result<()> {
    let request: InRequest = read_request(input)?;
    request.source.validate()?;

    let mut store = GitStore::from_source(&request.source);
    store.setup()?;

    let position = request.version.position();
    let name = materialize_lock(&store.workdir()?, &request.source.pool, &position, destination)?;
    info!(lock = %name, version = %position, "fetched lock");

    write_response(
        output,
        &VersionResponse {
            version: request.version,
            metadata: lock_metadata(&name, &request.source.pool),
        },
    )
}
