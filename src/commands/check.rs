//! Implementation of the `lockpool check` command.

use super::{read_request, write_response};
use crate::error::Result;
use crate::protocol::{CheckRequest, Version};
use crate::store::{GitStore, RemoteStore};
use crate::versions::{GitHistory, enumerate_versions};
use std::io::{Read, Write};
use tracing::info;

/// Report the pool versions at or after the request's version.
pub fn cmd_check(input: impl Read, output: impl Write) -> Result<()> {
    let request: CheckRequest = read_request(input)?;
    request.source.validate()?;

    let mut store = GitStore::from_source(&request.source);
    store.setup()?;

    let history = GitHistory::new(store.workdir()?, "HEAD");
    let previous = request.version.as_ref().map(Version::position);
    let versions = enumerate_versions(&history, &request.source.pool, previous.as_ref())?;

    info!(pool = %request.source.pool, count = versions.len(), "found versions");
    let response: Vec<Version> = versions.iter().map(Version::from).collect();
    write_response(output, &response)
}
