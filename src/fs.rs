//! Filesystem helpers for lockpool.
//!
//! Lock files and materialized descriptors are written through a temporary
//! file in the same directory and then renamed into place, so a reader never
//! observes a partially written lock.

use crate::error::{PoolError, Result};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Atomically write bytes to a file, creating parent directories as needed.
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
    let path = path.as_ref();
    let parent = path.parent().unwrap_or(Path::new("."));

    if !parent.exists() {
        fs::create_dir_all(parent).map_err(|e| {
            PoolError::UserError(format!(
                "failed to create parent directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    let mut temp = NamedTempFile::new_in(parent).map_err(|e| {
        PoolError::UserError(format!(
            "failed to create temporary file in '{}': {}",
            parent.display(),
            e
        ))
    })?;

    temp.write_all(content)
        .and_then(|()| temp.as_file().sync_all())
        .map_err(|e| PoolError::UserError(format!("failed to write temporary file: {}", e)))?;

    temp.persist(path).map_err(|e| {
        PoolError::UserError(format!(
            "failed to atomically replace '{}': {}",
            path.display(),
            e.error
        ))
    })?;

    Ok(())
}
