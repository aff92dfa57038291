//! Lock descriptor directories.
//!
//! Operations on an existing or new lock take a directory containing a `name`
//! file and, for add/update, a `metadata` file with the lock's contents.
//! Failing to read these is a local problem that retrying cannot fix.

use crate::error::{PoolError, Result};
use std::fs;
use std::path::Path;

/// Read and validate the lock name from `<dir>/name`.
pub fn read_lock_name(dir: &Path) -> Result<String> {
    let path = dir.join("name");
    let contents = fs::read_to_string(&path).map_err(|e| {
        PoolError::UserError(format!(
            "could not read the name file of your lock ({}): {}",
            path.display(),
            e
        ))
    })?;

    let name = contents.trim().to_string();
    validate_lock_name(&name)?;
    Ok(name)
}

/// Read the raw lock contents from `<dir>/metadata`.
pub fn read_lock_contents(dir: &Path) -> Result<Vec<u8>> {
    let path = dir.join("metadata");
    fs::read(&path).map_err(|e| {
        PoolError::UserError(format!(
            "could not read the metadata file of your lock ({}): {}",
            path.display(),
            e
        ))
    })
}

/// A lock name must be a single visible path component.
pub fn validate_lock_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(PoolError::UserError("lock name cannot be empty".to_string()));
    }

    if name.starts_with('.') {
        return Err(PoolError::UserError(format!(
            "invalid lock name '{}': names starting with '.' are ignored by the pool",
            name
        )));
    }

    if name.contains('/') || name.contains('\\') || name.contains('\0') {
        return Err(PoolError::UserError(format!(
            "invalid lock name '{}': must not contain path separators",
            name
        )));
    }

    Ok(())
}
