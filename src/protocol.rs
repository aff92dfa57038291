//! JSON request and response shapes for the `check`, `in`, and `out` commands.

use crate::config::Source;
use crate::error::{PoolError, Result};
use crate::store::Position;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A reported pool version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    #[serde(rename = "ref")]
    pub reference: String,
}

impl From<&Position> for Version {
    fn from(position: &Position) -> Self {
        Self {
            reference: position.as_str().to_string(),
        }
    }
}

impl Version {
    pub fn position(&self) -> Position {
        Position::new(&self.reference)
    }
}

/// One `{name, value}` metadata entry shown alongside a version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataPair {
    pub name: String,
    pub value: String,
}

impl MetadataPair {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Metadata describing which lock of which pool a version is about.
pub fn lock_metadata(lock_name: &str, pool_name: &str) -> Vec<MetadataPair> {
    vec![
        MetadataPair::new("lock_name", lock_name),
        MetadataPair::new("pool_name", pool_name),
    ]
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckRequest {
    pub source: Source,
    #[serde(default)]
    pub version: Option<Version>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InRequest {
    pub source: Source,
    pub version: Version,
}

/// Response for `in` and `out`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionResponse {
    pub version: Version,
    pub metadata: Vec<MetadataPair>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutRequest {
    pub source: Source,
    #[serde(default)]
    pub params: OutParams,
}

/// Parameters of an `out` request. Exactly one operation must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OutParams {
    pub acquire: bool,
    pub release: Option<String>,
    pub add: Option<String>,
    pub add_claimed: Option<String>,
    pub remove: Option<String>,
    pub claim: Option<String>,
    pub update: Option<String>,

    /// Mark the resulting commit so downstream automation ignores it.
    pub skip_trigger: bool,
}

/// The single pool operation an `out` request asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutOperation {
    Acquire,
    Claim(String),
    Release(PathBuf),
    Add(PathBuf),
    AddClaimed(PathBuf),
    Remove(PathBuf),
    Update(PathBuf),
}

impl OutParams {
    /// Resolve the requested operation; directory params are taken relative
    /// to `source_dir`.
    pub fn operation(&self, source_dir: &Path) -> Result<OutOperation> {
        let dir = |value: &str| source_dir.join(value);

        let mut requested = Vec::new();
        if self.acquire {
            requested.push(("acquire", OutOperation::Acquire));
        }
        if let Some(path) = &self.release {
            requested.push(("release", OutOperation::Release(dir(path))));
        }
        if let Some(path) = &self.add {
            requested.push(("add", OutOperation::Add(dir(path))));
        }
        if let Some(path) = &self.add_claimed {
            requested.push(("add_claimed", OutOperation::AddClaimed(dir(path))));
        }
        if let Some(path) = &self.remove {
            requested.push(("remove", OutOperation::Remove(dir(path))));
        }
        if let Some(name) = &self.claim {
            requested.push(("claim", OutOperation::Claim(name.trim().to_string())));
        }
        if let Some(path) = &self.update {
            requested.push(("update", OutOperation::Update(dir(path))));
        }

        match requested.len() {
            0 => Err(PoolError::UserError(
                "invalid payload (missing acquire, release, remove, claim, add, add_claimed, or update)"
                    .to_string(),
            )),
            1 => Ok(requested.remove(0).1),
            _ => {
                let names: Vec<&str> = requested.iter().map(|(name, _)| *name).collect();
                Err(PoolError::UserError(format!(
                    "invalid payload (only one operation may be requested, got: {})",
                    names.join(", ")
                )))
            }
        }
    }
}

/// Parse a JSON request, reporting malformed input as a user error.
pub fn parse_request<T: DeserializeOwned>(input: &str) -> Result<T> {
    serde_json::from_str(input)
        .map_err(|e| PoolError::UserError(format!("invalid JSON request: {}", e)))
}
