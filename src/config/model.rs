//! Source struct definition and retry-delay decoding.

use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Delay between retries when `retry_delay` is unset.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(10);

/// Where the pool lives and how to contend for it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Source {
    /// Git URI of the repository holding the pool.
    pub uri: String,

    /// Branch that carries the pool state.
    pub branch: String,

    /// Directory of the pool inside the branch.
    pub pool: String,

    /// SSH private key used for clone, fetch, and push.
    pub private_key: Option<String>,

    /// Fixed delay between retries (`"10s"`, `"1m"`, `"250ms"`).
    ///
    /// A bare integer is read as nanoseconds.
    #[serde(deserialize_with = "deserialize_delay")]
    pub retry_delay: Option<Duration>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDelay {
    Text(String),
    Nanos(u64),
}

fn deserialize_delay<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawDelay>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawDelay::Nanos(nanos)) => Ok(Some(Duration::from_nanos(nanos))),
        Some(RawDelay::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(RawDelay::Text(text)) => humantime::parse_duration(text.trim())
            .map(Some)
            .map_err(|e| serde::de::Error::custom(format!("invalid retry_delay '{}': {}", text, e))),
    }
}
