//! Source validation and accessors.

use super::model::{DEFAULT_RETRY_DELAY, Source};
use crate::error::{PoolError, Result};
use std::time::Duration;

impl Source {
    /// Every problem with this source, one message per missing field.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.uri.trim().is_empty() {
            problems.push("invalid payload (missing uri)".to_string());
        }
        if self.pool.trim().is_empty() {
            problems.push("invalid payload (missing pool)".to_string());
        }
        if self.branch.trim().is_empty() {
            problems.push("invalid payload (missing branch)".to_string());
        }

        problems
    }

    /// Validate the source, reporting all problems at once.
    pub fn validate(&self) -> Result<()> {
        let problems = self.problems();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(PoolError::UserError(problems.join("\n")))
        }
    }

    /// The configured retry delay, or the default when unset.
    pub fn retry_delay(&self) -> Duration {
        self.retry_delay.unwrap_or(DEFAULT_RETRY_DELAY)
    }
}
