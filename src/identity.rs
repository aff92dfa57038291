//! Build identity used to decorate pool commit messages.
//!
//! CI systems export the identity of the running build through environment
//! variables. A pipeline build produces a prefix such as
//! `main/deploy/smoke-tests build 42 `; a one-off build produces
//! `one-off build 1234 `.

use std::env;

/// Appended to commit messages that downstream automation should not react to.
pub const SKIP_TRIGGER_MARKER: &str = "[skip ci]";

/// Identity of the build performing a pool operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildIdentity {
    pub team: Option<String>,
    pub pipeline: Option<String>,
    pub job: Option<String>,
    pub build_name: Option<String>,
    pub build_id: Option<String>,
}

impl BuildIdentity {
    /// Read the identity from `BUILD_*` environment variables.
    pub fn from_env() -> Self {
        Self {
            team: non_empty_var("BUILD_TEAM_NAME"),
            pipeline: non_empty_var("BUILD_PIPELINE_NAME"),
            job: non_empty_var("BUILD_JOB_NAME"),
            build_name: non_empty_var("BUILD_NAME"),
            build_id: non_empty_var("BUILD_ID"),
        }
    }

    /// Prefix for commit messages, including a trailing space when non-empty.
    pub fn commit_prefix(&self) -> String {
        if let (Some(pipeline), Some(job)) = (&self.pipeline, &self.job) {
            let mut prefix = String::new();
            if let Some(team) = &self.team {
                prefix.push_str(team);
                prefix.push('/');
            }
            prefix.push_str(&format!("{}/{}", pipeline, job));
            if let Some(name) = &self.build_name {
                prefix.push_str(&format!(" build {}", name));
            }
            prefix.push(' ');
            return prefix;
        }

        match &self.build_id {
            Some(id) => format!("one-off build {} ", id),
            None => String::new(),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Formats the commit message for each pool mutation.
#[derive(Debug, Clone, Default)]
pub struct CommitMessages {
    prefix: String,
    skip_trigger: bool,
}

impl CommitMessages {
    pub fn new(identity: &BuildIdentity, skip_trigger: bool) -> Self {
        Self {
            prefix: identity.commit_prefix(),
            skip_trigger,
        }
    }

    /// `"<prefix><action>: <lock>[ [skip ci]]"`
    pub fn format(&self, action: &str, lock: &str) -> String {
        let mut message = format!("{}{}: {}", self.prefix, action, lock);
        if self.skip_trigger {
            message.push(' ');
            message.push_str(SKIP_TRIGGER_MARKER);
        }
        message
    }
}
