//! Push outcome classification.
//!
//! `git push --porcelain` reports one line per ref as
//! `<flag>\t<from>:<to>\t<summary>`. The flag is the structured signal:
//! `!` rejected, `=` up to date, anything else an update. When no porcelain
//! line is present (older servers, transport errors) we fall back to matching
//! git's human-readable diagnostics.

use super::{ConflictKind, PushOutcome};
use crate::git::GitStatus;
use regex::Regex;
use std::sync::LazyLock;

static REJECTED_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[rejected\]|non-fast-forward|fetch first|cannot lock ref|failed to update ref")
        .unwrap_or_else(|e| panic!("invalid rejection pattern: {}", e))
});

static UP_TO_DATE_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)everything up[- ]to[- ]date")
        .unwrap_or_else(|e| panic!("invalid up-to-date pattern: {}", e))
});

static REMOTE_LOCK_FAILURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"cannot lock ref|failed to update ref|failed to lock|incorrect old value")
        .unwrap_or_else(|e| panic!("invalid remote lock pattern: {}", e))
});

/// Classify the result of `git push --porcelain`.
pub fn classify_push(status: &GitStatus) -> PushOutcome {
    let output = &status.output;

    if let Some((flag, summary)) = porcelain_ref_line(&output.stdout) {
        return match flag {
            '=' => PushOutcome::Conflict(ConflictKind::UpToDate),
            '!' if summary.contains("[remote rejected]") => {
                if REMOTE_LOCK_FAILURE.is_match(summary) {
                    PushOutcome::Conflict(ConflictKind::Rejected)
                } else {
                    PushOutcome::Failed {
                        diagnostic: output.combined(),
                    }
                }
            }
            '!' => PushOutcome::Conflict(ConflictKind::Rejected),
            _ if status.success => PushOutcome::Accepted,
            _ => PushOutcome::Failed {
                diagnostic: output.combined(),
            },
        };
    }

    let text = output.combined();
    if UP_TO_DATE_TEXT.is_match(&text) {
        PushOutcome::Conflict(ConflictKind::UpToDate)
    } else if REJECTED_TEXT.is_match(&text) {
        PushOutcome::Conflict(ConflictKind::Rejected)
    } else if status.success {
        PushOutcome::Accepted
    } else {
        PushOutcome::Failed { diagnostic: text }
    }
}

/// First `<flag>\t<refspec>\t<summary>` line of porcelain output.
fn porcelain_ref_line(stdout: &str) -> Option<(char, &str)> {
    stdout.lines().find_map(|line| {
        let mut fields = line.splitn(3, '\t');
        let flag_field = fields.next()?;
        let refspec = fields.next()?;
        let summary = fields.next().unwrap_or("");

        let mut chars = flag_field.chars();
        let flag = chars.next().unwrap_or(' ');
        if chars.next().is_some() || !refspec.contains(':') {
            return None;
        }

        matches!(flag, ' ' | '+' | '-' | '*' | '!' | '=').then_some((flag, summary))
    })
}
