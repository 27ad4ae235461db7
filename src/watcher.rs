//! Transfer completion watcher.
//!
//! Downloads, archive copies and moves onto network shares complete outside this
//! process (or at least outside its control), so each step is confirmed by polling
//! for the resulting file before the next one starts.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fs::FileSystem;
use crate::pacing::{Pacer, PollOutcome, PollPolicy, poll_until};

/// Which of the two candidate paths must exist for a transfer to count as done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionRule {
    /// Either candidate existing is enough.
    #[default]
    Either,
    /// Both candidates must exist. On platforms where `/` and `\` are not
    /// interchangeable this can only be met by two distinct files.
    Both,
}

impl CompletionRule {
    const fn is_met(self, forward: bool, backslash: bool) -> bool {
        match self {
            Self::Either => forward || backslash,
            Self::Both => forward && backslash,
        }
    }
}

/// A single pending wait: which file, where, and for how long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchRequest {
    /// Expected file name.
    pub name: String,
    /// Directory the file should appear in.
    pub directory: PathBuf,
    /// Polling bound for this request.
    pub policy: PollPolicy,
}

impl WatchRequest {
    /// The two spellings of `directory` + `name` the watcher checks.
    #[must_use]
    pub fn candidates(&self) -> [PathBuf; 2] {
        candidate_paths(&self.directory, &self.name)
    }
}

/// Builds the forward-slash and backslash joins of `directory` and `name`.
///
/// Any trailing separator on `directory` is dropped first, so `"/in/"` and
/// `"/in"` yield the same pair.
#[must_use]
pub fn candidate_paths(directory: &Path, name: &str) -> [PathBuf; 2] {
    let dir = directory.to_string_lossy();
    let trimmed = dir.trim_end_matches(['/', '\\']);
    [
        PathBuf::from(format!("{trimmed}/{name}")),
        PathBuf::from(format!("{trimmed}\\{name}")),
    ]
}

/// Polls the file system until expected files appear.
pub struct TransferWatcher<F: FileSystem> {
    fs: F,
    pacer: Arc<dyn Pacer>,
    policy: PollPolicy,
    rule: CompletionRule,
}

impl<F: FileSystem> TransferWatcher<F> {
    /// Creates a watcher over `fs` that pauses through `pacer`.
    #[must_use]
    pub fn new(fs: F, pacer: Arc<dyn Pacer>, policy: PollPolicy, rule: CompletionRule) -> Self {
        Self {
            fs,
            pacer,
            policy,
            rule,
        }
    }

    /// Waits until `name` is present in `directory`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] when the file is not observed within the
    /// policy's bound.
    pub async fn await_completion(&self, name: &str, directory: &Path) -> Result<()> {
        self.watch(&WatchRequest {
            name: name.to_string(),
            directory: directory.to_path_buf(),
            policy: self.policy,
        })
        .await
    }

    /// Waits for a prepared request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] when the file is not observed within the
    /// request's bound.
    pub async fn watch(&self, request: &WatchRequest) -> Result<()> {
        let [forward, backslash] = request.candidates();
        let rule = self.rule;
        log::debug!(
            "Waiting for {} in {} (up to {} checks)",
            request.name,
            request.directory.display(),
            request.policy.max_attempts
        );

        let outcome = poll_until(&request.policy, self.pacer.as_ref(), || {
            let (forward, backslash) = (&forward, &backslash);
            async move {
                let a = self.fs.file_exists(forward).await;
                let b = self.fs.file_exists(backslash).await;
                rule.is_met(a, b)
            }
        })
        .await;

        match outcome {
            PollOutcome::Satisfied(attempt) => {
                log::info!("Action complete: {} (check {attempt})", request.name);
                Ok(())
            }
            PollOutcome::Exhausted(attempts) => Err(Error::Timeout {
                name: request.name.clone(),
                directory: request.directory.display().to_string(),
                attempts,
            }),
        }
    }
}
