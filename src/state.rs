//! Completion marker and report recipients, persisted between runs.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// State shared between the pull and the report step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunState {
    /// Day of the last pull that finished without error.
    pub last_completed_date: Option<NaiveDate>,
    /// Addresses the daily report is sent to.
    pub email_recipients: Vec<String>,
}

impl RunState {
    /// Loads the state file; a missing file yields the default state.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Ok(toml::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Saves the state atomically (write tmp + rename).
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file
    /// cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp_path: PathBuf = path.with_extension("toml.tmp");
        std::fs::write(&tmp_path, toml::to_string(self)?)?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Records `today` as the last completed pull.
    pub const fn mark_completed(&mut self, today: NaiveDate) {
        self.last_completed_date = Some(today);
    }

    /// Fails unless the last completed pull happened on `today`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleState`] when the marker is missing or from another day.
    pub fn ensure_completed_on(&self, today: NaiveDate) -> Result<()> {
        if self.last_completed_date == Some(today) {
            Ok(())
        } else {
            Err(Error::StaleState {
                last_completed: self.last_completed_date,
                today,
            })
        }
    }

    /// Replaces the recipient list, dropping blanks and duplicates.
    pub fn set_recipients<I, S>(&mut self, recipients: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.email_recipients.clear();
        for address in recipients {
            let address = address.as_ref().trim();
            if !address.is_empty() && !self.email_recipients.iter().any(|a| a == address) {
                self.email_recipients.push(address.to_string());
            }
        }
    }
}

/// Loads the state at `path`, marks `today` as completed and saves it back.
///
/// # Errors
///
/// Returns an error if the state cannot be read or written.
pub fn record_completion(path: &Path, today: NaiveDate) -> Result<RunState> {
    let mut state = RunState::load(path)?;
    state.mark_completed(today);
    state.save(path)?;
    log::info!("Marked {today} as completed in {}", path.display());
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 8, d).unwrap()
    }

    #[test]
    fn missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let state = RunState::load(&dir.path().join("state.toml")).unwrap();
        assert_eq!(state, RunState::default());
    }

    #[test]
    fn save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/state.toml");
        let mut state = RunState::default();
        state.mark_completed(day(31));
        state.set_recipients(["a@example.org", " b@example.org ", "", "a@example.org"]);
        state.save(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("last_completed_date = \"2021-08-31\""));
        let loaded = RunState::load(&path).unwrap();
        assert_eq!(loaded, state);
        assert_eq!(loaded.email_recipients, vec!["a@example.org", "b@example.org"]);
    }

    #[test]
    fn stale_marker_is_rejected() {
        let mut state = RunState::default();
        assert!(matches!(
            state.ensure_completed_on(day(31)),
            Err(Error::StaleState { last_completed: None, .. })
        ));

        state.mark_completed(day(30));
        let err = state.ensure_completed_on(day(31)).unwrap_err();
        assert_eq!(err.to_string(), "Last completed pull was 2021-08-30, expected 2021-08-31");

        state.mark_completed(day(31));
        assert!(state.ensure_completed_on(day(31)).is_ok());
    }

    #[test]
    fn record_completion_keeps_recipients() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.toml");
        let mut state = RunState::default();
        state.set_recipients(["lab@example.org"]);
        state.save(&path).unwrap();

        let updated = record_completion(&path, day(31)).unwrap();
        assert_eq!(updated.last_completed_date, Some(day(31)));
        assert_eq!(updated.email_recipients, vec!["lab@example.org"]);
    }
}
