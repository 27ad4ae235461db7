//! Pull run statistics.

use std::time::{Duration, Instant};

/// Totals for one pull run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStats {
    /// Navigation entries opened.
    pub folders_visited: usize,
    /// Navigation entries that turned out to be empty.
    pub folders_empty: usize,
    /// Files moved to their destination and deleted remotely.
    pub files_transferred: usize,
    /// Sub-folder entries deleted remotely after their folder was emptied.
    pub subfolders_removed: usize,
    /// Total elapsed time for the run.
    pub elapsed: Duration,
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStats {
    /// Creates empty run stats.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            folders_visited: 0,
            folders_empty: 0,
            files_transferred: 0,
            subfolders_removed: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Returns true if the run moved nothing.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        self.files_transferred == 0 && self.subfolders_removed == 0
    }
}

/// Accumulates [`RunStats`] while the workflow runs.
pub struct RunStatsBuilder {
    folders_visited: usize,
    folders_empty: usize,
    files_transferred: usize,
    subfolders_removed: usize,
    start_time: Instant,
}

impl Default for RunStatsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStatsBuilder {
    /// Starts the clock.
    #[must_use]
    pub fn new() -> Self {
        Self {
            folders_visited: 0,
            folders_empty: 0,
            files_transferred: 0,
            subfolders_removed: 0,
            start_time: Instant::now(),
        }
    }

    /// Records an opened folder.
    pub const fn add_folder(&mut self, empty: bool) {
        self.folders_visited += 1;
        if empty {
            self.folders_empty += 1;
        }
    }

    /// Records a completed file transfer.
    pub const fn add_file(&mut self) {
        self.files_transferred += 1;
    }

    /// Records a removed sub-folder.
    pub const fn add_subfolder(&mut self) {
        self.subfolders_removed += 1;
    }

    /// Builds the final statistics.
    #[must_use]
    pub fn build(self) -> RunStats {
        RunStats {
            folders_visited: self.folders_visited,
            folders_empty: self.folders_empty,
            files_transferred: self.files_transferred,
            subfolders_removed: self.subfolders_removed,
            elapsed: self.start_time.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_stats_default() {
        let stats = RunStats::default();
        assert_eq!(stats.folders_visited, 0);
        assert_eq!(stats.files_transferred, 0);
        assert!(stats.is_idle());
    }

    #[test]
    fn run_stats_builder() {
        let mut builder = RunStatsBuilder::new();
        builder.add_folder(false);
        builder.add_folder(true);
        builder.add_file();
        builder.add_file();
        builder.add_subfolder();

        let stats = builder.build();
        assert_eq!(stats.folders_visited, 2);
        assert_eq!(stats.folders_empty, 1);
        assert_eq!(stats.files_transferred, 2);
        assert_eq!(stats.subfolders_removed, 1);
        assert!(!stats.is_idle());
    }
}
