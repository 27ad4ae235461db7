//! The pull workflow: discovery, then download, archive, relocate and delete per file.
//!
//! Every step is confirmed before the next one starts; the portal gives no
//! completion signals of its own, so confirmation means watching the file
//! system through [`TransferWatcher`].

use std::path::Path;
use std::sync::Arc;

use chrono::{Local, NaiveDate};

use crate::config::AppConfig;
use crate::discovery::{self, NavigationEntry};
use crate::error::Result;
use crate::fs::{FileSystem, TokioFileSystem};
use crate::ledger::{TransferLog, TransferRecord};
use crate::mapping::DirectoryMapping;
use crate::pacing::Pacer;
use crate::portal::{PortalDriver, partition_entries};
use crate::state::record_completion;
use crate::stats::{RunStats, RunStatsBuilder};
use crate::transfer::{copy_to_archive, move_into};
use crate::watcher::TransferWatcher;

/// Stage a file is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStep {
    /// Waiting for the browser download to land in staging.
    Downloading,
    /// Copying into the archive.
    Archiving,
    /// Moving into the destination directory.
    Moving,
    /// Removing the file from the portal.
    Deleting,
}

impl TransferStep {
    /// Short label for display.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Downloading => "downloading",
            Self::Archiving => "archiving",
            Self::Moving => "moving",
            Self::Deleting => "deleting",
        }
    }
}

/// Trait for reporting workflow progress.
///
/// Implement this trait to receive progress updates during a pull.
pub trait WorkflowProgress: Send + Sync {
    /// Called once the navigation table is known.
    fn on_discovered(&self, _entries: &[NavigationEntry]) {}

    /// Called after a folder has been opened and listed.
    fn on_folder_start(&self, _entry: &NavigationEntry, _files: usize, _subfolders: usize) {}

    /// Called when a file enters a new step.
    fn on_file_step(&self, _name: &str, _step: TransferStep) {}

    /// Called after a file's record has been written.
    fn on_file_complete(&self, _record: &TransferRecord) {}

    /// Called when a folder has been fully processed.
    fn on_folder_complete(&self, _entry: &NavigationEntry) {}
}

/// A null progress implementation that ignores all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl WorkflowProgress for NoProgress {}

/// Drives one pull session against a portal.
pub struct PullWorkflow<D: PortalDriver, F: FileSystem + Clone = TokioFileSystem> {
    driver: D,
    fs: F,
    pacer: Arc<dyn Pacer>,
    watcher: TransferWatcher<F>,
    config: AppConfig,
    mapping: DirectoryMapping,
    log: TransferLog,
}

impl<D: PortalDriver> PullWorkflow<D, TokioFileSystem> {
    /// Creates a workflow on the real file system.
    #[must_use]
    pub fn new(driver: D, config: AppConfig, mapping: DirectoryMapping, pacer: Arc<dyn Pacer>) -> Self {
        Self::with_fs(driver, config, mapping, pacer, TokioFileSystem)
    }
}

impl<D: PortalDriver, F: FileSystem + Clone> PullWorkflow<D, F> {
    /// Creates a workflow with a custom file system implementation.
    #[must_use]
    pub fn with_fs(
        driver: D,
        config: AppConfig,
        mapping: DirectoryMapping,
        pacer: Arc<dyn Pacer>,
        fs: F,
    ) -> Self {
        let watcher = TransferWatcher::new(
            fs.clone(),
            Arc::clone(&pacer),
            config.watch.policy(),
            config.watch.rule,
        );
        let log = TransferLog::new(&config.paths.log_file);
        Self {
            driver,
            fs,
            pacer,
            watcher,
            config,
            mapping,
            log,
        }
    }

    #[cfg(test)]
    pub(crate) const fn driver(&self) -> &D {
        &self.driver
    }

    /// Expands the remote tree and builds the navigation table.
    ///
    /// # Errors
    ///
    /// Returns any driver error, or [`crate::Error::TreeNotSettled`].
    pub async fn discover(&self) -> Result<Vec<NavigationEntry>> {
        let policy = self.config.discovery.expansion(self.config.portal.settle);
        discovery::discover(
            &self.driver,
            self.pacer.as_ref(),
            &policy,
            &self.config.discovery.exclude,
            &self.mapping,
        )
        .await
    }

    /// Builds the navigation table, then closes the portal session.
    ///
    /// # Errors
    ///
    /// Returns the discovery error; a failure to close is only logged.
    pub async fn plan(&self) -> Result<Vec<NavigationEntry>> {
        let result = self.discover().await;
        self.close_session().await;
        result
    }

    /// Runs a full pull for `today`.
    ///
    /// The portal session is closed whether or not the pull succeeds; the
    /// completion marker is only set on success.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered. Nothing is retried.
    pub async fn run(&self, today: NaiveDate, progress: &dyn WorkflowProgress) -> Result<RunStats> {
        let result = self.pull_all(today, progress).await;
        self.close_session().await;
        let stats = result?;
        record_completion(&self.config.paths.state_file, today)?;
        log::info!(
            "Pull complete: {} files from {} folders",
            stats.files_transferred,
            stats.folders_visited
        );
        Ok(stats)
    }

    async fn close_session(&self) {
        if let Err(e) = self.driver.close().await {
            log::warn!("Failed to close portal session: {e}");
        }
    }

    async fn pull_all(&self, today: NaiveDate, progress: &dyn WorkflowProgress) -> Result<RunStats> {
        let mut stats = RunStatsBuilder::new();
        let entries = self.discover().await?;
        progress.on_discovered(&entries);
        for entry in &entries {
            self.pull_folder(entry, today, progress, &mut stats).await?;
        }
        Ok(stats.build())
    }

    async fn pull_folder(
        &self,
        entry: &NavigationEntry,
        today: NaiveDate,
        progress: &dyn WorkflowProgress,
        stats: &mut RunStatsBuilder,
    ) -> Result<()> {
        self.driver.open_folder(&entry.node_id).await?;
        let contents = self.driver.folder_contents().await?;
        if contents.is_empty() {
            log::info!("No files in {}", entry.node_id);
            stats.add_folder(true);
            progress.on_folder_complete(entry);
            return Ok(());
        }
        stats.add_folder(false);

        let (folders, files) = partition_entries(contents);
        log::info!(
            "{}: {} files, {} sub-folders",
            entry.node_id,
            files.len(),
            folders.len()
        );
        progress.on_folder_start(entry, files.len(), folders.len());

        for file in &files {
            let record = self.transfer_file(entry, &file.id, today, progress).await?;
            self.log.append(&record)?;
            progress.on_file_complete(&record);
            stats.add_file();
        }

        // Deeper folders were visited first, so what is left here is empty.
        for folder in &folders {
            self.driver.delete(&folder.id).await?;
            stats.add_subfolder();
        }

        progress.on_folder_complete(entry);
        Ok(())
    }

    async fn transfer_file(
        &self,
        entry: &NavigationEntry,
        name: &str,
        today: NaiveDate,
        progress: &dyn WorkflowProgress,
    ) -> Result<TransferRecord> {
        let paths = &self.config.paths;
        let staging = paths.staging_dir.as_path();
        let archive = paths.archive_dir.as_path();

        progress.on_file_step(name, TransferStep::Downloading);
        self.driver.download(name).await?;
        self.watcher.await_completion(name, staging).await?;

        progress.on_file_step(name, TransferStep::Archiving);
        let archive_name =
            copy_to_archive(&self.fs, name, staging, archive, today, Local::now().time()).await?;
        self.watcher.await_completion(&archive_name, archive).await?;

        progress.on_file_step(name, TransferStep::Moving);
        let moved = move_into(
            &self.fs,
            name,
            staging,
            &entry.destination,
            self.config.transfer.copy_suffix,
        )
        .await?;
        let moved_name = file_name_of(&moved).unwrap_or_else(|| name.to_string());
        self.watcher
            .await_completion(&moved_name, &entry.destination)
            .await?;

        progress.on_file_step(name, TransferStep::Deleting);
        self.driver.delete(name).await?;

        Ok(TransferRecord {
            date: today,
            file_name: name.to_string(),
            destination_name: entry.top_level.clone(),
            destination_path: entry.destination.display().to_string(),
            archive_path: archive.join(&archive_name).display().to_string(),
            archive_file_name: archive_name,
        })
    }
}

fn file_name_of(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WatchConfig;
    use crate::error::Error;
    use crate::pacing::InstantPacer;
    use crate::state::RunState;
    use crate::testing::FakePortal;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct Fixture {
        _root: TempDir,
        staging: PathBuf,
        archive: PathBuf,
        dest_a: PathBuf,
        config: AppConfig,
        mapping: DirectoryMapping,
    }

    impl Fixture {
        fn new() -> Self {
            let root = TempDir::new().unwrap();
            let staging = root.path().join("staging");
            let archive = root.path().join("archive");
            let dest_a = root.path().join("dest/LabA");
            std::fs::create_dir_all(&staging).unwrap();

            let mut config = AppConfig::new()
                .with_staging_dir(&staging)
                .with_archive_dir(&archive);
            config.paths.log_file = root.path().join("log.csv");
            config.paths.state_file = root.path().join("state.toml");
            let mapping = DirectoryMapping::new().with("LabA", &dest_a);

            Self {
                _root: root,
                staging,
                archive,
                dest_a,
                config,
                mapping,
            }
        }

        fn workflow(&self, portal: FakePortal) -> PullWorkflow<FakePortal> {
            PullWorkflow::new(
                portal.staging(&self.staging),
                self.config.clone(),
                self.mapping.clone(),
                Arc::new(InstantPacer::new()),
            )
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 8, 31).unwrap()
    }

    fn names_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .map(|rd| {
                rd.map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }

    #[derive(Default)]
    struct RecordingProgress {
        steps: Mutex<Vec<(String, TransferStep)>>,
    }

    impl WorkflowProgress for RecordingProgress {
        fn on_file_step(&self, name: &str, step: TransferStep) {
            self.steps.lock().unwrap().push((name.to_string(), step));
        }
    }

    #[tokio::test]
    async fn full_pull_moves_archives_and_logs() {
        let fx = Fixture::new();
        let portal = FakePortal::new()
            .file("LabA", "a.csv")
            .file("LabA", "b.fastq.gz")
            .file("LabA:old", "c.csv")
            .file("LabB", "z.csv");
        let workflow = fx.workflow(portal);

        let stats = workflow.run(today(), &NoProgress).await.unwrap();
        assert_eq!(stats.folders_visited, 2);
        assert_eq!(stats.files_transferred, 3);
        assert_eq!(stats.subfolders_removed, 1);

        assert_eq!(names_in(&fx.dest_a), vec!["a.csv", "b.fastq.gz", "c.csv"]);
        assert!(names_in(&fx.staging).is_empty());
        let archived = names_in(&fx.archive);
        assert_eq!(archived.len(), 3);
        assert!(archived.iter().all(|n| n.starts_with("20210831_")));

        let records = TransferLog::new(&fx.config.paths.log_file).read_all().unwrap();
        assert_eq!(records.len(), 3);
        // The deeper folder is visited first.
        assert_eq!(records[0].file_name, "c.csv");
        assert!(records.iter().all(|r| r.destination_name == "LabA"));
        assert!(records.iter().all(|r| archived.contains(&r.archive_file_name)));
        assert!(records.iter().all(|r| {
            r.archive_path == fx.archive.join(&r.archive_file_name).display().to_string()
        }));

        let actions = workflow.driver().actions();
        assert!(actions.contains(&"delete a.csv".to_string()));
        assert!(actions.contains(&"delete :LabA:old".to_string()));
        assert!(!actions.iter().any(|a| a.contains("z.csv")));
        assert!(workflow.driver().is_closed());

        let state = RunState::load(&fx.config.paths.state_file).unwrap();
        assert_eq!(state.last_completed_date, Some(today()));
    }

    #[tokio::test]
    async fn steps_run_in_order() {
        let fx = Fixture::new();
        let workflow = fx.workflow(FakePortal::new().file("LabA", "a.csv"));
        let progress = RecordingProgress::default();
        workflow.run(today(), &progress).await.unwrap();

        let steps: Vec<TransferStep> = progress.steps.lock().unwrap().iter().map(|(_, s)| *s).collect();
        assert_eq!(
            steps,
            vec![
                TransferStep::Downloading,
                TransferStep::Archiving,
                TransferStep::Moving,
                TransferStep::Deleting,
            ]
        );
    }

    #[tokio::test]
    async fn existing_destination_file_is_kept() {
        let fx = Fixture::new();
        std::fs::create_dir_all(&fx.dest_a).unwrap();
        std::fs::write(fx.dest_a.join("a.csv"), "yesterday").unwrap();

        let workflow = fx.workflow(FakePortal::new().file("LabA", "a.csv"));
        workflow.run(today(), &NoProgress).await.unwrap();

        assert_eq!(names_in(&fx.dest_a), vec!["a (1).csv", "a.csv"]);
        assert_eq!(std::fs::read_to_string(fx.dest_a.join("a.csv")).unwrap(), "yesterday");
    }

    #[tokio::test]
    async fn lost_download_times_out_and_stops() {
        let mut fx = Fixture::new();
        fx.config = fx.config.clone().with_watch(WatchConfig {
            max_attempts: 3,
            ..WatchConfig::default()
        });
        let portal = FakePortal::new()
            .file("LabA", "a.csv")
            .file("LabA", "b.csv")
            .lost_download("a.csv");
        let workflow = fx.workflow(portal);

        let err = workflow.run(today(), &NoProgress).await.unwrap_err();
        assert!(matches!(err, Error::Timeout { attempts: 3, ref name, .. } if name == "a.csv"));

        let actions = workflow.driver().actions();
        assert!(!actions.iter().any(|a| a.starts_with("delete")));
        assert!(!actions.contains(&"download b.csv".to_string()));
        assert!(workflow.driver().is_closed());
        assert!(!fx.config.paths.log_file.exists());
        let state = RunState::load(&fx.config.paths.state_file).unwrap();
        assert_eq!(state.last_completed_date, None);
    }

    #[tokio::test]
    async fn empty_folder_is_skipped() {
        let fx = Fixture::new();
        let workflow = fx.workflow(FakePortal::new().folder("LabA"));
        let stats = workflow.run(today(), &NoProgress).await.unwrap();
        assert_eq!(stats.folders_visited, 1);
        assert_eq!(stats.folders_empty, 1);
        assert!(stats.is_idle());
        assert_eq!(workflow.driver().actions(), vec!["open LabA"]);
    }

    #[tokio::test]
    async fn discover_only_lists_mapped_folders() {
        let fx = Fixture::new();
        let workflow = fx.workflow(FakePortal::new().folder("LabA").folder("LabB"));
        let table = workflow.discover().await.unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table[0].node_id, "allFiles_Tree::LabA");
        assert_eq!(table[0].destination, fx.dest_a);
        assert!(workflow.driver().actions().is_empty());
    }

    #[tokio::test]
    async fn plan_closes_the_session() {
        let fx = Fixture::new();
        let workflow = fx.workflow(FakePortal::new().folder("LabA"));
        let table = workflow.plan().await.unwrap();
        assert_eq!(table.len(), 1);
        assert!(workflow.driver().is_closed());
        assert!(!fx.config.paths.state_file.exists());
    }
}
