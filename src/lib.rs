//! sft-pull - automated daily pull from a secure file-transfer portal.
//!
//! The library logs into the portal through a WebDriver browser session,
//! expands the remote folder tree to a fixed point, and for every folder with a
//! known destination downloads, archives, relocates and deletes each file,
//! confirming every step on the file system before the next one starts. Each
//! transfer is appended to a CSV log, from which a daily HTML report is built.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use sft_pull::{AppConfig, DirectoryMapping, NoProgress, PullWorkflow, SftPortal, TokioPacer};
//!
//! # async fn example() -> sft_pull::Result<()> {
//! let config = AppConfig::load_or_create(&AppConfig::default_path())?;
//! let mapping = DirectoryMapping::load(&config.paths.mapping_file)?;
//! let pacer = Arc::new(TokioPacer);
//!
//! let portal = SftPortal::connect(
//!     config.portal.clone(),
//!     &config.credentials()?,
//!     &config.paths.staging_dir,
//!     pacer.clone(),
//! )
//! .await?;
//!
//! let workflow = PullWorkflow::new(portal, config, mapping, pacer);
//! let today = chrono::Local::now().date_naive();
//! let stats = workflow.run(today, &NoProgress).await?;
//! println!("Transferred {} files", stats.files_transferred);
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod discovery;
pub mod error;
pub mod format;
pub mod fs;
pub mod ledger;
pub mod mapping;
pub mod pacing;
pub mod portal;
pub mod report;
pub mod state;
pub mod stats;
pub mod transfer;
pub mod watcher;
pub mod workflow;

#[cfg(feature = "cli")]
pub mod cli;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use config::{AppConfig, Credentials};
pub use discovery::{ExclusionRule, NavigationEntry};
pub use error::{Error, Result};
pub use format::format_duration;
pub use fs::{FileSystem, TokioFileSystem};
pub use ledger::{TransferLog, TransferRecord};
pub use mapping::DirectoryMapping;
pub use pacing::{Pacer, PollPolicy, TokioPacer};
pub use portal::{PortalDriver, SftPortal};
pub use report::{DailyReport, Notifier, OutboxNotifier, ReportMessage, send_daily_report};
pub use state::RunState;
pub use stats::RunStats;
pub use transfer::CopySuffix;
pub use watcher::{CompletionRule, TransferWatcher};
pub use workflow::{NoProgress, PullWorkflow, TransferStep, WorkflowProgress};
