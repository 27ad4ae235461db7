//! File placement: timestamped archive copies and collision-safe moves.

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::format::{date_token, time_token};
use crate::fs::FileSystem;

/// How a counter is worked into a file name that already exists at the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CopySuffix {
    /// `report (1).csv`, the way Windows Explorer names copies.
    #[default]
    Windows,
    /// `report (1)csv`: drops every dot, reproducing the names older runs wrote.
    Legacy,
}

impl CopySuffix {
    /// Returns the `n`-th alternative name for `name`.
    #[must_use]
    pub fn apply(self, name: &str, n: u32) -> String {
        match self {
            Self::Windows => match name.rfind('.') {
                Some(dot) if dot > 0 => format!("{} ({n}){}", &name[..dot], &name[dot..]),
                _ => format!("{name} ({n})"),
            },
            Self::Legacy => match name.rsplit_once('.') {
                Some((head, last)) => format!("{} ({n}){last}", head.replace('.', "")),
                None => format!(" ({n}){name}"),
            },
        }
    }
}

/// Builds the archive name `<YYYYMMDD>_<HHMMSS>_<name>`.
#[must_use]
pub fn archive_name(date: NaiveDate, time: NaiveTime, name: &str) -> String {
    format!("{}_{}_{name}", date_token(date), time_token(time))
}

/// Picks a name for `name` inside `directory` that does not exist yet.
pub async fn free_name<F: FileSystem + ?Sized>(
    fs: &F,
    directory: &Path,
    name: &str,
    suffix: CopySuffix,
) -> String {
    if !fs.file_exists(&directory.join(name)).await {
        return name.to_string();
    }
    let mut n = 1;
    loop {
        let candidate = suffix.apply(name, n);
        if !fs.file_exists(&directory.join(&candidate)).await {
            return candidate;
        }
        n += 1;
    }
}

/// Copies `name` from `source_dir` into `archive_dir` under its archive name.
///
/// Returns the archive file name. An archive file of the same name (same file,
/// same second) is overwritten.
///
/// # Errors
///
/// Returns an error if the archive directory cannot be created or the copy fails.
pub async fn copy_to_archive<F: FileSystem + ?Sized>(
    fs: &F,
    name: &str,
    source_dir: &Path,
    archive_dir: &Path,
    date: NaiveDate,
    time: NaiveTime,
) -> Result<String> {
    let archived = archive_name(date, time, name);
    let target = archive_dir.join(&archived);
    fs.create_dir_all(archive_dir).await?;
    if fs.file_exists(&target).await {
        log::warn!("Overwriting archive copy {}", target.display());
    }
    fs.copy_file(&source_dir.join(name), &target).await?;
    log::info!("Copied file to archive: {archived}");
    Ok(archived)
}

/// Moves `name` from `source_dir` into `destination_dir` without clobbering.
///
/// Returns the full path the file was moved to.
///
/// # Errors
///
/// Returns an error if the destination directory cannot be created or the
/// move fails.
pub async fn move_into<F: FileSystem + ?Sized>(
    fs: &F,
    name: &str,
    source_dir: &Path,
    destination_dir: &Path,
    suffix: CopySuffix,
) -> Result<PathBuf> {
    fs.create_dir_all(destination_dir).await?;
    let target_name = free_name(fs, destination_dir, name, suffix).await;
    if target_name != name {
        log::info!("{name} already exists in {}, using {target_name}", destination_dir.display());
    }
    let target = destination_dir.join(&target_name);
    fs.move_file(&source_dir.join(name), &target).await?;
    log::info!("Moved file: {name}");
    Ok(target)
}
