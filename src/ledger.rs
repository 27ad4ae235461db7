//! Append-only CSV log of completed transfers.

use std::fs::OpenOptions;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One completed transfer: a file that reached its destination and its archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    /// Day of the run.
    #[serde(rename = "Date", with = "yyyymmdd")]
    pub date: NaiveDate,
    /// Original file name on the portal.
    #[serde(rename = "FileName")]
    pub file_name: String,
    /// Top-level portal folder the file came from.
    #[serde(rename = "DestinationName")]
    pub destination_name: String,
    /// Directory the file was moved into.
    #[serde(rename = "DestinationPath")]
    pub destination_path: String,
    /// Timestamped name of the archive copy.
    #[serde(rename = "ArchiveFileName")]
    pub archive_file_name: String,
    /// Full path of the archive copy.
    #[serde(rename = "ArchivePath")]
    pub archive_path: String,
}

/// The transfer log file.
#[derive(Debug, Clone)]
pub struct TransferLog {
    path: PathBuf,
}

impl TransferLog {
    /// Opens (lazily) the log at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Appends one record, writing the header first if the file is new or empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or written.
    pub fn append(&self, record: &TransferRecord) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let needs_header = file.metadata()?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer.serialize(record)?;
        writer.flush()?;
        log::debug!("Logged transfer of {}", record.file_name);
        Ok(())
    }

    /// Reads every record; a missing file reads as an empty log.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn read_all(&self) -> Result<Vec<TransferRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&self.path)?;
        let records = reader.deserialize().collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }
}

/// `NaiveDate` as `YYYYMMDD`.
mod yyyymmdd {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer, de};

    const FORMAT: &str = "%Y%m%d";

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&date.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let text = String::deserialize(deserializer)?;
        NaiveDate::parse_from_str(text.trim(), FORMAT).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(day: u32, file: &str) -> TransferRecord {
        TransferRecord {
            date: NaiveDate::from_ymd_opt(2021, 8, day).unwrap(),
            file_name: file.to_string(),
            destination_name: "LabA".to_string(),
            destination_path: "/dest/LabA/".to_string(),
            archive_file_name: format!("202108{day:02}_101500_{file}"),
            archive_path: format!("/archive/202108{day:02}_101500_{file}"),
        }
    }

    #[test]
    fn header_written_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs/pull.csv");
        let log = TransferLog::new(&path);
        log.append(&record(30, "a.csv")).unwrap();
        log.append(&record(31, "b.csv")).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "Date,FileName,DestinationName,DestinationPath,ArchiveFileName,ArchivePath"
        );
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("20210830,a.csv,LabA,"));
        assert_eq!(lines.iter().filter(|l| l.starts_with("Date,")).count(), 1);
    }

    #[test]
    fn read_back_appended_rows() {
        let dir = TempDir::new().unwrap();
        let log = TransferLog::new(dir.path().join("pull.csv"));
        assert!(log.read_all().unwrap().is_empty());

        let rows = vec![record(30, "a.csv"), record(31, "with,comma.txt")];
        for row in &rows {
            log.append(row).unwrap();
        }
        assert_eq!(log.read_all().unwrap(), rows);
    }

    #[test]
    fn header_added_to_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pull.csv");
        std::fs::write(&path, "").unwrap();
        let log = TransferLog::new(&path);
        log.append(&record(31, "a.csv")).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().starts_with("Date,"));
    }

    #[test]
    fn bad_date_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pull.csv");
        std::fs::write(
            &path,
            "Date,FileName,DestinationName,DestinationPath,ArchiveFileName,ArchivePath\n2021-08-31,a,b,c,d,e\n",
        )
        .unwrap();
        assert!(TransferLog::new(&path).read_all().is_err());
    }
}
