//! Portal folder to destination directory mapping.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Result;

#[derive(Debug, Deserialize)]
struct MappingRow {
    #[serde(rename = "DirName")]
    directory: String,
    #[serde(rename = "DestinationPath", alias = "net_Drive_Mapping", default)]
    destination: Option<String>,
}

/// Lookup table from a top-level portal folder name to its destination directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryMapping {
    destinations: HashMap<String, PathBuf>,
}

impl DirectoryMapping {
    /// Creates an empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a mapping.
    #[must_use]
    pub fn with(mut self, directory: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        self.destinations.insert(directory.into(), destination.into());
        self
    }

    /// Loads the mapping from a CSV file with `DirName` and `DestinationPath` columns.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a row is malformed.
    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let mapping = Self::from_reader(file)?;
        log::info!("Loaded {} folder mappings from {}", mapping.len(), path.display());
        Ok(mapping)
    }

    /// Reads the mapping from CSV data.
    ///
    /// Rows with an empty destination are ignored; when a folder appears more
    /// than once the first row wins.
    ///
    /// # Errors
    ///
    /// Returns an error if a row is malformed.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut destinations = HashMap::new();
        let mut csv = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        for row in csv.deserialize() {
            let row: MappingRow = row?;
            let Some(destination) = row.destination.filter(|d| !d.is_empty()) else {
                log::debug!("No destination for {}, ignoring", row.directory);
                continue;
            };
            if destinations.contains_key(&row.directory) {
                log::warn!("Duplicate mapping for {}, keeping the first", row.directory);
                continue;
            }
            destinations.insert(row.directory, PathBuf::from(destination));
        }
        Ok(Self { destinations })
    }

    /// Destination for a top-level folder, if mapped.
    #[must_use]
    pub fn destination(&self, directory: &str) -> Option<&Path> {
        self.destinations.get(directory).map(PathBuf::as_path)
    }

    /// Number of mapped folders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.destinations.len()
    }

    /// Returns true if nothing is mapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_rows_and_skips_blank_destinations() {
        let data = "DirName,DestinationPath\nLabA,/dest/LabA/\nLabB,\nLabC, //share/LabC/ \n";
        let mapping = DirectoryMapping::from_reader(data.as_bytes()).unwrap();
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.destination("LabA"), Some(Path::new("/dest/LabA/")));
        assert_eq!(mapping.destination("LabB"), None);
        assert_eq!(mapping.destination("LabC"), Some(Path::new("//share/LabC/")));
    }

    #[test]
    fn accepts_legacy_header() {
        let data = "DirName,net_Drive_Mapping\nLabA,/dest/LabA/\n";
        let mapping = DirectoryMapping::from_reader(data.as_bytes()).unwrap();
        assert_eq!(mapping.destination("LabA"), Some(Path::new("/dest/LabA/")));
    }

    #[test]
    fn first_duplicate_wins() {
        let data = "DirName,DestinationPath\nLabA,/one/\nLabA,/two/\n";
        let mapping = DirectoryMapping::from_reader(data.as_bytes()).unwrap();
        assert_eq!(mapping.destination("LabA"), Some(Path::new("/one/")));
    }

    #[test]
    fn builder() {
        let mapping = DirectoryMapping::new().with("LabA", "/dest/LabA/");
        assert!(!mapping.is_empty());
        assert_eq!(mapping.destination("LabA"), Some(Path::new("/dest/LabA/")));
    }
}
