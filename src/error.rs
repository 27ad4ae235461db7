//! Error types for the sft-pull library.

use chrono::NaiveDate;
use thiserror::Error;

/// Errors that can occur while pulling files from the portal or reporting on them.
#[derive(Error, Debug)]
pub enum Error {
    /// A watched file never showed up in its directory.
    #[error("Timed out waiting for {name} in {directory} after {attempts} checks")]
    Timeout {
        /// File name being waited on.
        name: String,
        /// Directory the file was expected in.
        directory: String,
        /// Number of existence checks performed.
        attempts: u32,
    },

    /// The last completed pull is not from today.
    #[error("Last completed pull was {}, expected {today}", last_completed.map_or_else(|| "never".to_string(), |d| d.to_string()))]
    StaleState {
        /// Date recorded by the completion marker, if any.
        last_completed: Option<NaiveDate>,
        /// Date the check ran on.
        today: NaiveDate,
    },

    /// The remote tree still had collapsed folders after the expansion bound.
    #[error("Folder tree still had collapsed nodes after {rounds} expansion rounds")]
    TreeNotSettled {
        /// Number of expansion rounds performed.
        rounds: u32,
    },

    /// The WebDriver endpoint reported a failure.
    #[error("WebDriver error: {0}")]
    Driver(String),

    /// The portal rendered markup the adapter could not interpret.
    #[error("Unexpected portal markup: {0}")]
    Markup(String),

    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// CSV read or write error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

/// A specialized `Result` type for sft-pull operations.
pub type Result<T> = std::result::Result<T, Error>;
