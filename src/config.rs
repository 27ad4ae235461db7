//! Application configuration.
//!
//! Everything the pull and report steps need is carried in one [`AppConfig`]
//! loaded from a TOML file; components receive the section they need at
//! construction.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::discovery::{ExclusionRule, ExpansionPolicy};
use crate::error::{Error, Result};
use crate::pacing::PollPolicy;
use crate::transfer::CopySuffix;
use crate::watcher::CompletionRule;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "SFT_PULL_CONFIG";
/// Environment variable holding the portal user name.
pub const USERNAME_ENV: &str = "SFT_USERNAME";
/// Environment variable holding the portal password.
pub const PASSWORD_ENV: &str = "SFT_PASSWORD";

const TEMPLATE_HEADER: &str = "\
# sft-pull configuration.
#
# Durations are in milliseconds. Leave [credentials] empty and set
# SFT_USERNAME / SFT_PASSWORD instead where possible.
# Each [[discovery.exclude]] table skips one top-level folder except the
# sub-folders in its allow list; set `exclude = []` under [discovery] to
# visit every mapped folder.

";

/// Portal and browser settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Login page of the portal.
    pub url: String,
    /// Address of the WebDriver server (e.g. chromedriver).
    pub webdriver_url: String,
    /// Run the browser without a window.
    pub headless: bool,
    /// Pause after each click.
    #[serde(rename = "settle_ms", with = "millis")]
    pub settle: Duration,
    /// Pause around downloads while listings render.
    #[serde(rename = "render_wait_ms", with = "millis")]
    pub render_wait: Duration,
    /// Pause after loading the page and after logging in.
    #[serde(rename = "page_load_ms", with = "millis")]
    pub page_load: Duration,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            url: "https://sft.wa.gov/".to_string(),
            webdriver_url: "http://localhost:9515".to_string(),
            headless: false,
            settle: Duration::from_secs(1),
            render_wait: Duration::from_secs(5),
            page_load: Duration::from_secs(15),
        }
    }
}

/// File and directory locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    /// Where the browser saves downloads.
    pub staging_dir: PathBuf,
    /// Where timestamped archive copies are kept.
    pub archive_dir: PathBuf,
    /// CSV mapping portal folders to destination directories.
    pub mapping_file: PathBuf,
    /// CSV log of completed transfers.
    pub log_file: PathBuf,
    /// Completion marker and recipient list.
    pub state_file: PathBuf,
    /// Pickup directory for outgoing report messages.
    pub outbox_dir: PathBuf,
}

impl Default for PathConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sft-pull");
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sft-pull");

        Self {
            staging_dir: dirs::download_dir().unwrap_or_else(|| PathBuf::from(".")),
            archive_dir: data_dir.join("archive"),
            mapping_file: config_dir.join("expected_directories.csv"),
            log_file: data_dir.join("sft_automated_pull_log.csv"),
            state_file: data_dir.join("state.toml"),
            outbox_dir: data_dir.join("outbox"),
        }
    }
}

/// Completion watcher settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Pause between existence checks.
    #[serde(rename = "interval_ms", with = "millis")]
    pub interval: Duration,
    /// Checks before a transfer is declared failed.
    pub max_attempts: u32,
    /// Which candidate paths must exist.
    pub rule: CompletionRule,
}

impl Default for WatchConfig {
    fn default() -> Self {
        let policy = PollPolicy::default();
        Self {
            interval: policy.interval,
            max_attempts: policy.max_attempts,
            rule: CompletionRule::default(),
        }
    }
}

impl WatchConfig {
    /// The polling policy these settings describe.
    #[must_use]
    pub const fn policy(&self) -> PollPolicy {
        PollPolicy::new(self.interval, self.max_attempts)
    }
}

/// Folder tree discovery settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Top-level folders to skip, with per-folder exceptions.
    pub exclude: Vec<ExclusionRule>,
    /// Expansion rounds before giving up on a tree that never settles.
    pub max_rounds: u32,
    /// Pause after each expansion round.
    #[serde(rename = "round_pause_ms", with = "millis")]
    pub round_pause: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            exclude: vec![ExclusionRule::new("SENTINEL_LABS", &["NW_Genomics"])],
            max_rounds: 50,
            round_pause: Duration::from_secs(2),
        }
    }
}

impl DiscoveryConfig {
    /// Expansion bounds, pausing `settle` after each click.
    #[must_use]
    pub const fn expansion(&self, settle: Duration) -> ExpansionPolicy {
        ExpansionPolicy {
            max_rounds: self.max_rounds,
            settle,
            round_pause: self.round_pause,
        }
    }
}

/// File placement settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Naming of copies when the destination already has the file.
    pub copy_suffix: CopySuffix,
}

/// Daily report settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Subject line.
    pub subject: String,
    /// Sender address; defaults to `sft-pull@<hostname>` when empty.
    pub sender: String,
    /// Closing line of the message body.
    pub signature: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            subject: "Sequencing SFT Pull: Daily Report".to_string(),
            sender: String::new(),
            signature: "-SFT Pull".to_string(),
        }
    }
}

impl ReportConfig {
    /// Sender address, falling back to one derived from the host name.
    #[must_use]
    pub fn sender_address(&self) -> String {
        if !self.sender.is_empty() {
            return self.sender.clone();
        }
        let host = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "localhost".to_string());
        format!("sft-pull@{host}")
    }
}

/// Portal login.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    /// Portal user name.
    pub username: String,
    /// Portal password.
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Returns true if both fields are filled in.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }

    /// Overlays `SFT_USERNAME` / `SFT_PASSWORD` onto these credentials.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(username) = std::env::var(USERNAME_ENV) {
            self.username = username;
        }
        if let Ok(password) = std::env::var(PASSWORD_ENV) {
            self.password = password;
        }
        self
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Portal and browser settings.
    pub portal: PortalConfig,
    /// File locations.
    pub paths: PathConfig,
    /// Completion watcher settings.
    pub watch: WatchConfig,
    /// Tree discovery settings.
    pub discovery: DiscoveryConfig,
    /// File placement settings.
    pub transfer: TransferConfig,
    /// Report settings.
    pub report: ReportConfig,
    /// Portal login; usually left empty in favour of environment variables.
    pub credentials: Credentials,
}

impl AppConfig {
    /// Creates a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Default config file location: `$SFT_PULL_CONFIG`, else the user config dir.
    #[must_use]
    pub fn default_path() -> PathBuf {
        std::env::var_os(CONFIG_ENV).map_or_else(
            || {
                dirs::config_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("sft-pull")
                    .join("config.toml")
            },
            PathBuf::from,
        )
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Loads configuration, writing a default template first if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the template cannot be written or the file cannot be parsed.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_with_header(path, TEMPLATE_HEADER)?;
            log::info!("Wrote default configuration to {}", path.display());
            return Ok(config);
        }
        Self::load(path)
    }

    /// Saves the configuration atomically (write tmp + rename).
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        self.save_with_header(path, "")
    }

    fn save_with_header(&self, path: &Path, header: &str) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp_path = path.with_extension("toml.tmp");
        let body = toml::to_string_pretty(self)?;
        std::fs::write(&tmp_path, format!("{header}{body}"))?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Resolves the portal login from the file and the environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when no complete credentials are available.
    pub fn credentials(&self) -> Result<Credentials> {
        let credentials = self.credentials.clone().with_env_overrides();
        if credentials.has_credentials() {
            Ok(credentials)
        } else {
            Err(Error::Config(format!(
                "no portal credentials; set {USERNAME_ENV} and {PASSWORD_ENV} or fill in [credentials]"
            )))
        }
    }

    /// Sets the staging directory.
    #[must_use]
    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.paths.staging_dir = dir.into();
        self
    }

    /// Sets the archive directory.
    #[must_use]
    pub fn with_archive_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.paths.archive_dir = dir.into();
        self
    }

    /// Sets the watcher policy.
    #[must_use]
    pub const fn with_watch(mut self, watch: WatchConfig) -> Self {
        self.watch = watch;
        self
    }

    /// Sets the copy naming style.
    #[must_use]
    pub const fn with_copy_suffix(mut self, copy_suffix: CopySuffix) -> Self {
        self.transfer.copy_suffix = copy_suffix;
        self
    }
}

/// Serializes a `Duration` as whole milliseconds.
mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::cast_possible_truncation)]
    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
