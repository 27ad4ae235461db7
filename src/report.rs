//! Daily report: today's transfers rendered as an HTML message.
//!
//! The report is built from the transfer log only. Delivery goes through a
//! [`Notifier`]; the shipped [`OutboxNotifier`] drops a ready-to-send `.eml`
//! file into a pickup directory served by the site's mail relay.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::PathBuf;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Local, NaiveDate};

use crate::config::{AppConfig, ReportConfig};
use crate::error::{Error, Result};
use crate::format::{archive_clock, date_token, escape_html};
use crate::ledger::{TransferLog, TransferRecord};
use crate::state::RunState;

/// One table row of the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    /// Day of the transfer.
    pub date: NaiveDate,
    /// Top-level portal folder.
    pub folder: String,
    /// File name.
    pub file: String,
    /// `HH:MM` taken from the archive name, empty if it could not be read.
    pub time_of_download: String,
}

/// Today's transfers plus the folders that submitted for the first time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyReport {
    /// Report day.
    pub date: NaiveDate,
    /// Today's rows, sorted by folder.
    pub rows: Vec<ReportRow>,
    /// Folders seen today but on no earlier day, sorted.
    pub new_submitters: Vec<String>,
}

impl DailyReport {
    /// Builds the report for `today` from the full log.
    #[must_use]
    pub fn from_records(records: &[TransferRecord], today: NaiveDate) -> Self {
        let mut rows: Vec<ReportRow> = records
            .iter()
            .filter(|r| r.date == today)
            .map(|r| ReportRow {
                date: r.date,
                folder: r.destination_name.clone(),
                file: r.file_name.clone(),
                time_of_download: archive_clock(&r.archive_file_name).unwrap_or_default(),
            })
            .collect();
        rows.sort_by(|a, b| a.folder.cmp(&b.folder));

        let earlier: BTreeSet<&str> = records
            .iter()
            .filter(|r| r.date < today)
            .map(|r| r.destination_name.as_str())
            .collect();
        let new_submitters = rows
            .iter()
            .map(|r| r.folder.as_str())
            .filter(|folder| !earlier.contains(folder))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(ToString::to_string)
            .collect();

        Self {
            date: today,
            rows,
            new_submitters,
        }
    }

    /// Returns true when nothing was transferred on the report day.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Renders the rows as an HTML table with a leading index column.
    #[must_use]
    pub fn html_table(&self) -> String {
        let mut html = String::from(
            "<table border=\"1\" class=\"dataframe table table-striped\">\n  <thead>\n    <tr style=\"text-align: right;\">\n      <th></th>\n      <th>Date</th>\n      <th>Folder</th>\n      <th>File</th>\n      <th>TimeOfDownload</th>\n    </tr>\n  </thead>\n  <tbody>\n",
        );
        for (index, row) in self.rows.iter().enumerate() {
            let _ = write!(
                html,
                "    <tr>\n      <th>{index}</th>\n      <td>{}</td>\n      <td>{}</td>\n      <td>{}</td>\n      <td>{}</td>\n    </tr>\n",
                date_token(row.date),
                escape_html(&row.folder),
                escape_html(&row.file),
                escape_html(&row.time_of_download),
            );
        }
        html.push_str("  </tbody>\n</table>");
        html
    }

    /// Renders the message body.
    #[must_use]
    pub fn html_body(&self, signature: &str) -> String {
        let signature = escape_html(signature);
        if self.is_empty() {
            return format!(
                "<h1 style=\"text-align: center;\"><span style=\"color: #3366ff;\">SFT Pull Report: {}</span></h1>\n\
                 <p>Hello,</p>\n\
                 <p>There were no files found in the SFT today.</p>\n\
                 <p>Have a great day!</p>\n\
                 <p>{signature}</p>\n",
                self.date
            );
        }

        let headings: String = self
            .new_submitters
            .iter()
            .map(|folder| {
                format!(
                    "<h2 style=\"text-align: left;\"><span style=\"color: #DE3163;\">Please review first submission:  {}</span></h2>\n",
                    escape_html(folder)
                )
            })
            .collect();

        format!(
            "<h1 style=\"text-align: left;\"><span style=\"color: #6495ED;\">SFT Pull Report: {}</span></h1>\n\
             {headings}\
             <p>Hello,</p>\n\
             <p>See the table below for all files pulled from the SFT today.  Times are represented in a 24-hour format.</p>\n\
             {}\n\
             <p>Have a great day!</p>\n\
             <p>{signature}</p>\n",
            self.date,
            self.html_table()
        )
    }

    /// Wraps the body into a message for `recipients`.
    #[must_use]
    pub fn message(&self, config: &ReportConfig, recipients: &[String]) -> ReportMessage {
        ReportMessage {
            subject: config.subject.clone(),
            sender: config.sender_address(),
            recipients: recipients.to_vec(),
            html_body: self.html_body(&config.signature),
        }
    }
}

/// A rendered report ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportMessage {
    /// Subject line.
    pub subject: String,
    /// From address.
    pub sender: String,
    /// To addresses.
    pub recipients: Vec<String>,
    /// HTML body.
    pub html_body: String,
}

impl ReportMessage {
    /// Formats the message as an RFC 5322 document with an HTML body.
    ///
    /// A non-ASCII subject is sent as RFC 2047 encoded words.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a header value contains a line break.
    pub fn to_eml(&self, sent: DateTime<Local>) -> Result<String> {
        let to = self.recipients.join(", ");
        for (header, value) in [("From", &self.sender), ("To", &to), ("Subject", &self.subject)] {
            if value.contains(['\r', '\n']) {
                return Err(Error::Config(format!("line break in {header} header")));
            }
        }

        let mut eml = String::new();
        let _ = write!(eml, "From: {}\r\n", self.sender);
        let _ = write!(eml, "To: {to}\r\n");
        let _ = write!(eml, "Subject: {}\r\n", encode_header(&self.subject));
        let _ = write!(eml, "Date: {}\r\n", sent.to_rfc2822());
        eml.push_str("MIME-Version: 1.0\r\n");
        eml.push_str("Content-Type: text/html; charset=utf-8\r\n");
        eml.push_str("Content-Transfer-Encoding: 8bit\r\n\r\n");
        for line in self.html_body.lines() {
            eml.push_str(line);
            eml.push_str("\r\n");
        }
        Ok(eml)
    }
}

/// Raw bytes per encoded word; keeps folded lines under 78 characters.
const ENCODED_WORD_BYTES: usize = 39;

/// Returns `value` unchanged if it is ASCII, else as folded `=?utf-8?B?...?=` words.
fn encode_header(value: &str) -> String {
    if value.is_ascii() {
        return value.to_string();
    }
    let mut words = Vec::new();
    let mut chunk = String::new();
    for c in value.chars() {
        if chunk.len() + c.len_utf8() > ENCODED_WORD_BYTES {
            words.push(std::mem::take(&mut chunk));
        }
        chunk.push(c);
    }
    words.push(chunk);
    words
        .iter()
        .map(|word| format!("=?utf-8?B?{}?=", BASE64.encode(word)))
        .collect::<Vec<_>>()
        .join("\r\n ")
}

/// Delivery channel for report messages.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Hands the message over for delivery.
    async fn send(&self, message: &ReportMessage) -> Result<()>;
}

/// Writes each message as an `.eml` file into a pickup directory.
#[derive(Debug, Clone)]
pub struct OutboxNotifier {
    dir: PathBuf,
}

impl OutboxNotifier {
    /// Creates a notifier dropping messages into `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl Notifier for OutboxNotifier {
    async fn send(&self, message: &ReportMessage) -> Result<()> {
        let now = Local::now();
        tokio::fs::create_dir_all(&self.dir).await?;
        let name = format!("sft-report-{}.eml", now.format("%Y%m%d-%H%M%S%3f"));
        let path = self.dir.join(&name);
        // The relay may pick up anything ending in .eml, so write under another name first.
        let tmp_path = self.dir.join(format!("{name}.tmp"));
        tokio::fs::write(&tmp_path, message.to_eml(now)?).await?;
        tokio::fs::rename(&tmp_path, &path).await?;
        log::info!(
            "Report for {} recipients written to {}",
            message.recipients.len(),
            path.display()
        );
        Ok(())
    }
}

/// Checks the completion marker, builds today's report and sends it.
///
/// # Errors
///
/// Returns [`Error::StaleState`] when today's pull has not completed,
/// [`Error::Config`] when no recipients are configured, or any error from
/// reading the log or sending.
pub async fn send_daily_report(
    config: &AppConfig,
    today: NaiveDate,
    notifier: &dyn Notifier,
) -> Result<DailyReport> {
    let state = RunState::load(&config.paths.state_file)?;
    state.ensure_completed_on(today)?;
    log::info!("Pull completed today, preparing report");

    if state.email_recipients.is_empty() {
        return Err(Error::Config(
            "no report recipients; add some with `sft-pull recipients ADDR...`".to_string(),
        ));
    }

    let records = TransferLog::new(&config.paths.log_file).read_all()?;
    let report = DailyReport::from_records(&records, today);
    log::info!(
        "{} files today, {} first submissions",
        report.rows.len(),
        report.new_submitters.len()
    );
    notifier
        .send(&report.message(&config.report, &state.email_recipients))
        .await?;
    Ok(report)
}
