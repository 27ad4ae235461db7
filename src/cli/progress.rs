//! Progress bars and summaries for terminal runs.

use std::time::Duration;

use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::{NavigationEntry, RunStats, TransferRecord, TransferStep, WorkflowProgress, format_duration};

const SEPARATOR: &str = "────────────────────────────────────────────────────────────";

/// Creates the bar counting processed folders.
fn make_folder_bar() -> ProgressBar {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("Folders [{bar:40.green/white}] {pos}/{len} - {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("━━╌"),
    );
    bar
}

/// Creates the spinner showing the file in flight.
fn make_file_spinner() -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {elapsed:>4} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar
}

/// Terminal rendering of a pull's progress.
pub struct CliProgress {
    multi: MultiProgress,
    folders: ProgressBar,
    file: ProgressBar,
}

impl Default for CliProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl CliProgress {
    /// Creates the bars; nothing is drawn until discovery finishes.
    #[must_use]
    pub fn new() -> Self {
        let multi = MultiProgress::new();
        let folders = multi.add(make_folder_bar());
        let file = multi.add(make_file_spinner());
        Self { multi, folders, file }
    }

    /// Removes the bars from the terminal.
    pub fn finish(&self) {
        self.file.finish_and_clear();
        self.folders.finish_and_clear();
        self.multi.clear().ok();
    }
}

impl WorkflowProgress for CliProgress {
    fn on_discovered(&self, entries: &[NavigationEntry]) {
        self.folders.set_length(entries.len() as u64);
        self.file.enable_steady_tick(Duration::from_millis(250));
    }

    fn on_folder_start(&self, entry: &NavigationEntry, files: usize, _subfolders: usize) {
        self.folders
            .set_message(format!("{} ({files} files)", entry.top_level));
    }

    fn on_file_step(&self, name: &str, step: TransferStep) {
        let label = match step {
            TransferStep::Deleting => style(step.label()).yellow(),
            _ => style(step.label()).cyan(),
        };
        self.file.set_message(format!("{name} {label}"));
    }

    fn on_file_complete(&self, record: &TransferRecord) {
        let _ = self.multi.println(format!(
            "  {} {} -> {}",
            style("✓").green(),
            record.file_name,
            record.destination_path
        ));
    }

    fn on_folder_complete(&self, _entry: &NavigationEntry) {
        self.folders.inc(1);
    }
}

/// Prints the navigation table produced by discovery.
pub fn print_plan(entries: &[NavigationEntry]) {
    if entries.is_empty() {
        println!("No mapped folders found.");
        return;
    }

    println!("\n{SEPARATOR}");
    println!("Folders to visit:");
    println!("{SEPARATOR}");
    for (index, entry) in entries.iter().enumerate() {
        println!(
            "  {index:>3}  {}  {}",
            style(&entry.node_id).bold(),
            style(entry.destination.display()).dim()
        );
    }
    println!("{SEPARATOR}");
    println!("  {} folder(s)", entries.len());
    println!("{SEPARATOR}\n");
}

/// Prints a summary of a finished pull.
pub fn print_summary(stats: &RunStats) {
    println!("\n{SEPARATOR}");
    println!("{}", style("Pull Summary").bold());
    println!("{SEPARATOR}");
    println!("  Folders visited:   {}", stats.folders_visited);
    if stats.folders_empty > 0 {
        println!("  Empty folders:     {}", stats.folders_empty);
    }
    println!(
        "  Files transferred: {}",
        style(stats.files_transferred).green()
    );
    if stats.subfolders_removed > 0 {
        println!("  Folders removed:   {}", stats.subfolders_removed);
    }
    println!("  Total time:        {}", format_duration(stats.elapsed));
    println!("{SEPARATOR}");
}

/// Prints the report recipient list.
pub fn print_recipients(recipients: &[String]) {
    if recipients.is_empty() {
        println!("No report recipients configured.");
        return;
    }
    println!("Report recipients:");
    for address in recipients {
        println!("  {address}");
    }
}
