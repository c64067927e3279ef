//! Progress bars and listings for the command line.

use std::time::Duration;

use console::style;
use indicatif::{HumanBytes, HumanDuration, ProgressBar, ProgressStyle};

use crate::{BatchSummary, Catalog, CatalogEntry, SessionEvent};

const SEPARATOR: &str = "────────────────────────────────────────────────────────────";

/// Creates a progress bar for a single file transfer.
pub fn make_progress_bar(size: u64, name: &str) -> ProgressBar {
    let bar = ProgressBar::new(size);
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} [{bar:40.cyan/blue}] {bytes}/{total_bytes} @ {bytes_per_sec} - {msg}",
        )
        .expect("progress template is valid")
        .progress_chars("━━╌"),
    );
    bar.set_message(name.to_string());
    bar
}

/// Creates a progress bar counting finished files of a batch.
pub fn make_batch_bar(files: usize) -> ProgressBar {
    let bar = ProgressBar::new(files as u64);
    bar.set_style(
        ProgressStyle::with_template("Batch [{bar:40.green/white}] {pos}/{len} files")
            .expect("template valid")
            .progress_chars("━━╌"),
    );
    bar
}

fn status(entry: &CatalogEntry) -> console::StyledObject<&'static str> {
    if entry.downloaded && entry.partial {
        style("reduced").yellow()
    } else if entry.downloaded {
        style("done").green()
    } else if entry.partial {
        style("partial").red()
    } else {
        style("-").dim()
    }
}

/// Prints the catalog, newest first.
pub fn print_catalog(catalog: &Catalog) {
    if catalog.is_empty() {
        println!("No files on the camera.");
        return;
    }

    println!("\n{SEPARATOR}");
    println!("{:<10} {:<16} {:>12}  local", "id", "file", "size");
    println!("{SEPARATOR}");
    for entry in catalog.entries() {
        println!(
            "{:<10} {:<16} {:>12}  {}",
            entry.id,
            entry.file_name,
            HumanBytes(entry.size).to_string(),
            status(entry)
        );
    }
    println!("{SEPARATOR}");
    let total: u64 = catalog.entries().iter().map(|e| e.size).sum();
    println!("  {} file(s), {} total", catalog.len(), HumanBytes(total));
    println!("{SEPARATOR}\n");
}

/// Renders one session event as a status line, or `None` for noisy events.
pub fn describe_event(event: &SessionEvent) -> Option<String> {
    match event {
        SessionEvent::ConnectionChanged {
            connected: true,
            model,
        } => Some(format!("{} {model}", style("connected").green())),
        SessionEvent::ConnectionChanged {
            connected: false, ..
        } => Some(style("disconnected").red().to_string()),
        SessionEvent::CatalogCleared => Some("catalog rebuilt".to_string()),
        SessionEvent::CountChanged(count) => Some(format!("{count} file(s) on the camera")),
        SessionEvent::DownloadingChanged(true) => Some("batch download started".to_string()),
        SessionEvent::DownloadingChanged(false) => Some("batch download finished".to_string()),
        SessionEvent::EntryUpdated(entry) if entry.downloaded && !entry.downloading => {
            Some(format!("{} {}", style("downloaded").green(), entry.file_name))
        }
        _ => None,
    }
}

/// Prints the outcome of a batch download.
pub fn print_summary(summary: &BatchSummary, elapsed: Duration) {
    if summary.attempted == 0 {
        println!("Nothing selected.");
        return;
    }

    println!("\n{SEPARATOR}");
    println!("Download Summary");
    println!("{SEPARATOR}");
    println!("  Files downloaded:  {}", summary.succeeded);
    if summary.failed > 0 {
        println!("  Files failed:      {}", style(summary.failed).red());
    }
    println!("  Total size:        {}", HumanBytes(summary.bytes));
    println!("  Total time:        {}", HumanDuration(elapsed));
    println!("{SEPARATOR}");
}
