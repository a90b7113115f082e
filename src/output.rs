use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::stem::StemKey;
use crate::sync::RunSummary;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Write `{stem}.json` (payload) and `{stem}.md` (summary) into `dir`,
/// creating it if needed.
#[instrument(skip(payload_json, summary), fields(dir = %dir.display()))]
pub fn write_artifacts(
    dir: &Path,
    stem: &StemKey,
    payload_json: &str,
    summary: &str,
) -> Result<(), OutputError> {
    fs::create_dir_all(dir).map_err(|source| OutputError::FileWrite {
        path: dir.to_path_buf(),
        source,
    })?;
    write_file(&dir.join(format!("{stem}.json")), payload_json)?;
    write_file(&dir.join(format!("{stem}.md")), summary)?;
    debug!("wrote artifacts");
    Ok(())
}

fn write_file(path: &Path, contents: &str) -> Result<(), OutputError> {
    fs::write(path, contents).map_err(|source| OutputError::FileWrite {
        path: path.to_path_buf(),
        source,
    })
}

/// How a single PR ended in this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrOutcome<'a> {
    Journaled,
    Cached,
    Failed(&'a str),
}

/// Print one progress line for a PR as it is handled.
pub fn print_pr_status(stem: &StemKey, outcome: PrOutcome<'_>) {
    println!("{}", format_pr_status(stem, outcome));
}

fn format_pr_status(stem: &StemKey, outcome: PrOutcome<'_>) -> String {
    match outcome {
        PrOutcome::Journaled => format!("  {} {stem}", "✓".green().bold()),
        PrOutcome::Cached => format!("  {} {stem} {}", "↷".yellow(), "(cached)".dimmed()),
        PrOutcome::Failed(message) => format!("  {} {stem}: {}", "✗".red().bold(), message.red()),
    }
}

/// Print the end-of-run summary to the terminal.
///
/// ═══ Journal sync ═══
/// Collected: 12 | Selected: 5
/// Processed: 3 | Cached: 1 | Failed: 1
///   ✗ acme_widgets_PR42_2024-03-05: Notion request failed: ...
pub fn print_run_summary(summary: &RunSummary) {
    println!();
    println!("═══ Journal sync ═══");
    println!(
        "Collected: {} | Selected: {}",
        summary.collected, summary.selected
    );
    println!(
        "Processed: {} | Cached: {} | Failed: {}",
        summary.processed.to_string().green().bold(),
        summary.cached.to_string().yellow(),
        colorize_failures(summary.failures.len()),
    );
    for failure in &summary.failures {
        println!("  {} {}: {}", "✗".red(), failure.stem, failure.message);
    }
    println!();
}

fn colorize_failures(count: usize) -> colored::ColoredString {
    if count == 0 {
        "0".green()
    } else {
        count.to_string().red().bold()
    }
}
