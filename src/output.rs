//! CLI output for the pipeline.
//!
//! Progress goes to stdout, warnings to stderr. Workers print from the
//! rayon pool, so every message is a single `println!`/`eprintln!` call —
//! lines interleave between records but never within one.
//!
//! The run summary is built by a pure `format_*` function (testable) with
//! a `print_*` wrapper that writes to stdout.

use std::fmt::Display;
use std::time::Duration;

/// A source image is being downloaded.
pub fn downloading(url: &str) {
    println!("Downloading {url}");
}

/// A model record is being processed.
pub fn processing(id: &str) {
    println!("Processing {id}");
}

/// The persisted cache is being restored from the archived snapshot.
pub fn restoring_cache(url: &str) {
    println!("Restoring thumbnail cache from {url}");
}

/// The run's output is being folded back into the persisted cache.
pub fn updating_cache() {
    println!("Updating thumbnail cache");
}

pub fn warn_cache_restore(detail: &str) {
    eprintln!("Warning: could not restore thumbnail cache: {detail}");
}

/// A source URL could not be resolved to an image; thumbnails depending
/// on it are skipped this run.
pub fn warn_load_failed(url: &str, err: &dyn Display) {
    eprintln!("Warning: skipping {url}: {err}");
}

/// A record failed mid-processing; the rest of the batch continues.
pub fn warn_record_failed(id: &str, err: &dyn Display) {
    eprintln!("Warning: failed to process {id}: {err}");
}

/// Counters accumulated over one run.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunStats {
    pub records: usize,
    pub failed_records: usize,
    pub dropped_urls: usize,
}

/// Format the end-of-run summary.
///
/// ```text
/// Processed 1032 models
/// Finished thumbnails in 42.17 seconds
/// ```
pub fn format_summary(stats: &RunStats, elapsed: Duration) -> Vec<String> {
    let mut lines = Vec::new();
    lines.push(format!("Processed {} models", stats.records));
    if stats.failed_records > 0 {
        lines.push(format!("{} models failed", stats.failed_records));
    }
    if stats.dropped_urls > 0 {
        lines.push(format!("{} images could not be loaded", stats.dropped_urls));
    }
    lines.push(format!(
        "Finished thumbnails in {:.2} seconds",
        elapsed.as_secs_f64()
    ));
    lines
}

pub fn print_summary(stats: &RunStats, elapsed: Duration) {
    for line in format_summary(stats, elapsed) {
        println!("{}", line);
    }
}
