//! Run report formatting
//!
//! Renders a [`RunSummary`] as the plain-text report printed at the end of a
//! run.

use crate::crawler::{CrawlOutcome, RunSummary};
use std::fmt::Write;

/// Formats the run report
///
/// Units are listed by name so that the report is stable regardless of
/// completion order.
pub fn format_summary(summary: &RunSummary) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "=== Harvest Summary ===\n");
    let _ = writeln!(out, "Overview:");
    let _ = writeln!(out, "  Units: {}", summary.outcomes.len());
    let _ = writeln!(out, "  Files downloaded: {}", summary.total_downloaded());
    let _ = writeln!(out, "  Already cached: {}", summary.total_cached());
    let _ = writeln!(out, "  Errors: {}", summary.total_errors());
    let _ = writeln!(
        out,
        "  Elapsed: {:.2}s",
        summary.elapsed.as_secs_f64()
    );
    let _ = writeln!(out);

    let mut outcomes: Vec<&CrawlOutcome> = summary.outcomes.iter().collect();
    outcomes.sort_by(|a, b| a.unit.cmp(&b.unit));

    let _ = writeln!(out, "Units:");
    for outcome in outcomes {
        let _ = writeln!(
            out,
            "  {}: {} images, {} downloaded, {} cached, {} errors",
            outcome.unit,
            outcome.images_found,
            outcome.files_downloaded,
            outcome.cached,
            outcome.error_count()
        );
        for (source, reason) in &outcome.errors {
            let _ = writeln!(out, "    - {}: {}", source, reason);
        }
    }

    out
}

/// Prints the run report to stdout
pub fn print_summary(summary: &RunSummary) {
    print!("{}", format_summary(summary));
}
