//! Output formatting and styling module.
//!
//! Provides a centralized interface for all CLI output, including colored output,
//! progress tracking, and formatted tables.

use crate::cleaner::{CleanStats, FilterChain};
use crate::filter::{Filter, FilterKind};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

/// Manages all CLI output with consistent styling and formatting.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use logtidy::output::OutputFormatter;
    /// OutputFormatter::success("Log cleaned!");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    pub fn plain(message: &str) {
        println!("{}", message);
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Creates a spinner for a cleaning pass.
    ///
    /// The total line count is unknown up front, so this is a spinner with a
    /// running count rather than a bar.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use logtidy::output::OutputFormatter;
    /// let pb = OutputFormatter::create_progress_spinner();
    /// pb.set_message("1000 lines, 12 filtered");
    /// pb.finish_and_clear();
    /// ```
    pub fn create_progress_spinner() -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} Processing... {msg} [{elapsed_precise}]")
                .expect("Invalid progress spinner template"),
        );
        pb
    }

    /// Formats a progress message for the spinner.
    pub fn progress_message(lines_processed: u64, filtered_lines: u64) -> String {
        format!("{} lines, {} filtered", lines_processed, filtered_lines)
    }

    /// Prints the statistics of a completed pass.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use logtidy::cleaner::CleanStats;
    /// use logtidy::output::OutputFormatter;
    /// use std::path::Path;
    ///
    /// let stats = CleanStats { total_lines: 4, filtered_lines: 2, bytes_read: 31 };
    /// OutputFormatter::summary_table(&stats, Path::new("app.log.cleaned"));
    /// ```
    pub fn summary_table(stats: &CleanStats, output_path: &Path) {
        Self::header("STATISTICS");

        let rows = [
            ("Total Lines", stats.total_lines.to_string()),
            ("Filtered Lines", stats.filtered_lines.to_string()),
            ("Remaining Lines", stats.kept_lines().to_string()),
            ("Bytes Processed", Self::format_megabytes(stats.bytes_read)),
        ];
        let width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0);

        println!("{}", "-".repeat(width + 16));
        for (label, value) in &rows {
            println!("{:<width$} | {}", label, value.green(), width = width);
        }
        println!("{}", "-".repeat(width + 16));
        println!(
            "{:<width$} | {}",
            "Output".bold(),
            output_path.display(),
            width = width
        );
    }

    /// Formats a byte count as megabytes with two decimals.
    pub fn format_megabytes(bytes: u64) -> String {
        format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
    }

    /// Prints the filter chain in evaluation order.
    pub fn filter_table(filters: &[Filter]) {
        if filters.is_empty() {
            Self::plain("No filters configured. Every line will be kept.");
            return;
        }

        Self::header("FILTERS (evaluated top to bottom)");
        let name_width = filters
            .iter()
            .map(|f| f.name().len())
            .max()
            .unwrap_or(0)
            .max(4);

        for (index, filter) in filters.iter().enumerate() {
            println!(
                "{:>3}. {:<width$}  {}  {}",
                index + 1,
                filter.name(),
                Self::kind_label(filter.kind()),
                filter.pattern(),
                width = name_width
            );
        }
    }

    /// Prints how each filter treats `line` and the final decision.
    pub fn verdict_table(chain: &FilterChain, line: &str) {
        let veto = chain.first_veto(line);

        Self::header("VERDICT");
        for filter in chain.filters() {
            let status = if filter.admits(line) {
                "pass".green()
            } else {
                "veto".red()
            };
            println!(
                "  {} {} {}",
                Self::kind_label(filter.kind()),
                filter.name(),
                status
            );
        }

        match veto {
            Some(filter) => Self::warning(&format!("Line dropped by '{}'", filter.name())),
            None => Self::success("Line kept"),
        }
    }

    fn kind_label(kind: FilterKind) -> ColoredString {
        match kind {
            FilterKind::Remove => "remove".red(),
            FilterKind::Keep => "keep  ".green(),
        }
    }
}
