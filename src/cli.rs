//! Command-line interface module for logtidy.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing
//! - Running a cleaning pass with a progress spinner
//! - Managing the saved filter chain

use crate::cleaner::{CleanFailure, FilterChain};
use crate::config::Settings;
use crate::filter::{Filter, FilterKind};
use crate::output::OutputFormatter;
use crate::storage::FilterStore;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Stream log files through an ordered chain of keep/remove regex filters.
#[derive(Debug, Parser)]
#[command(name = "logtidy", version, about)]
pub struct Cli {
    /// Settings file (defaults to ./.logtidyrc.toml, then ~/.config/logtidy/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Filter list file (defaults to ~/.config/logtidy/filters.json)
    #[arg(long, global = true, value_name = "PATH")]
    pub filters_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Filter a log file into a new file
    Clean {
        /// Log file to read
        input: PathBuf,

        /// Where to write kept lines (defaults to INPUT plus the output suffix)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Extra filter appended after the saved ones, e.g. `noise:remove:^DEBUG`
        #[arg(long = "filter", value_name = "NAME:TYPE:PATTERN")]
        filters: Vec<String>,

        /// Ignore the saved filters and use only --filter entries
        #[arg(long)]
        no_saved: bool,

        /// Do not show the progress spinner
        #[arg(short, long)]
        quiet: bool,
    },

    /// Manage the saved filter chain
    #[command(subcommand)]
    Filters(FiltersCommand),
}

#[derive(Debug, Subcommand)]
pub enum FiltersCommand {
    /// Show the saved filters in evaluation order
    List,

    /// Append a filter to the saved chain
    Add {
        name: String,
        pattern: String,

        /// Keep only matching lines instead of removing them
        #[arg(long)]
        keep: bool,
    },

    /// Delete every saved filter with this name
    Remove { name: String },

    /// Show how the saved chain treats a single line
    Test { line: String },
}

/// Runs the CLI, loading settings from `cli.config` or the default locations.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use logtidy::cli::{Cli, run_cli};
///
/// let cli = Cli::parse_from(["logtidy", "clean", "/var/log/app.log"]);
/// if let Err(e) = run_cli(&cli) {
///     eprintln!("Error: {}", e);
/// }
/// ```
pub fn run_cli(cli: &Cli) -> Result<(), String> {
    let settings = Settings::load(cli.config.as_deref())
        .map_err(|e| format!("Error loading configuration: {}", e))?;
    run_cli_with_settings(cli, &settings)
}

/// Runs the CLI with already-loaded settings.
pub fn run_cli_with_settings(cli: &Cli, settings: &Settings) -> Result<(), String> {
    let store = resolve_store(cli, settings)?;
    debug!(store = %store.path().display(), "using filter store");

    match &cli.command {
        Command::Clean {
            input,
            output,
            filters,
            no_saved,
            quiet,
        } => {
            let output = output
                .clone()
                .unwrap_or_else(|| settings.output_path_for(input));
            let chain = build_chain(&store, filters, *no_saved)?
                .with_max_line_bytes(settings.cleaner.max_line_bytes);
            clean_file(&chain, input, &output, *quiet)
        }
        Command::Filters(command) => run_filters_command(&store, command),
    }
}

fn resolve_store(cli: &Cli, settings: &Settings) -> Result<FilterStore, String> {
    if let Some(path) = cli
        .filters_file
        .as_ref()
        .or(settings.storage.filters_file.as_ref())
    {
        return Ok(FilterStore::at(path));
    }
    FilterStore::open_default().map_err(|e| format!("Error locating filter file: {}", e))
}

/// Builds the chain: saved filters first (unless `no_saved`), then ad-hoc ones.
fn build_chain(
    store: &FilterStore,
    extra: &[String],
    no_saved: bool,
) -> Result<FilterChain, String> {
    let mut filters = if no_saved {
        Vec::new()
    } else {
        store
            .load()
            .map_err(|e| format!("Error loading filters: {}", e))?
    };

    for spec in extra {
        filters.push(parse_filter_spec(spec)?);
    }

    Ok(FilterChain::new(filters))
}

/// Parses `NAME:TYPE:PATTERN`. The pattern may itself contain colons.
///
/// # Examples
///
/// ```
/// use logtidy::cli::parse_filter_spec;
/// use logtidy::filter::FilterKind;
///
/// let filter = parse_filter_spec("ts:remove:^\\d{2}:\\d{2}").unwrap();
/// assert_eq!(filter.kind(), FilterKind::Remove);
/// assert_eq!(filter.pattern(), "^\\d{2}:\\d{2}");
/// ```
pub fn parse_filter_spec(spec: &str) -> Result<Filter, String> {
    let mut parts = spec.splitn(3, ':');
    let (Some(name), Some(kind), Some(pattern)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(format!(
            "Invalid filter '{}': expected NAME:TYPE:PATTERN",
            spec
        ));
    };

    Filter::parse(name, pattern, kind).map_err(|e| format!("Invalid filter '{}': {}", spec, e))
}

/// Runs one cleaning pass and prints the summary.
///
/// Refuses to run when the output would overwrite the input.
pub fn clean_file(
    chain: &FilterChain,
    input: &Path,
    output: &Path,
    quiet: bool,
) -> Result<(), String> {
    if is_same_file(input, output) {
        return Err(format!(
            "Output path {} is the input file; choose a different output",
            output.display()
        ));
    }

    OutputFormatter::info(&format!(
        "Cleaning {} with {} filter(s)",
        input.display(),
        chain.filters().len()
    ));

    let result = if quiet {
        chain.clean(input, output, None)
    } else {
        let pb = OutputFormatter::create_progress_spinner();
        pb.enable_steady_tick(Duration::from_millis(100));
        let mut on_progress = |lines: u64, filtered: u64| {
            pb.set_message(OutputFormatter::progress_message(lines, filtered));
        };
        let result = chain.clean(input, output, Some(&mut on_progress));
        pb.finish_and_clear();
        result
    };

    match result {
        Ok(stats) => {
            OutputFormatter::success("Complete");
            OutputFormatter::summary_table(&stats, output);
            Ok(())
        }
        Err(CleanFailure { stats, error }) => {
            if let Some(stats) = stats {
                OutputFormatter::warning(&format!(
                    "Stopped after {} lines; {} contains the lines kept so far",
                    stats.total_lines,
                    output.display()
                ));
                OutputFormatter::summary_table(&stats, output);
            }
            Err(format!("Error: {}", error))
        }
    }
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn run_filters_command(store: &FilterStore, command: &FiltersCommand) -> Result<(), String> {
    match command {
        FiltersCommand::List => {
            let filters = store
                .load()
                .map_err(|e| format!("Error loading filters: {}", e))?;
            OutputFormatter::filter_table(&filters);
            Ok(())
        }
        FiltersCommand::Add {
            name,
            pattern,
            keep,
        } => {
            let kind = if *keep {
                FilterKind::Keep
            } else {
                FilterKind::Remove
            };
            let filter = Filter::new(name.as_str(), pattern.as_str(), kind)
                .map_err(|e| format!("Invalid filter: {}", e))?;
            let filters = store
                .add(filter)
                .map_err(|e| format!("Error saving filters: {}", e))?;
            OutputFormatter::success(&format!(
                "Added '{}' ({} filter(s) saved)",
                name,
                filters.len()
            ));
            Ok(())
        }
        FiltersCommand::Remove { name } => {
            let removed = store
                .remove(name)
                .map_err(|e| format!("Error saving filters: {}", e))?;
            if removed == 0 {
                return Err(format!("No filter named '{}'", name));
            }
            OutputFormatter::success(&format!("Removed {} filter(s) named '{}'", removed, name));
            Ok(())
        }
        FiltersCommand::Test { line } => {
            let filters = store
                .load()
                .map_err(|e| format!("Error loading filters: {}", e))?;
            OutputFormatter::verdict_table(&FilterChain::new(filters), line);
            Ok(())
        }
    }
}
