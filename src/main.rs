use clap::Parser;
use logtidy::cli::{Cli, run_cli_with_settings};
use logtidy::config::Settings;
use logtidy::output::OutputFormatter;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match Settings::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            OutputFormatter::error(&format!("Error loading configuration: {}", e));
            return ExitCode::FAILURE;
        }
    };

    init_logging(cli.verbose, settings.logging.level.as_deref());

    match run_cli_with_settings(&cli, &settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            OutputFormatter::error(&e);
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr. Precedence: `RUST_LOG`, then `--verbose`, then the
/// configured level, then `warn`.
fn init_logging(verbose: bool, configured: Option<&str>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("logtidy=debug")
        } else {
            EnvFilter::new(configured.unwrap_or("warn"))
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
