//! tally - test harness CLI
//!
//! Discovers `*_test.tl` modules under a directory, runs every `test_*/0`
//! function in isolation and prints the category record on stdout. The exit
//! status is 0 only when nothing failed or errored.

use anyhow::Result;
use clap::Parser;
use colored::*;
use std::io::{self, Write};
use std::path::PathBuf;
use tally_script::ScriptToolchain;
use tally_testing::{JsonReporter, RecordReporter, TestReporter, TestRunner, WORKER_THREAD_PREFIX};
use tracing::{debug, error, info};

mod config;

use config::{CliConfig, OutputFormat};

/// tally - run categorized test suites and report pass/fail/error counts
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Discover, run and report categorized test suites")]
#[command(version)]
pub struct Cli {
    /// Test root directory
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Print per-test detail and prefix the record with `verbose,`
    #[arg(short, long)]
    verbose: bool,

    /// Report format
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Only run test functions whose name contains this
    #[arg(long)]
    filter: Option<String>,

    /// Per-test time bound in seconds (0 disables it)
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Configuration file path (defaults to <PATH>/tally.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(long)]
    debug: bool,
}

impl Cli {
    /// Flags override whatever the configuration file says
    fn apply(&self, mut config: CliConfig) -> CliConfig {
        config.verbose |= self.verbose;
        if let Some(format) = self.format {
            config.format = format;
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }
        if let Some(filter) = &self.filter {
            config.filter = Some(filter.clone());
        }
        config
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.debug);
    install_panic_hook();

    match run(&cli) {
        Ok(code) => {
            info!("Run finished with exit code {}", code);
            std::process::exit(code);
        }
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn run(cli: &Cli) -> Result<i32> {
    let config = cli.apply(CliConfig::load(cli.config.as_deref(), &cli.path)?);
    debug!("Effective configuration: {:?}", config);

    let runner = TestRunner::new(ScriptToolchain::new(), config.runner_config());
    let report = runner.run_suite(&cli.path)?;

    let output = match config.format {
        OutputFormat::Record => RecordReporter::new().render(&report)?,
        OutputFormat::Json => JsonReporter::new().render(&report)?,
    };

    let mut stdout = io::stdout().lock();
    stdout.write_all(output.as_bytes())?;
    stdout.flush()?;

    Ok(report.exit_code())
}

fn init_logging(debug: bool) {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Panics on harness workers are contained and reported as errors; keep them
/// off stderr. Anything else still goes to the previous hook.
fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        if is_worker_thread(std::thread::current().name()) {
            debug!("Contained panic: {}", info);
        } else {
            previous(info);
        }
    }));
}

fn is_worker_thread(name: Option<&str>) -> bool {
    name.is_some_and(|name| name.starts_with(WORKER_THREAD_PREFIX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from(["tally", "suite", "--verbose", "--format", "json", "--timeout", "0"]);
        let config = cli.apply(CliConfig {
            filter: Some("parse".to_string()),
            ..CliConfig::default()
        });

        assert_eq!(cli.path, PathBuf::from("suite"));
        assert!(config.verbose);
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(config.timeout(), None);
        assert_eq!(config.filter.as_deref(), Some("parse"));
    }

    #[test]
    fn test_only_worker_panics_are_silenced() {
        assert!(is_worker_thread(Some("tally:test_ok")));
        assert!(is_worker_thread(Some("tally:unit/a_test.tl")));
        assert!(!is_worker_thread(Some("main")));
        assert!(!is_worker_thread(None));
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["tally"]);
        let config = cli.apply(CliConfig::default());

        assert_eq!(cli.path, PathBuf::from("."));
        assert!(!config.verbose);
        assert_eq!(config.format, OutputFormat::Record);
        assert_eq!(config.timeout(), Some(tally_testing::DEFAULT_TIMEOUT));
    }
}
