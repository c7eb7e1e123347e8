//! Kyotei-Archive main entry point
//!
//! This is the command-line interface for the boat-race archive ingester.

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use kyotei_archive::config::{load_config_with_hash, Config};
use kyotei_archive::pipeline::{
    print_summary, spawn_ctrl_c_handler, spawn_session_timer, today_in_japan, Shutdown,
};
use kyotei_archive::{KindSelection, Pipeline, RunMode, RunPlan};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Exit code for invalid arguments, dates or configuration
const EXIT_INVALID_INPUT: u8 = 3;

/// Exit code for failures outside any item
const EXIT_CRITICAL: u8 = 2;

/// Kyotei-Archive: boat-race archive ingester
///
/// Downloads the daily race-result and race-program archives, converts them
/// to CSV and stores them under a date-partitioned directory tree.
#[derive(Parser, Debug)]
#[command(name = "kyotei-archive")]
#[command(version)]
#[command(about = "Fetch boat-race archives and convert them to CSV", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// First date to process (YYYY-MM-DD)
    #[arg(long, value_name = "YYYY-MM-DD")]
    start_date: Option<String>,

    /// Last date to process (YYYY-MM-DD)
    #[arg(long, value_name = "YYYY-MM-DD")]
    end_date: Option<String>,

    /// Execution mode
    #[arg(long, value_enum, default_value_t = ModeArg::Daily)]
    mode: ModeArg,

    /// Which archives to process
    #[arg(long, value_enum, default_value_t = KindArg::All)]
    kind: KindArg,

    /// Overwrite CSV files that already exist
    #[arg(long)]
    force: bool,

    /// Fetch and convert without writing files or publishing
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Log line format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Daily,
    Backfill,
}

impl From<ModeArg> for RunMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Daily => RunMode::Daily,
            ModeArg::Backfill => RunMode::Backfill,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    Results,
    Programs,
    All,
}

impl From<KindArg> for KindSelection {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Results => KindSelection::Results,
            KindArg::Programs => KindSelection::Programs,
            KindArg::All => KindSelection::All,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet, cli.log_format);

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!(event = "unexpected_error", error = %format!("{:#}", e), "Run failed");
            eprintln!("Error: {:#}", e);
            ExitCode::from(EXIT_CRITICAL)
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// `RUST_LOG` takes precedence over the flags when set.
fn setup_logging(verbose: u8, quiet: bool, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if quiet {
            // Only show errors
            EnvFilter::new("error")
        } else {
            match verbose {
                0 => EnvFilter::new("kyotei_archive=info,warn"),
                1 => EnvFilter::new("kyotei_archive=debug,info"),
                2 => EnvFilter::new("kyotei_archive=trace,debug"),
                _ => EnvFilter::new("trace"),
            }
        }
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().flatten_event(true).init(),
    }
}

fn parse_date_arg(flag: &str, value: Option<&str>) -> Result<Option<NaiveDate>, String> {
    value
        .map(|text| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .map_err(|e| format!("invalid {} '{}': {}", flag, text, e))
        })
        .transpose()
}

fn invalid_input(message: &str) -> u8 {
    tracing::error!(event = "invalid_input", error = %message, "Invalid input");
    eprintln!("Error: {}", message);
    EXIT_INVALID_INPUT
}

/// Loads configuration, builds the plan and runs one session
async fn run(cli: Cli) -> anyhow::Result<u8> {
    // Load and validate configuration
    let (config, config_hash) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            match load_config_with_hash(path) {
                Ok((config, hash)) => {
                    tracing::info!("Configuration loaded successfully (hash: {})", hash);
                    (config, hash)
                }
                Err(e) => return Ok(invalid_input(&format!("failed to load configuration: {}", e))),
            }
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            (Config::default(), "default".to_string())
        }
    };

    let start = match parse_date_arg("--start-date", cli.start_date.as_deref()) {
        Ok(date) => date,
        Err(message) => return Ok(invalid_input(&message)),
    };
    let end = match parse_date_arg("--end-date", cli.end_date.as_deref()) {
        Ok(date) => date,
        Err(message) => return Ok(invalid_input(&message)),
    };

    let today = today_in_japan();
    let plan = match RunPlan::resolve(cli.mode.into(), start, end, cli.kind.into(), today) {
        Ok(plan) => plan,
        Err(e) => return Ok(invalid_input(&e.to_string())),
    };

    tracing::info!(
        event = "processing_range",
        mode = %plan.mode(),
        range = %plan.range_label(),
        items = plan.len(),
        dry_run = cli.dry_run,
        force = cli.force,
        "Processing range"
    );

    let shutdown = Shutdown::shared();
    let ctrl_c = spawn_ctrl_c_handler(shutdown.clone());
    let timer = config
        .session
        .timeout()
        .map(|limit| spawn_session_timer(shutdown.clone(), limit));

    let mut pipeline = Pipeline::from_config(&config, shutdown.clone())
        .context("failed to build pipeline")?
        .with_dry_run(cli.dry_run)
        .with_force(cli.force)
        .with_config_hash(config_hash);

    let session = pipeline.run(&plan).await;

    ctrl_c.abort();
    if let Some(timer) = timer {
        timer.abort();
    }

    if !cli.quiet {
        print_summary(&session, config.session.max_reported_errors);
    }

    let code = u8::try_from(session.exit_code()).unwrap_or(EXIT_CRITICAL);
    Ok(code)
}
