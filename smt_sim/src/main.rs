//! # SMT Bench
//!
//! Runs the motion scenarios against a simulated axis and prints a report.
//!
//! # Usage
//!
//! ```bash
//! # Full suite on the virtual clock
//! smt_bench --config config/bench.toml
//!
//! # Selected scenarios, JSON report
//! smt_bench -c config/bench.toml -s move -s tweak --format json
//!
//! # Real-time pacing, verbose JSON logs
//! smt_bench -c config/bench.toml --wall-clock -v --json
//! ```

#![deny(warnings)]

use clap::{Parser, ValueEnum};
use smt_common::config::{ConfigLoader, LogLevel};
use smt_common::consts::DEFAULT_CONFIG_PATH;
use smt_sim::clock::ClockMode;
use smt_sim::config::BenchConfig;
use smt_sim::scenario::Scenario;
use smt_sim::{BenchError, run_bench};
use std::path::PathBuf;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

/// SMT Bench - motion scenarios against a simulated axis
#[derive(Parser, Debug)]
#[command(name = "smt_bench")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Motion test scenarios against a simulated axis")]
#[command(long_about = None)]
struct Args {
    /// Path to bench configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Scenario to run (can be specified multiple times, default: all)
    #[arg(short, long = "scenario", value_enum, action = clap::ArgAction::Append)]
    scenarios: Vec<Scenario>,

    /// Pace waits with wall time instead of the virtual clock
    #[arg(long)]
    wall_clock: bool,

    /// Report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    format: ReportFormat,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

fn main() {
    match run() {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(e) => {
            error!("Bench failed: {}", e);
            std::process::exit(1);
        }
    }
}

/// Returns whether every scenario passed.
fn run() -> Result<bool, BenchError> {
    let args = Args::parse();
    let loaded = BenchConfig::load(&args.config);

    setup_tracing(&args, loaded.as_ref().ok().map(|c| c.shared.log_level));

    let mut config = loaded?;
    info!(
        "SMT Bench v{} starting ({})",
        env!("CARGO_PKG_VERSION"),
        config.shared.service_name
    );
    if args.wall_clock {
        config.sim.clock = ClockMode::Wall;
    }

    let report = run_bench(&config, &args.scenarios)?;
    match args.format {
        ReportFormat::Text => println!("{report}"),
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(report.passed())
}

/// Setup tracing subscriber from CLI arguments and the configured level.
fn setup_tracing(args: &Args, configured: Option<LogLevel>) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        match configured.unwrap_or_default() {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
