//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use contracts::ActivityKind;
use std::path::PathBuf;

/// Activity Tracker - GPS activity recording from the command line
#[derive(Parser, Debug)]
#[command(
    name = "activity-tracker",
    author,
    version,
    about = "GPS activity tracking engine",
    long_about = "Records a GPS activity from a location source.\n\n\
                  Feeds fixes from a replay file or the built-in simulator into the \n\
                  tracking engine, fans the live path out to the configured map \n\
                  renderers and persists the finished activity summary."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "ACTIVITY_TRACKER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "ACTIVITY_TRACKER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Default filter level; `RUST_LOG` still wins when set
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record one activity from a replay file or the simulator
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "tracker.toml",
        env = "ACTIVITY_TRACKER_CONFIG"
    )]
    pub config: PathBuf,

    /// Replay location events from a JSONL file
    #[arg(long, conflicts_with = "simulate", required_unless_present = "simulate")]
    pub replay: Option<PathBuf>,

    /// Replay speed multiplier (1.0 = original pacing, 0 = as fast as possible)
    #[arg(long, default_value = "1.0", requires = "replay")]
    pub replay_speed: f64,

    /// Use the built-in route simulator as the location source
    #[arg(long)]
    pub simulate: bool,

    /// Number of fixes the simulator produces
    #[arg(long, default_value = "600", requires = "simulate")]
    pub sim_samples: usize,

    /// Simulator pacing relative to real time (0 = as fast as possible)
    #[arg(long, default_value = "20.0", requires = "simulate")]
    pub sim_realtime: f64,

    /// Override the activity kind from configuration
    #[arg(long, value_parser = parse_activity_kind, env = "ACTIVITY_TRACKER_KIND")]
    pub kind: Option<ActivityKind>,

    /// Control script applied on the sample clock, e.g. `pause@30s,resume@45s,stop@90s`
    #[arg(long)]
    pub control: Option<String>,

    /// Pipeline timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "ACTIVITY_TRACKER_TIMEOUT")]
    pub timeout: u64,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "ACTIVITY_TRACKER_METRICS_PORT")]
    pub metrics_port: u16,

    /// Write the activity summary as JSON to this file
    #[arg(long)]
    pub summary_out: Option<PathBuf>,
}

fn parse_activity_kind(s: &str) -> Result<ActivityKind, String> {
    s.parse::<ActivityKind>().map_err(|e| e.to_string())
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "tracker.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "tracker.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}
