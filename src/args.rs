//! Commandline argument parser using clap for PanoGuide

use crate::config::{ConfigError, GuideConfig};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command line of the headless runner.
#[derive(Debug, Parser, Clone)]
#[clap(version, about)]
pub struct GuideArgs {
    #[command(subcommand, long_about)]
    /// Where orientation samples come from
    pub command: CommandTask,

    /// RON file overriding the default tuning. Missing fields keep their defaults
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,
}

impl GuideArgs {
    /// The tuning to run with: the `--config` file if given, else defaults.
    pub fn load_config(&self) -> Result<GuideConfig, ConfigError> {
        match &self.config {
            Some(path) => GuideConfig::from_path(path),
            None => Ok(GuideConfig::default()),
        }
    }
}

/// What the runner should do.
#[derive(Debug, Subcommand, Clone)]
pub enum CommandTask {
    /// Run a whole session against a simulated phone that aims itself
    #[command(about)]
    Simulate(SimulateCommand),

    /// Run a session from a recorded orientation trace
    #[command(about)]
    Replay(ReplayCommand),

    /// Record a simulated sweep to a trace file
    #[command(about)]
    Record(RecordCommand),

    /// Run a session from a sensor bridge on a serial port
    #[command(about)]
    Live(LiveCommand),
}

/// Options for `simulate`.
#[derive(Debug, Args, Clone)]
#[command(version, about)]
pub struct SimulateCommand {
    /// Half-width of the heading jitter, in degrees
    #[arg(short = 'n', long = "noise", default_value_t = 0.05)]
    pub noise: f64,

    /// Samples per second produced by the simulated phone
    #[arg(short = 'r', long = "rate", default_value_t = 60.0)]
    pub rate_hz: f64,

    /// Write the sonar to this WAV file
    #[arg(short = 'w', long = "wav")]
    pub wav: Option<String>,

    /// Give up if the tour is not finished after this many seconds
    #[arg(short = 't', long = "timeout", default_value_t = 120.0)]
    pub timeout_s: f64,
}

/// Options for `replay`.
#[derive(Debug, Args, Clone)]
#[command(version, about)]
pub struct ReplayCommand {
    /// Trace file written by `record`
    #[arg(short = 't', long = "trace")]
    pub trace: String,

    /// Write the sonar to this WAV file
    #[arg(short = 'w', long = "wav")]
    pub wav: Option<String>,
}

/// Options for `record`.
#[derive(Debug, Args, Clone)]
#[command(version, about)]
pub struct RecordCommand {
    /// Filename for the trace to be written to
    #[arg(short = 'o', long = "out")]
    pub outfile: String,

    /// Stop after this many seconds instead of waiting for a key press
    #[arg(short = 'd', long = "duration")]
    pub seconds: Option<f64>,

    /// Samples per second
    #[arg(short = 'r', long = "rate", default_value_t = 60.0)]
    pub rate_hz: f64,
}

/// Options for `live`.
#[derive(Debug, Args, Clone)]
#[command(version, about)]
pub struct LiveCommand {
    /// Serial device of the sensor bridge. Prompts with a picker when omitted
    #[arg(short = 'd', long = "device")]
    pub device: Option<String>,

    /// Baud rate of the sensor bridge
    #[arg(short = 'b', long = "baud", default_value_t = 115200)]
    pub baud: u32,

    /// Ignore the compass and use the raw alpha angle as bearing
    #[arg(long = "alpha-only")]
    pub alpha_only: bool,

    /// Give up if the tour is not finished after this many seconds
    #[arg(short = 't', long = "timeout", default_value_t = 300.0)]
    pub timeout_s: f64,
}
