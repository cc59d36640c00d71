//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

/// Config path used when `--config` is not given. A missing file here means
/// built-in defaults; any other missing path is an error.
pub const DEFAULT_CONFIG: &str = "etc/helmcoil.toml";

#[derive(Parser, Debug)]
#[command(name = "helmcoil", version, about = "Coil current/field bench controller")]
pub struct Cli {
    /// Path to config TOML (typed); built-in simulated-bench defaults when absent
    #[arg(long, value_name = "FILE", default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,

    /// Log as JSON lines instead of pretty, and print results as JSON
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); defaults to [logging].level, then info
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum Switch {
    On,
    Off,
}

impl Switch {
    pub fn is_on(self) -> bool {
        self == Switch::On
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read both instruments once
    Status {
        /// Append the reading to this CSV log
        #[arg(long, value_name = "FILE")]
        save: Option<PathBuf>,
    },
    /// Ramp the source setpoint to a target current
    Ramp {
        /// Target current in mA
        #[arg(long, allow_hyphen_values = true)]
        ma: i32,
        /// Maximum change per setpoint write in mA (0 = configured default)
        #[arg(long, value_name = "MA", default_value_t = 0, allow_hyphen_values = true)]
        step: i32,
        /// Trim the landed current with the fine adjustment
        #[arg(long, action = ArgAction::SetTrue)]
        fine: bool,
    },
    /// Drive the coil to a target field
    Field {
        /// Target field in oersted (clamped to field.max_oe)
        #[arg(long, allow_hyphen_values = true)]
        oe: f64,
    },
    /// Switch the source output on or off
    Output {
        #[arg(value_enum)]
        state: Switch,
    },
    /// Run a current sweep and log every sample
    Sweep {
        /// Checkpoints CSV (header `checkpoint`); defaults to sweep.checkpoints
        #[arg(long, value_name = "FILE")]
        checkpoints_csv: Option<PathBuf>,
        /// Free-text memo written to the log header
        #[arg(long, default_value = "")]
        memo: String,
        /// Output CSV; defaults to a timestamped file in the working directory
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
        /// Trim every point with the fine adjustment
        #[arg(long, action = ArgAction::SetTrue)]
        fine: bool,
    },
    /// Run the configured field sweep and log every sample
    FieldSweep {
        #[arg(long, default_value = "")]
        memo: String,
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Bring the bench up: identity check, zero check, enable output
    Init,
    /// Bring the bench down: ramp to zero and disable output
    Shutdown,
    /// Quick health check (instruments answer, config valid)
    SelfCheck,
}
