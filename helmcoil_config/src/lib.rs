#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and checkpoint parsing for the coil bench.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Every section is optional; an empty file is a valid simulated-bench config.
//! - Checkpoint CSV loader enforces the header and rejects malformed rows.
use serde::Deserialize;

/// Hard cap on a single setpoint change, whatever the config says (mA).
pub const MAX_STEP_CAP_MA: i32 = 300;

/// Identity string the bipolar source answers to `IDN?`.
pub const DEFAULT_SOURCE_IDN: &str = "IDN PBX 40-10 VER1.13     KIKUSUI    ";
/// Identity string the gaussmeter answers to `*IDN?`.
pub const DEFAULT_SENSOR_IDN: &str = "LSCI,MODEL421,0,010306";

/// Checkpoint CSV schema.
///
/// Expected header:
/// checkpoint
///
/// Example:
/// checkpoint
/// 0
/// 5000
/// 0
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct CheckpointRow {
    pub checkpoint: i32,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// In-process simulated bench.
    #[default]
    Sim,
    /// Line-oriented ASCII over TCP (GPIB/serial LAN bridge).
    Tcp,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LineTerminator {
    #[default]
    Lf,
    Crlf,
}

impl LineTerminator {
    pub fn as_str(self) -> &'static str {
        match self {
            LineTerminator::Lf => "\n",
            LineTerminator::Crlf => "\r\n",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SimCfg {
    /// Source output error at fine 0 (mA)
    pub offset_ma: f64,
    /// Output change per fine unit (mA)
    pub ma_per_fine: f64,
    /// Ignore OUT writes (tripped interlock)
    pub stuck_output: bool,
    /// Sleep for real instead of advancing a simulated clock
    pub realtime: bool,
}

impl Default for SimCfg {
    fn default() -> Self {
        Self {
            offset_ma: 0.0,
            ma_per_fine: 0.1,
            stuck_output: false,
            realtime: false,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Instruments {
    pub backend: Backend,
    /// host:port of the source bridge (tcp backend)
    pub source_addr: Option<String>,
    /// host:port of the gaussmeter bridge (tcp backend)
    pub sensor_addr: Option<String>,
    /// Connect and per-reply timeout (ms)
    pub timeout_ms: u64,
    pub terminator: LineTerminator,
    pub source_idn: String,
    pub sensor_idn: String,
    pub sim: SimCfg,
}

impl Default for Instruments {
    fn default() -> Self {
        Self {
            backend: Backend::Sim,
            source_addr: None,
            sensor_addr: None,
            timeout_ms: 2000,
            terminator: LineTerminator::Lf,
            source_idn: DEFAULT_SOURCE_IDN.to_string(),
            sensor_idn: DEFAULT_SENSOR_IDN.to_string(),
            sim: SimCfg::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RampCfg {
    pub default_step_ma: i32,
    pub max_step_ma: i32,
    pub dwell_ms: u64,
    pub tolerance_ma: i32,
}

impl Default for RampCfg {
    fn default() -> Self {
        Self {
            default_step_ma: 100,
            max_step_ma: MAX_STEP_CAP_MA,
            dwell_ms: 100,
            tolerance_ma: 1,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OutputCfg {
    pub settle_ms: u64,
}

impl Default for OutputCfg {
    fn default() -> Self {
        Self { settle_ms: 100 }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FineStrategy {
    #[default]
    Auto,
    Binary,
    Incremental,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FineCfg {
    /// "auto" | "binary" | "incremental"
    pub strategy: FineStrategy,
    pub binary_budget: u32,
    pub probe_settle_ms: u64,
    pub step_settle_ms: u64,
    pub reset_settle_ms: u64,
    pub history_window: usize,
    pub min_history: usize,
    pub incremental_base: i8,
    pub incremental_max_probes: u32,
}

impl Default for FineCfg {
    fn default() -> Self {
        Self {
            strategy: FineStrategy::Auto,
            binary_budget: 7,
            probe_settle_ms: 400,
            step_settle_ms: 70,
            reset_settle_ms: 200,
            history_window: 10,
            min_history: 10,
            incremental_base: 0,
            incremental_max_probes: 20,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SweepCfg {
    pub checkpoints: Vec<i32>,
    pub mesh_ma: i32,
    pub step_ma: i32,
    pub settle_ms: u64,
    pub sample_first_checkpoint: bool,
    /// Run the fine search at every mesh point
    pub fine: bool,
}

impl Default for SweepCfg {
    fn default() -> Self {
        Self {
            checkpoints: vec![0, 5000, 0, -5000, 0],
            mesh_ma: 500,
            step_ma: 100,
            settle_ms: 300,
            sample_first_checkpoint: false,
            fine: false,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FieldCfg {
    /// Coil constant (Oe per A)
    pub oe_per_amp: f64,
    pub max_oe: f64,
    pub coarse_step_ma: i32,
    pub settle_ms: u64,
    /// Field sweep checkpoints (Oe)
    pub checkpoints: Vec<i32>,
    pub mesh_oe: i32,
}

impl Default for FieldCfg {
    fn default() -> Self {
        Self {
            oe_per_amp: 20.96,
            max_oe: 110.0,
            coarse_step_ma: 200,
            settle_ms: 1000,
            checkpoints: vec![0, 100, -100, 100],
            mesh_oe: 10,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SensorCfg {
    /// Range selected before sweeps; absent leaves the sensor untouched
    pub measure_range: Option<u8>,
    /// Lowest-sensitivity range selected at bring-up
    pub idle_range: u8,
    pub settle_ms: u64,
}

impl Default for SensorCfg {
    fn default() -> Self {
        Self {
            measure_range: Some(2),
            idle_range: 0,
            settle_ms: 100,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StartupCfg {
    /// Compare IDN replies against `[instruments]` identities
    pub verify_identity: bool,
    /// Bring-up fails when |IOUT| at zero setpoint reaches this (mA)
    pub zero_tolerance_ma: i32,
    pub enable_output: bool,
}

impl Default for StartupCfg {
    fn default() -> Self {
        Self {
            verify_identity: true,
            zero_tolerance_ma: 9,
            enable_output: true,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub instruments: Instruments,
    pub ramp: RampCfg,
    pub output: OutputCfg,
    pub fine: FineCfg,
    pub sweep: SweepCfg,
    pub field: FieldCfg,
    pub sensor: SensorCfg,
    pub startup: StartupCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

pub fn load_checkpoints_csv(path: &std::path::Path) -> eyre::Result<Vec<i32>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open checkpoint CSV {:?}: {}", path, e))?;

    // Enforce exact header
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != ["checkpoint"] {
        eyre::bail!(
            "checkpoint CSV must have header 'checkpoint', got: {}",
            actual.join(",")
        );
    }

    let mut out = Vec::new();
    for (idx, rec) in rdr.deserialize::<CheckpointRow>().enumerate() {
        match rec {
            Ok(row) => out.push(row.checkpoint),
            Err(e) => eyre::bail!("invalid CSV row {}: {}", idx + 2, e),
        }
    }
    if out.is_empty() {
        eyre::bail!("checkpoint CSV {:?} has no rows", path);
    }
    Ok(out)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Instruments
        if self.instruments.timeout_ms == 0 {
            eyre::bail!("instruments.timeout_ms must be >= 1");
        }
        if self.instruments.backend == Backend::Tcp {
            if self.instruments.source_addr.as_deref().is_none_or(str::is_empty) {
                eyre::bail!("instruments.source_addr is required for the tcp backend");
            }
            if self.instruments.sensor_addr.as_deref().is_none_or(str::is_empty) {
                eyre::bail!("instruments.sensor_addr is required for the tcp backend");
            }
        }
        if !self.instruments.sim.offset_ma.is_finite() {
            eyre::bail!("instruments.sim.offset_ma must be finite");
        }
        if !self.instruments.sim.ma_per_fine.is_finite() || self.instruments.sim.ma_per_fine == 0.0 {
            eyre::bail!("instruments.sim.ma_per_fine must be finite and non-zero");
        }

        // Ramp
        if self.ramp.max_step_ma <= 0 || self.ramp.max_step_ma > MAX_STEP_CAP_MA {
            eyre::bail!("ramp.max_step_ma must be in 1..={MAX_STEP_CAP_MA}");
        }
        if self.ramp.default_step_ma <= 0 || self.ramp.default_step_ma > self.ramp.max_step_ma {
            eyre::bail!("ramp.default_step_ma must be in 1..=ramp.max_step_ma");
        }
        if self.ramp.tolerance_ma < 0 {
            eyre::bail!("ramp.tolerance_ma must be >= 0");
        }
        if self.ramp.dwell_ms > 60 * 1000 {
            eyre::bail!("ramp.dwell_ms is unreasonably large (>1min)");
        }

        // Fine
        if !(1..=7).contains(&self.fine.binary_budget) {
            eyre::bail!("fine.binary_budget must be in 1..=7");
        }
        if self.fine.history_window == 0 {
            eyre::bail!("fine.history_window must be >= 1");
        }
        if self.fine.min_history == 0 || self.fine.min_history > self.fine.history_window {
            eyre::bail!("fine.min_history must be in 1..=fine.history_window");
        }
        if self.fine.incremental_max_probes == 0 {
            eyre::bail!("fine.incremental_max_probes must be >= 1");
        }

        // Sweep
        if self.sweep.checkpoints.is_empty() {
            eyre::bail!("sweep.checkpoints must not be empty");
        }
        if self.sweep.mesh_ma <= 0 {
            eyre::bail!("sweep.mesh_ma must be > 0");
        }
        if self.sweep.step_ma <= 0 {
            eyre::bail!("sweep.step_ma must be > 0");
        }

        // Field
        if !self.field.oe_per_amp.is_finite() || self.field.oe_per_amp <= 0.0 {
            eyre::bail!("field.oe_per_amp must be > 0");
        }
        if !self.field.max_oe.is_finite() || self.field.max_oe < 0.0 {
            eyre::bail!("field.max_oe must be >= 0");
        }
        if self.field.coarse_step_ma <= 0 || self.field.coarse_step_ma > MAX_STEP_CAP_MA {
            eyre::bail!("field.coarse_step_ma must be in 1..={MAX_STEP_CAP_MA}");
        }
        if self.field.checkpoints.is_empty() {
            eyre::bail!("field.checkpoints must not be empty");
        }
        if self.field.mesh_oe <= 0 {
            eyre::bail!("field.mesh_oe must be > 0");
        }

        // Sensor
        if let Some(r) = self.sensor.measure_range
            && r > 3
        {
            eyre::bail!("sensor.measure_range must be in 0..=3");
        }
        if self.sensor.idle_range > 3 {
            eyre::bail!("sensor.idle_range must be in 0..=3");
        }

        // Startup
        if self.startup.zero_tolerance_ma <= 0 {
            eyre::bail!("startup.zero_tolerance_ma must be > 0");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of: never, daily, hourly");
        }
        Ok(())
    }
}
