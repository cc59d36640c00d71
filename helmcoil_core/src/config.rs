//! Runtime configuration for the controller.
//!
//! These are the structs the controller reads at run time. They are separate
//! from the TOML-deserialized schema in `helmcoil_config`; see `conversions`.

/// Ramp controller configuration.
#[derive(Debug, Clone)]
pub struct RampCfg {
    /// Step used when a caller passes 0 (mA).
    pub default_step_ma: i32,
    /// Hard cap on a single setpoint change regardless of caller step (mA).
    pub max_step_ma: i32,
    /// Dwell after every setpoint write (ms).
    pub dwell_ms: u64,
    /// |measured − target| at or below this counts as on target (mA).
    pub tolerance_ma: i32,
}

impl Default for RampCfg {
    fn default() -> Self {
        Self {
            default_step_ma: 100,
            max_step_ma: 300,
            dwell_ms: 100,
            tolerance_ma: 1,
        }
    }
}

impl RampCfg {
    /// Effective per-command step: 0 falls back to the default, sign is
    /// ignored and the result never exceeds `max_step_ma`.
    pub fn effective_step(&self, step_ma: i32) -> i32 {
        let step = if step_ma == 0 {
            self.default_step_ma
        } else {
            step_ma.saturating_abs()
        };
        step.clamp(1, self.max_step_ma.max(1))
    }
}

/// Output enable state machine configuration.
#[derive(Debug, Clone)]
pub struct OutputCfg {
    /// Wait after zeroing the setpoint and after each `OUT` write (ms).
    pub settle_ms: u64,
}

impl Default for OutputCfg {
    fn default() -> Self {
        Self { settle_ms: 100 }
    }
}

/// How the fine calibration engine picks its search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FineStrategy {
    /// Binary search until the history is trained, then incremental from the learned guess.
    #[default]
    Auto,
    /// Always binary search from 0.
    Binary,
    /// Always incremental, from the learned guess when trained else from `incremental_base`.
    Incremental,
}

/// Fine calibration configuration.
#[derive(Debug, Clone)]
pub struct FineCfg {
    pub strategy: FineStrategy,
    /// Recursion depth of the binary search; the first correction is ±2^(budget−1).
    pub binary_budget: u32,
    /// Settle per binary-search probe (ms).
    pub probe_settle_ms: u64,
    /// Settle per incremental probe (ms).
    pub step_settle_ms: u64,
    /// Settle after resetting fine to 0 ahead of a ramp (ms).
    pub reset_settle_ms: u64,
    /// Sliding window of recorded residual/fine ratios.
    pub history_window: usize,
    /// Samples required before the learned guess is trusted.
    pub min_history: usize,
    /// Starting fine for incremental search without a learned guess.
    pub incremental_base: i8,
    /// Upper bound on incremental probes.
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

/// Sweep orchestrator configuration.
#[derive(Debug, Clone)]
pub struct SweepCfg {
    /// Dwell between reaching a current mesh point and sampling it (ms).
    pub settle_ms: u64,
    /// Also sample the first checkpoint, which is otherwise only moved to.
    pub sample_first_checkpoint: bool,
}

impl Default for SweepCfg {
    fn default() -> Self {
        Self {
            settle_ms: 300,
            sample_first_checkpoint: false,
        }
    }
}

/// Field controller configuration.
#[derive(Debug, Clone)]
pub struct FieldCfg {
    /// Coil constant: field units (Oe) per amp.
    pub oe_per_amp: f64,
    /// Targets are clamped to ±max_oe.
    pub max_oe: f64,
    /// Ramp step used for field moves (mA).
    pub coarse_step_ma: i32,
    /// Dwell between reaching a field mesh point and sampling it (ms).
    pub settle_ms: u64,
}

impl Default for FieldCfg {
    fn default() -> Self {
        Self {
            oe_per_amp: 20.96,
            max_oe: 110.0,
            coarse_step_ma: 200,
            settle_ms: 1000,
        }
    }
}

/// Field sensor configuration.
#[derive(Debug, Clone)]
pub struct SensorCfg {
    /// Range selected before a sweep; `None` leaves the sensor as is.
    pub measure_range: Option<u8>,
    /// Wait after writing `RANGE n` before reading it back (ms).
    pub settle_ms: u64,
}

impl Default for SensorCfg {
    fn default() -> Self {
        Self {
            measure_range: Some(2),
            settle_ms: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_step_is_bounded() {
        let cfg = RampCfg::default();
        assert_eq!(cfg.effective_step(0), 100);
        assert_eq!(cfg.effective_step(-250), 250);
        assert_eq!(cfg.effective_step(1000), 300);
        assert_eq!(cfg.effective_step(i32::MIN), 300);
    }
}
