//! `From` implementations bridging `helmcoil_config` types to `helmcoil_core` types.

use crate::config::{FieldCfg, FineCfg, FineStrategy, OutputCfg, RampCfg, SensorCfg, SweepCfg};
use crate::plan::SweepPlan;

// ── RampCfg ──────────────────────────────────────────────────────────────────

impl From<&helmcoil_config::RampCfg> for RampCfg {
    fn from(c: &helmcoil_config::RampCfg) -> Self {
        Self {
            default_step_ma: c.default_step_ma,
            max_step_ma: c.max_step_ma,
            dwell_ms: c.dwell_ms,
            tolerance_ma: c.tolerance_ma,
        }
    }
}

// ── OutputCfg ────────────────────────────────────────────────────────────────

impl From<&helmcoil_config::OutputCfg> for OutputCfg {
    fn from(c: &helmcoil_config::OutputCfg) -> Self {
        Self {
            settle_ms: c.settle_ms,
        }
    }
}

// ── FineCfg ──────────────────────────────────────────────────────────────────

impl From<helmcoil_config::FineStrategy> for FineStrategy {
    fn from(s: helmcoil_config::FineStrategy) -> Self {
        match s {
            helmcoil_config::FineStrategy::Auto => FineStrategy::Auto,
            helmcoil_config::FineStrategy::Binary => FineStrategy::Binary,
            helmcoil_config::FineStrategy::Incremental => FineStrategy::Incremental,
        }
    }
}

impl From<&helmcoil_config::FineCfg> for FineCfg {
    fn from(c: &helmcoil_config::FineCfg) -> Self {
        Self {
            strategy: c.strategy.into(),
            binary_budget: c.binary_budget,
            probe_settle_ms: c.probe_settle_ms,
            step_settle_ms: c.step_settle_ms,
            reset_settle_ms: c.reset_settle_ms,
            history_window: c.history_window,
            min_history: c.min_history,
            incremental_base: c.incremental_base,
            incremental_max_probes: c.incremental_max_probes,
        }
    }
}

// ── SweepCfg / FieldCfg / SensorCfg ──────────────────────────────────────────

impl From<&helmcoil_config::SweepCfg> for SweepCfg {
    fn from(c: &helmcoil_config::SweepCfg) -> Self {
        Self {
            settle_ms: c.settle_ms,
            sample_first_checkpoint: c.sample_first_checkpoint,
        }
    }
}

impl From<&helmcoil_config::FieldCfg> for FieldCfg {
    fn from(c: &helmcoil_config::FieldCfg) -> Self {
        Self {
            oe_per_amp: c.oe_per_amp,
            max_oe: c.max_oe,
            coarse_step_ma: c.coarse_step_ma,
            settle_ms: c.settle_ms,
        }
    }
}

impl From<&helmcoil_config::SensorCfg> for SensorCfg {
    fn from(c: &helmcoil_config::SensorCfg) -> Self {
        Self {
            measure_range: c.measure_range,
            settle_ms: c.settle_ms,
        }
    }
}

// ── SweepPlan ────────────────────────────────────────────────────────────────

impl From<&helmcoil_config::SweepCfg> for SweepPlan {
    fn from(c: &helmcoil_config::SweepCfg) -> Self {
        SweepPlan::current(c.checkpoints.clone(), c.mesh_ma, c.step_ma)
    }
}

impl From<&helmcoil_config::FieldCfg> for SweepPlan {
    fn from(c: &helmcoil_config::FieldCfg) -> Self {
        SweepPlan::field(c.checkpoints.clone(), c.mesh_oe, c.coarse_step_ma)
    }
}
