//! Field targets expressed as coil current.

use helmcoil_traits::Instrument;

use crate::config::FieldCfg;
use crate::controller::Controller;
use crate::error::Result;
use crate::ramp::RampOutcome;

/// Clamp a field target to `±max_oe`.
pub fn clamp_field(cfg: &FieldCfg, target_oe: f64) -> f64 {
    if target_oe.is_nan() {
        return 0.0;
    }
    target_oe.clamp(-cfg.max_oe, cfg.max_oe)
}

/// Coil current (mA, truncated toward zero) that produces `target_oe`.
pub fn field_to_ma(cfg: &FieldCfg, target_oe: f64) -> i32 {
    let ma = clamp_field(cfg, target_oe) / (cfg.oe_per_amp / 1000.0);
    ma.trunc().clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32
}

impl<P: Instrument, G: Instrument> Controller<P, G> {
    /// Ramp to the current that produces `target_oe` using the coarse field step.
    pub fn set_field(&mut self, target_oe: f64) -> Result<RampOutcome> {
        self.set_field_with_step(target_oe, self.field.coarse_step_ma)
    }

    /// As [`set_field`](Self::set_field) with an explicit ramp step. Never runs a fine search.
    pub fn set_field_with_step(&mut self, target_oe: f64, step_ma: i32) -> Result<RampOutcome> {
        let clamped = clamp_field(&self.field, target_oe);
        if clamped != target_oe {
            tracing::warn!(requested = target_oe, clamped, "field target clamped");
        }
        let target_ma = field_to_ma(&self.field, clamped);
        tracing::info!(target_oe = clamped, target_ma, "set field");
        self.ramp_to(target_ma, step_ma, false)
    }
}
