//! Bounded-step setpoint ramp.

use std::time::Duration;

use eyre::WrapErr;
use helmcoil_traits::{Clock, Instrument};

use crate::config::FineCfg;
use crate::controller::{Controller, bad_reply};
use crate::error::{ResidualWarning, Result};
use crate::fine::{self, FineOutcome, SearchMode, TrimProbe};
use crate::hw_error::map_hw_error;
use crate::path::transit_points;
use crate::protocol;
use crate::units::amps_to_ma;

/// What a call to [`Controller::ramp_to`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RampOutcome {
    pub target_ma: i32,
    pub origin_ma: i32,
    /// Setpoint writes issued (0 when the setpoint was already in place).
    pub commands: usize,
    /// measured − target after the ramp (and any fine search); `None` with the output off.
    pub residual_ma: Option<i32>,
    pub fine: Option<FineOutcome>,
    pub warning: Option<ResidualWarning>,
}

impl RampOutcome {
    pub fn is_noop(&self) -> bool {
        self.commands == 0
    }
}

/// Trim probe that drives the source's `IFINE` and reads `IOUT?`.
pub struct SourceTrim<'a, P> {
    source: &'a mut P,
    clock: &'a dyn Clock,
    cfg: &'a FineCfg,
    settle_ms: u64,
}

impl<'a, P: Instrument> SourceTrim<'a, P> {
    pub fn new(source: &'a mut P, clock: &'a dyn Clock, cfg: &'a FineCfg) -> Self {
        Self {
            source,
            clock,
            cfg,
            settle_ms: cfg.probe_settle_ms,
        }
    }
}

impl<P: Instrument> TrimProbe for SourceTrim<'_, P> {
    fn enter_mode(&mut self, mode: SearchMode) {
        self.settle_ms = match mode {
            SearchMode::Binary => self.cfg.probe_settle_ms,
            SearchMode::Incremental => self.cfg.step_settle_ms,
        };
    }

    fn probe(&mut self, fine: i8) -> Result<i32> {
        let cmd = protocol::set_fine(fine);
        self.source
            .write(&cmd)
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err_with(|| format!("source write {cmd}"))?;
        self.clock.sleep(Duration::from_millis(self.settle_ms));
        let reply = self
            .source
            .query(protocol::QUERY_IOUT)
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err("source query IOUT?")?;
        protocol::parse_tagged(&reply, "IOUT", "A")
            .map(amps_to_ma)
            .ok_or_else(|| bad_reply(protocol::QUERY_IOUT, &reply))
    }
}

impl<P: Instrument, G: Instrument> Controller<P, G> {
    /// Move the setpoint to `target_ma` without any single write changing it
    /// by more than the effective step.
    ///
    /// `step_ma` of 0 selects the configured default; it is always capped at
    /// `max_step_ma`. With `fine` the trim is reset before the ramp and a trim
    /// search runs when the landed current is outside tolerance.
    ///
    /// A target that is already the commanded setpoint is never ramped again:
    /// the residual is re-read and reported, and only with `fine` is the trim
    /// searched again.
    pub fn ramp_to(&mut self, target_ma: i32, step_ma: i32, fine: bool) -> Result<RampOutcome> {
        let step = self.ramp.effective_step(step_ma);
        let live = self.read_output()?.is_enabled();

        if self.session.setpoint_ma == Some(target_ma) {
            return self.hold_setpoint(target_ma, live, fine);
        }

        let (origin, measured) = if live {
            let m = self.read_measured_ma()?;
            (m, Some(m))
        } else {
            let sp = match self.session.setpoint_ma {
                Some(sp) => sp,
                None => self.read_setpoint_ma()?,
            };
            (sp, None)
        };
        if origin == target_ma {
            tracing::debug!(target_ma, origin_ma = origin, "ramp: already at target");
            return Ok(RampOutcome {
                target_ma,
                origin_ma: origin,
                commands: 0,
                residual_ma: measured.map(|m| m - target_ma),
                fine: None,
                warning: None,
            });
        }

        if fine {
            self.write_fine(0)?;
            self.sleep_ms(self.fine.reset_settle_ms);
        }

        tracing::info!(target_ma, origin_ma = origin, step_ma = step, live, "ramp");
        let mut commands = 0;
        for point in transit_points(origin, target_ma, step) {
            self.write_setpoint_ma(point)?;
            self.sleep_ms(self.ramp.dwell_ms);
            commands += 1;
        }
        self.write_setpoint_ma(target_ma)?;
        self.sleep_ms(self.ramp.dwell_ms);
        commands += 1;

        let mut outcome = RampOutcome {
            target_ma,
            origin_ma: origin,
            commands,
            residual_ma: None,
            fine: None,
            warning: None,
        };
        if !live {
            return Ok(outcome);
        }
        let residual = self.read_measured_ma()? - target_ma;
        self.correct_residual(&mut outcome, residual, fine)?;
        Ok(outcome)
    }

    // Setpoint already commanded: no setpoint writes, at most a fresh trim search.
    fn hold_setpoint(&mut self, target_ma: i32, live: bool, fine: bool) -> Result<RampOutcome> {
        let mut outcome = RampOutcome {
            target_ma,
            origin_ma: target_ma,
            commands: 0,
            residual_ma: None,
            fine: None,
            warning: None,
        };
        if !live {
            tracing::debug!(target_ma, "ramp: setpoint already commanded");
            return Ok(outcome);
        }
        let mut residual = self.read_measured_ma()? - target_ma;
        if fine && residual.abs() > self.ramp.tolerance_ma {
            // The search expects the residual observed at fine 0
            self.write_fine(0)?;
            self.sleep_ms(self.fine.reset_settle_ms);
            residual = self.read_measured_ma()? - target_ma;
        }
        tracing::debug!(target_ma, residual_ma = residual, "ramp: setpoint already commanded");
        self.correct_residual(&mut outcome, residual, fine)?;
        Ok(outcome)
    }

    fn correct_residual(&mut self, outcome: &mut RampOutcome, residual: i32, fine: bool) -> Result<()> {
        let target_ma = outcome.target_ma;
        outcome.residual_ma = Some(residual);
        let tol = self.ramp.tolerance_ma;
        if residual.abs() <= tol {
            return Ok(());
        }

        if fine {
            let mut trim = SourceTrim::new(&mut self.source, &*self.clock, &self.fine);
            let found = fine::calibrate(
                &mut trim,
                &self.fine,
                &mut self.session.history,
                target_ma,
                residual,
                tol,
            )?;
            outcome.residual_ma = Some(found.residual_ma);
            if !found.converged {
                outcome.warning = Some(ResidualWarning {
                    target_ma,
                    residual_ma: found.residual_ma,
                    fine: Some(found.fine),
                    saturated: found.saturated,
                });
            }
            outcome.fine = Some(found);
        } else {
            outcome.warning = Some(ResidualWarning {
                target_ma,
                residual_ma: residual,
                fine: None,
                saturated: false,
            });
        }
        if let Some(w) = &outcome.warning {
            tracing::warn!(warning = %w, "residual outside tolerance");
        }
        Ok(())
    }
}
