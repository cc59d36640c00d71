//! The controller owns both instruments and the session state.
//!
//! Operations live in their own modules (`output`, `ramp`, `sweep`, `field`,
//! `status`) as `impl` blocks on [`Controller`]; this module holds the
//! construction path and the device I/O helpers they share.

use std::sync::Arc;
use std::time::{Duration, Instant};

use eyre::WrapErr;
use helmcoil_traits::{Clock, Instrument, MonotonicClock};

use crate::config::{FieldCfg, FineCfg, OutputCfg, RampCfg, SensorCfg, SweepCfg};
use crate::error::{BuildError, ControlError, Result};
use crate::hw_error::map_hw_error;
use crate::protocol;
use crate::session::{ControlSession, OutputState};
use crate::units::{amps_to_ma, ma_to_amps};

/// Closed-loop controller for one current source and one field sensor.
pub struct Controller<P, G> {
    pub(crate) source: P,
    pub(crate) sensor: G,
    pub(crate) ramp: RampCfg,
    pub(crate) output_cfg: OutputCfg,
    pub(crate) fine: FineCfg,
    pub(crate) sweep: SweepCfg,
    pub(crate) field: FieldCfg,
    pub(crate) sensor_cfg: SensorCfg,
    pub(crate) session: ControlSession,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) epoch: Instant,
    pub(crate) abort_check: Option<Box<dyn Fn() -> bool>>,
}

impl<P, G> core::fmt::Debug for Controller<P, G> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Controller")
            .field("ramp", &self.ramp)
            .field("fine", &self.fine)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl Controller<Missing, Missing> {
    pub fn builder() -> ControllerBuilder<Missing, Missing> {
        ControllerBuilder::default()
    }
}

impl<P: Instrument, G: Instrument> Controller<P, G> {
    pub fn session(&self) -> &ControlSession {
        &self.session
    }

    pub fn ramp_cfg(&self) -> &RampCfg {
        &self.ramp
    }

    pub fn field_cfg(&self) -> &FieldCfg {
        &self.field
    }

    pub fn source_mut(&mut self) -> &mut P {
        &mut self.source
    }

    pub fn sensor_mut(&mut self) -> &mut G {
        &mut self.sensor
    }

    /// Restart the elapsed-time origin used for sample timestamps.
    pub fn reset_epoch(&mut self) {
        self.epoch = self.clock.now();
    }

    /// Seconds since the run epoch.
    pub fn elapsed_s(&self) -> f64 {
        self.clock.secs_since(self.epoch)
    }

    pub(crate) fn abort_requested(&self) -> bool {
        self.abort_check.as_ref().is_some_and(|f| f())
    }

    pub(crate) fn sleep_ms(&self, ms: u64) {
        self.clock.sleep(Duration::from_millis(ms));
    }

    pub(crate) fn source_query(&mut self, command: &'static str) -> Result<String> {
        self.source
            .query(command)
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err_with(|| format!("source query {command}"))
    }

    pub(crate) fn source_write(&mut self, command: &str) -> Result<()> {
        self.source
            .write(command)
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err_with(|| format!("source write {command}"))
    }

    pub(crate) fn sensor_query(&mut self, command: &'static str) -> Result<String> {
        self.sensor
            .query(command)
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err_with(|| format!("sensor query {command}"))
    }

    pub(crate) fn sensor_write(&mut self, command: &str) -> Result<()> {
        self.sensor
            .write(command)
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err_with(|| format!("sensor write {command}"))
    }

    fn tagged_amps(&mut self, command: &'static str, tag: &str, unit: &str) -> Result<f64> {
        let reply = self.source_query(command)?;
        protocol::parse_tagged(&reply, tag, unit).ok_or_else(|| bad_reply(command, &reply))
    }

    /// Output current (amps).
    pub fn read_measured_a(&mut self) -> Result<f64> {
        self.tagged_amps(protocol::QUERY_IOUT, "IOUT", "A")
    }

    /// Output current, truncated to whole mA.
    pub fn read_measured_ma(&mut self) -> Result<i32> {
        self.read_measured_a().map(amps_to_ma)
    }

    pub fn read_setpoint_a(&mut self) -> Result<f64> {
        self.tagged_amps(protocol::QUERY_ISET, "ISET", "A")
    }

    /// Commanded setpoint read back from the device; refreshes the session.
    pub fn read_setpoint_ma(&mut self) -> Result<i32> {
        let ma = amps_to_ma(self.read_setpoint_a()?);
        self.session.setpoint_ma = Some(ma);
        Ok(ma)
    }

    pub fn read_voltage_v(&mut self) -> Result<f64> {
        self.tagged_amps(protocol::QUERY_VOUT, "VOUT", "V")
    }

    pub fn read_fine(&mut self) -> Result<i8> {
        let reply = self.source_query(protocol::QUERY_IFINE)?;
        protocol::parse_fine(&reply).ok_or_else(|| bad_reply(protocol::QUERY_IFINE, &reply))
    }

    /// Output enable state; refreshes the session.
    pub fn read_output(&mut self) -> Result<OutputState> {
        let reply = self.source_query(protocol::QUERY_OUTPUT)?;
        let state = protocol::parse_output(&reply)
            .map(OutputState::from)
            .ok_or_else(|| bad_reply(protocol::QUERY_OUTPUT, &reply))?;
        self.session.output = Some(state);
        Ok(state)
    }

    pub fn read_field(&mut self) -> Result<f64> {
        let reply = self.sensor_query(protocol::QUERY_FIELD)?;
        protocol::parse_field(&reply).ok_or_else(|| bad_reply(protocol::QUERY_FIELD, &reply))
    }

    pub fn source_identity(&mut self) -> Result<String> {
        self.source_query(protocol::QUERY_SOURCE_IDN)
    }

    pub fn sensor_identity(&mut self) -> Result<String> {
        self.sensor_query(protocol::QUERY_SENSOR_IDN)
    }

    /// Single `ISET` write. Callers are responsible for the step bound.
    pub(crate) fn write_setpoint_ma(&mut self, ma: i32) -> Result<()> {
        self.source_write(&protocol::set_current(ma_to_amps(ma)))?;
        self.session.setpoint_ma = Some(ma);
        Ok(())
    }

    pub(crate) fn write_fine(&mut self, fine: i8) -> Result<()> {
        self.source_write(&protocol::set_fine(fine))
    }
}

pub(crate) fn bad_reply(command: &str, reply: &str) -> eyre::Report {
    eyre::Report::new(ControlError::Reply {
        command: command.to_string(),
        reply: reply.to_string(),
    })
}

// Type-state marker for an instrument not yet supplied to the builder
#[derive(Debug, Default)]
pub struct Missing;

/// Builder for [`Controller`]. `build()` exists only once both instruments are set.
pub struct ControllerBuilder<P = Missing, G = Missing> {
    source: P,
    sensor: G,
    ramp: Option<RampCfg>,
    output: Option<OutputCfg>,
    fine: Option<FineCfg>,
    sweep: Option<SweepCfg>,
    field: Option<FieldCfg>,
    sensor_cfg: Option<SensorCfg>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    abort_check: Option<Box<dyn Fn() -> bool>>,
}

impl Default for ControllerBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            source: Missing,
            sensor: Missing,
            ramp: None,
            output: None,
            fine: None,
            sweep: None,
            field: None,
            sensor_cfg: None,
            clock: None,
            abort_check: None,
        }
    }
}

impl<P, G> ControllerBuilder<P, G> {
    pub fn with_ramp(mut self, ramp: RampCfg) -> Self {
        self.ramp = Some(ramp);
        self
    }

    pub fn with_output(mut self, output: OutputCfg) -> Self {
        self.output = Some(output);
        self
    }

    pub fn with_fine(mut self, fine: FineCfg) -> Self {
        self.fine = Some(fine);
        self
    }

    pub fn with_sweep(mut self, sweep: SweepCfg) -> Self {
        self.sweep = Some(sweep);
        self
    }

    pub fn with_field(mut self, field: FieldCfg) -> Self {
        self.field = Some(field);
        self
    }

    pub fn with_sensor_cfg(mut self, sensor: SensorCfg) -> Self {
        self.sensor_cfg = Some(sensor);
        self
    }

    /// Provide a custom clock; defaults to `MonotonicClock`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Polled between sweep checkpoints; returning true aborts the sweep.
    pub fn with_abort_check<F>(mut self, f: F) -> Self
    where
        F: Fn() -> bool + 'static,
    {
        self.abort_check = Some(Box::new(f));
        self
    }

    fn replace<P2, G2>(
        self,
        f: impl FnOnce(P, G) -> (P2, G2),
    ) -> ControllerBuilder<P2, G2> {
        let ControllerBuilder {
            source,
            sensor,
            ramp,
            output,
            fine,
            sweep,
            field,
            sensor_cfg,
            clock,
            abort_check,
        } = self;
        let (source, sensor) = f(source, sensor);
        ControllerBuilder {
            source,
            sensor,
            ramp,
            output,
            fine,
            sweep,
            field,
            sensor_cfg,
            clock,
            abort_check,
        }
    }
}

// Setters that advance type-state when providing the instruments
impl<G> ControllerBuilder<Missing, G> {
    pub fn with_source<P: Instrument>(self, source: P) -> ControllerBuilder<P, G> {
        self.replace(|_, sensor| (source, sensor))
    }
}

impl<P> ControllerBuilder<P, Missing> {
    pub fn with_sensor<G: Instrument>(self, sensor: G) -> ControllerBuilder<P, G> {
        self.replace(|source, _| (source, sensor))
    }
}

impl<P: Instrument, G: Instrument> ControllerBuilder<P, G> {
    /// Validate configuration and build the controller.
    pub fn build(self) -> Result<Controller<P, G>> {
        let ramp = self.ramp.unwrap_or_default();
        let output_cfg = self.output.unwrap_or_default();
        let fine = self.fine.unwrap_or_default();
        let sweep = self.sweep.unwrap_or_default();
        let field = self.field.unwrap_or_default();
        let sensor_cfg = self.sensor_cfg.unwrap_or_default();

        if ramp.max_step_ma <= 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "ramp.max_step_ma must be > 0",
            )));
        }
        if ramp.default_step_ma <= 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "ramp.default_step_ma must be > 0",
            )));
        }
        if ramp.tolerance_ma < 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "ramp.tolerance_ma must be >= 0",
            )));
        }
        if fine.binary_budget == 0 || fine.binary_budget > crate::fine::MAX_BINARY_BUDGET {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "fine.binary_budget must be in 1..=7",
            )));
        }
        if fine.history_window == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "fine.history_window must be > 0",
            )));
        }
        if fine.min_history > fine.history_window {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "fine.min_history must not exceed fine.history_window",
            )));
        }
        if fine.incremental_max_probes == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "fine.incremental_max_probes must be > 0",
            )));
        }
        if !(field.oe_per_amp.is_finite() && field.oe_per_amp > 0.0) {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "field.oe_per_amp must be > 0",
            )));
        }
        if !(field.max_oe.is_finite() && field.max_oe >= 0.0) {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "field.max_oe must be >= 0",
            )));
        }
        if field.coarse_step_ma <= 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "field.coarse_step_ma must be > 0",
            )));
        }

        let clock: Arc<dyn Clock + Send + Sync> = match self.clock {
            Some(c) => c,
            None => Arc::new(MonotonicClock::new()),
        };
        let epoch = clock.now();
        Ok(Controller {
            source: self.source,
            sensor: self.sensor,
            session: ControlSession::new(fine.history_window),
            ramp,
            output_cfg,
            fine,
            sweep,
            field,
            sensor_cfg,
            clock,
            epoch,
            abort_check: self.abort_check,
        })
    }
}
