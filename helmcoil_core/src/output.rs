//! Output enable state machine.

use helmcoil_traits::Instrument;

use crate::controller::Controller;
use crate::error::{ControlError, Result};
use crate::protocol;
use crate::session::OutputState;

impl<P: Instrument, G: Instrument> Controller<P, G> {
    /// Switch the source output on or off.
    ///
    /// Already in the requested state: nothing is written. Otherwise a
    /// non-zero setpoint is ramped to 0 first, then `OUT n` is written and
    /// confirmed by reading it back. A mismatch is a hard error and is not
    /// retried.
    pub fn set_output(&mut self, enable: bool) -> Result<OutputState> {
        let requested = OutputState::from(enable);
        let current = self.read_output()?;
        if current == requested {
            tracing::debug!(state = %current, "output already in requested state");
            return Ok(current);
        }

        let setpoint = self.read_setpoint_ma()?;
        if setpoint != 0 {
            tracing::info!(setpoint_ma = setpoint, "zeroing setpoint before output change");
            self.ramp_to(0, 0, false)?;
            self.sleep_ms(self.output_cfg.settle_ms);
        }

        self.source_write(&protocol::set_output(enable))?;
        self.sleep_ms(self.output_cfg.settle_ms);

        let reported = self.read_output()?;
        if reported != requested {
            tracing::error!(requested = %requested, reported = %reported, "output enable failed");
            return Err(eyre::Report::new(ControlError::OutputEnable {
                requested: enable,
                reported: reported.is_enabled(),
            }));
        }
        tracing::info!(state = %reported, "output switched");
        Ok(reported)
    }
}
