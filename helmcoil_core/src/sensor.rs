//! Field sensor range selection.

use helmcoil_traits::Instrument;

use crate::controller::Controller;
use crate::error::{ControlError, Result};
use crate::protocol;

impl<P: Instrument, G: Instrument> Controller<P, G> {
    /// Write `RANGE n` and confirm it by reading `RANGE?` back.
    pub fn select_sensor_range(&mut self, range: u8) -> Result<()> {
        self.sensor_write(&protocol::set_range(range))?;
        self.sleep_ms(self.sensor_cfg.settle_ms);
        let reply = self.sensor_query(protocol::QUERY_RANGE)?;
        if protocol::parse_range(&reply) != Some(range) {
            tracing::error!(wanted = range, reply = reply.trim_end(), "sensor range not confirmed");
            return Err(eyre::Report::new(ControlError::SensorRange {
                wanted: range,
                reported: reply.trim_end().to_string(),
            }));
        }
        tracing::info!(range, "sensor range selected");
        Ok(())
    }
}
