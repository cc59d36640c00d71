//! Point-in-time instrument snapshot.

use chrono::{DateTime, Local};
use helmcoil_traits::Instrument;

use crate::controller::Controller;
use crate::error::Result;

/// One reading of both instruments. Immutable once taken.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSample {
    /// Local wall-clock time the snapshot was taken.
    pub taken_at: DateTime<Local>,
    /// Seconds since the run epoch.
    pub elapsed_s: f64,
    pub set_current_a: f64,
    pub measured_current_a: f64,
    pub measured_field: f64,
    pub measured_voltage_v: f64,
    pub fine: i8,
}

impl core::fmt::Display for StatusSample {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "t={:.3}s ISET={:.3}A IOUT={:.3}A field={} VOUT={:.3}V IFINE={}",
            self.elapsed_s,
            self.set_current_a,
            self.measured_current_a,
            self.measured_field,
            self.measured_voltage_v,
            self.fine
        )
    }
}

impl<P: Instrument, G: Instrument> Controller<P, G> {
    /// Query every reading and return a snapshot.
    pub fn read_status(&mut self) -> Result<StatusSample> {
        let elapsed_s = self.elapsed_s();
        let measured_current_a = self.read_measured_a()?;
        let set_current_a = self.read_setpoint_a()?;
        let measured_voltage_v = self.read_voltage_v()?;
        let fine = self.read_fine()?;
        let measured_field = self.read_field()?;
        let sample = StatusSample {
            taken_at: Local::now(),
            elapsed_s,
            set_current_a,
            measured_current_a,
            measured_field,
            measured_voltage_v,
            fine,
        };
        tracing::debug!(%sample, "status");
        Ok(sample)
    }
}
