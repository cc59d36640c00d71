use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ControlError {
    /// The source did not confirm the requested output state after write + settle.
    #[error("output enable failed: requested {requested}, device reports {reported}")]
    OutputEnable { requested: bool, reported: bool },
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("timeout waiting for instrument")]
    Timeout,
    #[error("unexpected reply to {command}: {reply:?}")]
    Reply { command: String, reply: String },
    #[error("field sensor range not confirmed: wanted {wanted}, device reports {reported:?}")]
    SensorRange { wanted: u8, reported: String },
    #[error("sweep aborted before checkpoint {checkpoint}")]
    Aborted { checkpoint: usize },
    #[error("log sink error: {0}")]
    Sink(String),
    #[error("invalid sweep plan: {0}")]
    Plan(&'static str),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

/// Advisory: a ramp or calibration finished outside the tolerance band.
///
/// Carried alongside a successful result and logged; never aborts a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResidualWarning {
    pub target_ma: i32,
    pub residual_ma: i32,
    pub fine: Option<i8>,
    pub saturated: bool,
}

impl core::fmt::Display for ResidualWarning {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "residual {:+} mA at target {} mA",
            self.residual_ma, self.target_ma
        )?;
        if let Some(fine) = self.fine {
            write!(f, " (fine {fine}")?;
            if self.saturated {
                write!(f, ", saturated")?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
