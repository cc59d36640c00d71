//! Bench bring-up and shutdown sequences.

use helmcoil_core::{ControlError, Controller, OutputState};
use helmcoil_traits::Instrument;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StartupError {
    #[error("{device} identity mismatch: expected {expected:?}, got {actual:?}")]
    IdentityMismatch {
        device: &'static str,
        expected: String,
        actual: String,
    },
    #[error("current at zero setpoint is {measured_ma} mA (limit {limit_ma} mA)")]
    AbnormalZero { measured_ma: i32, limit_ma: i32 },
}

fn strip_terminator(reply: &str) -> &str {
    reply.trim_end_matches(['\r', '\n'])
}

/// Compare both instruments' identity replies against the configured strings.
pub fn verify_identity<P: Instrument, G: Instrument>(
    ctl: &mut Controller<P, G>,
    instruments: &helmcoil_config::Instruments,
) -> eyre::Result<()> {
    let checks: [(&'static str, String, &str); 2] = [
        ("source", ctl.source_identity()?, instruments.source_idn.as_str()),
        ("gaussmeter", ctl.sensor_identity()?, instruments.sensor_idn.as_str()),
    ];
    for (device, reply, expected) in checks {
        let actual = strip_terminator(&reply);
        if actual != expected {
            return Err(eyre::Report::new(StartupError::IdentityMismatch {
                device,
                expected: expected.to_string(),
                actual: actual.to_string(),
            }));
        }
        tracing::info!(device, identity = actual, "identity confirmed");
    }
    Ok(())
}

/// Identity check, sensor idle range, ramp to 0, zero check, output on.
pub fn bring_up<P: Instrument, G: Instrument>(
    ctl: &mut Controller<P, G>,
    cfg: &helmcoil_config::Config,
) -> eyre::Result<OutputState> {
    if cfg.startup.verify_identity {
        verify_identity(ctl, &cfg.instruments)?;
    }
    ctl.select_sensor_range(cfg.sensor.idle_range)?;
    ctl.ramp_to(0, 0, false)?;

    let measured_ma = ctl.read_measured_ma()?;
    let limit_ma = cfg.startup.zero_tolerance_ma;
    if measured_ma.abs() >= limit_ma {
        tracing::error!(measured_ma, limit_ma, "abnormal current at zero setpoint");
        return Err(eyre::Report::new(StartupError::AbnormalZero {
            measured_ma,
            limit_ma,
        }));
    }

    let state = if cfg.startup.enable_output {
        ctl.set_output(true)?
    } else {
        ctl.read_output()?
    };
    tracing::info!(output = %state, "bench ready");
    Ok(state)
}

/// Disable the output. If the source refuses, ramp it to 0 and report the
/// refusal anyway.
pub fn shut_down<P: Instrument, G: Instrument>(ctl: &mut Controller<P, G>) -> eyre::Result<()> {
    match ctl.set_output(false) {
        Ok(_) => {
            tracing::info!("bench shut down");
            Ok(())
        }
        Err(e) if matches!(e.downcast_ref::<ControlError>(), Some(ControlError::OutputEnable { .. })) => {
            tracing::warn!("output did not switch off; ramping to 0");
            ctl.ramp_to(0, 0, false)?;
            Err(e)
        }
        Err(e) => Err(e),
    }
}
