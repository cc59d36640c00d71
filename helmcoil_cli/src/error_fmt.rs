//! Human-readable error descriptions and structured JSON error formatting.

use crate::startup::StartupError;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    use helmcoil_core::{BuildError, ControlError};

    // Typed matches first
    if let Some(BuildError::InvalidConfig(msg)) = err.downcast_ref::<BuildError>() {
        return format!(
            "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
        );
    }

    if let Some(se) = err.downcast_ref::<StartupError>() {
        return match se {
            StartupError::IdentityMismatch { device, expected, actual } => format!(
                "What happened: The {device} answered {actual:?} instead of {expected:?}.\nLikely causes: Wrong address or bridge port, or a different instrument on the bus.\nHow to fix: Check [instruments] addresses and expected identities in the config."
            ),
            StartupError::AbnormalZero { measured_ma, limit_ma } => format!(
                "What happened: The source reads {measured_ma} mA at a zero setpoint (limit {limit_ma} mA).\nLikely causes: Fine trim left non-zero, external load, or a faulty source.\nHow to fix: Power-cycle the source and check the coil wiring before enabling the output."
            ),
        };
    }

    if let Some(ce) = err.downcast_ref::<ControlError>() {
        return match ce {
            ControlError::Timeout => "What happened: An instrument did not answer in time.\nLikely causes: Bridge unreachable, cable unplugged, or timeout too low.\nHow to fix: Check the LAN bridge and raise instruments.timeout_ms in the config.".to_string(),
            ControlError::OutputEnable { requested, reported } => format!(
                "What happened: Output enable failed (requested {}, source reports {}).\nLikely causes: Interlock tripped or the source is in local mode.\nHow to fix: Clear the interlock, put the source in remote mode, then rerun.",
                on_off(*requested),
                on_off(*reported)
            ),
            ControlError::SensorRange { wanted, reported } => format!(
                "What happened: Gaussmeter range {wanted} was not confirmed (device reports {reported:?}).\nLikely causes: Probe not attached or an unsupported range.\nHow to fix: Check the probe and sensor.measure_range in the config."
            ),
            ControlError::Aborted { checkpoint } => format!(
                "What happened: Sweep aborted before checkpoint {checkpoint}.\nLikely causes: Interrupted by Ctrl-C.\nHow to fix: Samples taken so far are in the log; rerun the sweep to complete it."
            ),
            ControlError::Sink(msg) => format!(
                "What happened: Could not write the measurement log ({msg}).\nLikely causes: Missing directory or no write permission.\nHow to fix: Pass a writable --out path."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from config loading
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("checkpoint csv must have header") {
        return "Invalid headers in checkpoint CSV. Expected 'checkpoint'.".to_string();
    }

    if lower.contains("invalid configuration") || lower.contains("parse config") {
        return format!(
            "What happened: Configuration is invalid ({msg}).\nLikely causes: Unknown keys or out-of-range values.\nHow to fix: Edit the TOML config and try again."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

fn on_off(b: bool) -> &'static str {
    if b { "on" } else { "off" }
}

/// Stable exit codes for the failures an operator script may branch on; 1 otherwise.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    use helmcoil_core::ControlError;
    if let Some(ce) = err.downcast_ref::<ControlError>() {
        match ce {
            ControlError::Aborted { .. } => return 2,
            ControlError::OutputEnable { .. } => return 3,
            ControlError::SensorRange { .. } => return 4,
            _ => {}
        }
    }
    match err.downcast_ref::<StartupError>() {
        Some(StartupError::IdentityMismatch { .. }) => 5,
        Some(StartupError::AbnormalZero { .. }) => 6,
        None => 1,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    use helmcoil_core::ControlError;
    if let Some(ce) = err.downcast_ref::<ControlError>() {
        return match ce {
            ControlError::Aborted { .. } => "Aborted",
            ControlError::OutputEnable { .. } => "OutputEnable",
            ControlError::SensorRange { .. } => "SensorRange",
            ControlError::Timeout => "Timeout",
            _ => "Error",
        };
    }
    match err.downcast_ref::<StartupError>() {
        Some(StartupError::IdentityMismatch { .. }) => "IdentityMismatch",
        Some(StartupError::AbnormalZero { .. }) => "AbnormalZero",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}
