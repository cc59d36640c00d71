//! Converts instrument transport errors into `ControlError`.
//!
//! Typed `HwError`s from the line transport and the simulator are matched
//! directly (feature `hardware-errors`). Errors from other transports only
//! carry text, so the LAN bridge's usual failure wording is recognised.

use crate::error::ControlError;

// Link-level failures: the instrument is gone, not just slow.
const LINK_LOST: [&str; 4] = [
    "closed the connection",
    "disconnected",
    "connection reset",
    "broken pipe",
];

/// Map an instrument error to a `ControlError`.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> ControlError {
    #[cfg(feature = "hardware-errors")]
    {
        use helmcoil_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::Timeout => ControlError::Timeout,
                HwError::Io(io) if io.kind() == std::io::ErrorKind::TimedOut => ControlError::Timeout,
                other => ControlError::HardwareFault(other.to_string()),
            };
        }
    }
    if let Some(io) = e.downcast_ref::<std::io::Error>() {
        use std::io::ErrorKind;
        return match io.kind() {
            ErrorKind::TimedOut | ErrorKind::WouldBlock => ControlError::Timeout,
            ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted | ErrorKind::BrokenPipe => {
                ControlError::HardwareFault(io.to_string())
            }
            _ => ControlError::Hardware(io.to_string()),
        };
    }

    let s = e.to_string();
    let lower = s.to_lowercase();
    if lower.contains("timeout") || lower.contains("timed out") {
        ControlError::Timeout
    } else if LINK_LOST.iter().any(|m| lower.contains(m)) {
        ControlError::HardwareFault(s)
    } else {
        ControlError::Hardware(s)
    }
}
