//! Per-run controller state.

use crate::history::FineCalibrationHistory;

/// Output enable state of the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputState {
    Disabled,
    Enabled,
}

impl OutputState {
    pub fn is_enabled(self) -> bool {
        matches!(self, OutputState::Enabled)
    }
}

impl From<bool> for OutputState {
    fn from(enabled: bool) -> Self {
        if enabled {
            OutputState::Enabled
        } else {
            OutputState::Disabled
        }
    }
}

impl core::fmt::Display for OutputState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            OutputState::Disabled => "disabled",
            OutputState::Enabled => "enabled",
        })
    }
}

/// State owned by one controller for the lifetime of a measurement run.
///
/// `None` means the value has not been observed on the device yet.
#[derive(Debug, Clone, Default)]
pub struct ControlSession {
    pub(crate) output: Option<OutputState>,
    pub(crate) setpoint_ma: Option<i32>,
    pub(crate) history: FineCalibrationHistory,
}

impl ControlSession {
    pub fn new(history_window: usize) -> Self {
        Self {
            output: None,
            setpoint_ma: None,
            history: FineCalibrationHistory::new(history_window),
        }
    }

    /// Last observed output state.
    pub fn output(&self) -> Option<OutputState> {
        self.output
    }

    /// Last setpoint this controller commanded or read back (mA).
    pub fn setpoint_ma(&self) -> Option<i32> {
        self.setpoint_ma
    }

    pub fn history(&self) -> &FineCalibrationHistory {
        &self.history
    }
}
