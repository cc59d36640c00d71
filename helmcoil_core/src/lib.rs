#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Closed-loop coil current control (hardware-agnostic).
//!
//! All device traffic goes through `helmcoil_traits::Instrument`: one
//! instrument for the bipolar current source, one for the field sensor.
//!
//! ## Architecture
//!
//! - **Output**: enable/disable with setpoint zeroing and read-back (`output`)
//! - **Ramp**: bounded-step setpoint moves (`ramp`, `path`)
//! - **Fine**: binary and incremental trim search with a learned gain (`fine`, `history`)
//! - **Sweep**: checkpoint/mesh plans logged through a `LogSink` (`sweep`, `plan`, `sink`)
//! - **Field**: field targets converted to coil current (`field`)
//! - **Status**: snapshots of every reading (`status`)
//!
//! ## Units
//!
//! Internals operate in integer **milliamps**; the wire protocol uses amps with
//! three decimals. See `units::amps_to_ma` for the truncation rule.

pub mod config;
pub mod controller;
pub mod conversions;
pub mod error;
pub mod field;
pub mod fine;
pub mod history;
pub mod hw_error;
pub mod mocks;
pub mod output;
pub mod path;
pub mod plan;
pub mod protocol;
pub mod ramp;
pub mod sensor;
pub mod session;
pub mod sink;
pub mod status;
pub mod sweep;
pub mod units;

pub use config::{FieldCfg, FineCfg, FineStrategy, OutputCfg, RampCfg, SensorCfg, SweepCfg};
pub use controller::{Controller, ControllerBuilder, Missing};
pub use error::{BuildError, ControlError, ResidualWarning, Result};
pub use fine::{FineOutcome, SearchMode, TrimProbe};
pub use history::FineCalibrationHistory;
pub use plan::{SweepAxis, SweepPlan};
pub use ramp::RampOutcome;
pub use session::{ControlSession, OutputState};
pub use sink::{CsvLogSink, LogSink};
pub use status::StatusSample;
