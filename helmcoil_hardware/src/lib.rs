//! Instrument backends for the helmcoil controller.
//!
//! - `sim`: a simulated bipolar source and gaussmeter sharing one coil model
//! - `line`: line-oriented ASCII transport over any byte stream (TCP bridges)

pub mod error;
pub mod line;
pub mod sim;

pub use line::LineInstrument;
pub use sim::{SimulatedBench, SimulatedGaussmeter, SimulatedSource};
