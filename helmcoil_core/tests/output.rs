use std::sync::Arc;

use helmcoil_core::{ControlError, Controller, OutputState};
use helmcoil_hardware::{SimulatedBench, SimulatedGaussmeter, SimulatedSource};
use helmcoil_traits::ManualClock;

fn controller(bench: &SimulatedBench) -> Controller<SimulatedSource, SimulatedGaussmeter> {
    Controller::builder()
        .with_source(bench.source())
        .with_sensor(bench.gaussmeter())
        .with_clock(Arc::new(ManualClock::new()))
        .build()
        .unwrap()
}

#[test]
fn already_enabled_is_a_no_op() {
    let bench = SimulatedBench::new()
        .with_output_enabled(true)
        .with_setpoint_ma(250);
    let mut c = controller(&bench);

    let state = c.set_output(true).unwrap();

    assert_eq!(state, OutputState::Enabled);
    assert_eq!(bench.write_count(), 0);
    assert_eq!(c.session().output(), Some(OutputState::Enabled));
}

#[test]
fn enable_from_zero_writes_out_only() {
    let bench = SimulatedBench::new();
    let mut c = controller(&bench);

    c.set_output(true).unwrap();

    assert_eq!(bench.source_writes(), vec!["OUT 1".to_string()]);
    assert!(bench.output_enabled());
}

#[test]
fn stuck_output_fails_without_retry() {
    let bench = SimulatedBench::new().with_stuck_output(true);
    let mut c = controller(&bench);

    let err = c.set_output(true).unwrap_err();

    assert_eq!(
        err.downcast_ref::<ControlError>(),
        Some(&ControlError::OutputEnable {
            requested: true,
            reported: false,
        })
    );
    assert!(format!("{err:#}").contains("output enable failed"));
    assert_eq!(bench.source_writes(), vec!["OUT 1".to_string()]);
    assert_eq!(c.session().output(), Some(OutputState::Disabled));
}

#[test]
fn disable_ramps_live_current_down_first() {
    let bench = SimulatedBench::new()
        .with_output_enabled(true)
        .with_setpoint_ma(2000);
    let mut c = controller(&bench);

    c.set_output(false).unwrap();

    let history = bench.setpoint_history_ma();
    assert_eq!(history.first(), Some(&2000));
    assert_eq!(history.last(), Some(&0));
    assert_eq!(history.len(), 21);
    assert!(history.windows(2).all(|w| (w[0] - w[1]).abs() <= 100));
    assert_eq!(bench.source_writes().last().map(String::as_str), Some("OUT 0"));
    assert!(!bench.output_enabled());
}

#[test]
fn enable_with_stale_setpoint_zeroes_it_in_steps() {
    let bench = SimulatedBench::new().with_setpoint_ma(1200);
    let mut c = controller(&bench);

    c.set_output(true).unwrap();

    let history = bench.setpoint_history_ma();
    assert_eq!(history.first(), Some(&1200));
    assert_eq!(history.last(), Some(&0));
    assert!(history.windows(2).all(|w| (w[0] - w[1]).abs() <= 100));
    let writes = bench.source_writes();
    let out_pos = writes.iter().position(|w| w == "OUT 1").unwrap();
    assert_eq!(out_pos, writes.len() - 1);
    assert_eq!(bench.setpoint_a(), 0.0);
    assert!(bench.output_enabled());
}
