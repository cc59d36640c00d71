use std::sync::Arc;

use helmcoil_core::{Controller, ControlError, RampCfg, SearchMode};
use helmcoil_hardware::{SimulatedBench, SimulatedGaussmeter, SimulatedSource};
use helmcoil_traits::ManualClock;
use rstest::rstest;

fn controller(bench: &SimulatedBench) -> Controller<SimulatedSource, SimulatedGaussmeter> {
    Controller::builder()
        .with_source(bench.source())
        .with_sensor(bench.gaussmeter())
        .with_clock(Arc::new(ManualClock::new()))
        .build()
        .unwrap()
}

fn max_step(start: i32, history: &[i32]) -> i32 {
    let mut prev = start;
    let mut max = 0;
    for &sp in history {
        max = max.max((sp - prev).abs());
        prev = sp;
    }
    max
}

#[test]
fn ramp_up_issues_fifty_transit_writes_and_final_target() {
    let bench = SimulatedBench::new().with_output_enabled(true);
    let mut c = controller(&bench);

    let out = c.ramp_to(5000, 100, false).unwrap();

    let history = bench.setpoint_history_ma();
    let mut expected: Vec<i32> = (0..50).map(|k| k * 100).collect();
    expected.push(5000);
    assert_eq!(history, expected);
    assert_eq!(out.commands, 51);
    assert_eq!(out.origin_ma, 0);
    assert_eq!(out.residual_ma, Some(0));
    assert!(out.warning.is_none());
    assert_eq!(c.session().setpoint_ma(), Some(5000));
}

#[test]
fn second_identical_ramp_writes_nothing() {
    let bench = SimulatedBench::new().with_output_enabled(true);
    let mut c = controller(&bench);
    c.ramp_to(1500, 300, false).unwrap();
    let writes = bench.write_count();

    let again = c.ramp_to(1500, 300, false).unwrap();

    assert!(again.is_noop());
    assert_eq!(bench.write_count(), writes);
}

#[rstest]
#[case(0, 100)]
#[case(-250, 250)]
#[case(1000, 300)]
fn caller_step_is_normalized_and_capped(#[case] step: i32, #[case] expected_max: i32) {
    let bench = SimulatedBench::new().with_output_enabled(true);
    let mut c = controller(&bench);
    c.ramp_to(3000, step, false).unwrap();
    assert_eq!(max_step(0, &bench.setpoint_history_ma()), expected_max);
}

#[test]
fn configured_cap_below_default() {
    let bench = SimulatedBench::new().with_output_enabled(true);
    let mut c = Controller::builder()
        .with_source(bench.source())
        .with_sensor(bench.gaussmeter())
        .with_clock(Arc::new(ManualClock::new()))
        .with_ramp(RampCfg {
            default_step_ma: 50,
            max_step_ma: 50,
            ..RampCfg::default()
        })
        .build()
        .unwrap();
    c.ramp_to(-1000, 0, false).unwrap();
    assert!(max_step(0, &bench.setpoint_history_ma()) <= 50);
    assert_eq!(bench.setpoint_history_ma().last(), Some(&-1000));
}

#[test]
fn ramp_down_from_measured_current() {
    let bench = SimulatedBench::new()
        .with_output_enabled(true)
        .with_setpoint_ma(1000);
    let mut c = controller(&bench);
    c.ramp_to(0, 300, false).unwrap();
    assert_eq!(bench.setpoint_history_ma(), vec![1000, 700, 400, 100, 0]);
}

#[test]
fn offset_without_fine_is_a_warning_not_an_error() {
    let bench = SimulatedBench::new()
        .with_output_enabled(true)
        .with_offset_ma(4.0);
    let mut c = controller(&bench);

    let out = c.ramp_to(2000, 200, false).unwrap();

    let w = out.warning.expect("residual warning");
    assert_eq!(w.target_ma, 2000);
    assert_eq!(w.residual_ma, 4);
    assert_eq!(w.fine, None);
    assert!(out.fine.is_none());
    assert!(!bench.source_writes().iter().any(|w| w.starts_with("IFINE")));
}

#[test]
fn fine_search_cancels_offset() {
    let bench = SimulatedBench::new()
        .with_output_enabled(true)
        .with_offset_ma(4.0)
        .with_fine_gain(0.1);
    let mut c = controller(&bench);

    let out = c.ramp_to(5000, 100, true).unwrap();

    let fine = out.fine.expect("fine search ran");
    assert_eq!(fine.mode, SearchMode::Binary);
    assert_eq!(fine.visited, vec![0, -64, -32]);
    assert!(fine.converged);
    assert_eq!(fine.adjustments, 2);
    assert_eq!(bench.fine(), -32);
    assert_eq!(out.residual_ma, Some(1));
    assert!(out.warning.is_none());
    assert_eq!(c.session().history().len(), 1);
    // Trim is reset before the ramp is walked
    assert_eq!(bench.source_writes().first().map(String::as_str), Some("IFINE 0"));
}

#[test]
fn repeat_ramp_with_offset_keeps_setpoint_and_reports_residual() {
    let bench = SimulatedBench::new()
        .with_output_enabled(true)
        .with_offset_ma(4.0);
    let mut c = controller(&bench);
    c.ramp_to(2000, 100, false).unwrap();
    let writes = bench.write_count();

    let again = c.ramp_to(2000, 100, false).unwrap();

    assert!(again.is_noop());
    assert_eq!(bench.write_count(), writes);
    assert_eq!(again.residual_ma, Some(4));
    let w = again.warning.expect("residual warning");
    assert_eq!(w.residual_ma, 4);
    assert_eq!(w.fine, None);
    assert_eq!(bench.setpoint_history_ma().last(), Some(&2000));
}

#[test]
fn repeat_ramp_with_fine_trims_in_place() {
    let bench = SimulatedBench::new()
        .with_output_enabled(true)
        .with_offset_ma(4.0)
        .with_fine_gain(0.1);
    let mut c = controller(&bench);
    c.ramp_to(2000, 100, false).unwrap();
    bench.clear_log();

    let out = c.ramp_to(2000, 100, true).unwrap();

    assert!(out.is_noop());
    assert!(bench.setpoint_history_ma().is_empty());
    let fine = out.fine.expect("fine search ran");
    assert!(fine.converged);
    assert_eq!(bench.fine(), -32);
    assert_eq!(out.residual_ma, Some(1));
    assert!(out.warning.is_none());
    assert_eq!(bench.source_writes().first().map(String::as_str), Some("IFINE 0"));

    // Landed within tolerance: nothing more to do
    bench.clear_log();
    let settled = c.ramp_to(2000, 100, true).unwrap();
    assert!(settled.fine.is_none());
    assert_eq!(settled.residual_ma, Some(1));
    assert_eq!(bench.write_count(), 0);
}

#[test]
fn output_off_ramp_skips_residual_check() {
    let bench = SimulatedBench::new().with_offset_ma(4.0);
    let mut c = controller(&bench);

    let out = c.ramp_to(600, 200, true).unwrap();

    assert_eq!(out.residual_ma, None);
    assert!(out.fine.is_none());
    assert_eq!(bench.setpoint_history_ma(), vec![0, 200, 400, 600]);
}

#[test]
fn write_failure_maps_to_typed_error() {
    use helmcoil_core::mocks::ScriptedInstrument;
    let source = ScriptedInstrument::new()
        .reply("OUT?", "OUT 001\r\n")
        .reply("IOUT?", "IOUT  0.000A\r\n")
        .failing_writes();
    let mut c = Controller::builder()
        .with_source(source)
        .with_sensor(ScriptedInstrument::new())
        .with_clock(Arc::new(ManualClock::new()))
        .build()
        .unwrap();

    let err = c.ramp_to(100, 100, false).unwrap_err();
    assert_eq!(err.downcast_ref::<ControlError>(), Some(&ControlError::Timeout));
}
