use helmcoil_hardware::SimulatedBench;
use helmcoil_traits::Instrument;
use rstest::rstest;

#[rstest]
#[case(0.0, 0, "IOUT  5.000A\r\n")]
#[case(4.0, 0, "IOUT  5.004A\r\n")]
#[case(4.0, -40, "IOUT  5.000A\r\n")]
#[case(-3.0, 30, "IOUT  5.000A\r\n")]
fn fine_trim_cancels_offset(#[case] offset_ma: f64, #[case] fine: i8, #[case] expected: &str) {
    let bench = SimulatedBench::new()
        .with_offset_ma(offset_ma)
        .with_fine_gain(0.1)
        .with_output_enabled(true);
    let mut src = bench.source();
    src.write("ISET 5.000").unwrap();
    src.write(&format!("IFINE {fine}")).unwrap();
    assert_eq!(src.query("IOUT?").unwrap(), expected);
}

#[test]
fn gaussmeter_follows_source_current() {
    let bench = SimulatedBench::new().with_output_enabled(true);
    let mut src = bench.source();
    let mut gauss = bench.gaussmeter();
    src.write("ISET 1.000").unwrap();
    assert_eq!(gauss.query("FIELD?").unwrap(), "20.96\r\n");
    src.write("ISET -1.000").unwrap();
    assert_eq!(gauss.query("FIELD?").unwrap(), "-20.96\r\n");
}

#[test]
fn stuck_output_ignores_enable() {
    let bench = SimulatedBench::new().with_stuck_output(true);
    let mut src = bench.source();
    src.write("OUT 1").unwrap();
    assert!(!bench.output_enabled());
    assert_eq!(src.query("OUT?").unwrap(), "OUT 000\r\n");
}

#[test]
fn range_round_trips_and_writes_are_logged() {
    let bench = SimulatedBench::new();
    let mut gauss = bench.gaussmeter();
    gauss.write("RANGE 2").unwrap();
    assert_eq!(gauss.query("RANGE?").unwrap(), "2\r\n");
    assert_eq!(bench.sensor_writes(), vec!["RANGE 2".to_string()]);
    assert_eq!(bench.write_count(), 1);
}

#[test]
fn setpoint_history_is_in_milliamps() {
    let bench = SimulatedBench::new();
    let mut src = bench.source();
    for cmd in ["ISET 0.000", "ISET 0.300", "ISET -1.250"] {
        src.write(cmd).unwrap();
    }
    assert_eq!(bench.setpoint_history_ma(), vec![0, 300, -1250]);
}
