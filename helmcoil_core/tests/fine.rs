use std::sync::Arc;

use helmcoil_core::fine::{binary_search, incremental};
use helmcoil_core::{Controller, FineCfg, FineStrategy, Result, SearchMode, TrimProbe};
use helmcoil_hardware::SimulatedBench;
use helmcoil_traits::ManualClock;
use proptest::prelude::*;

/// Integer trim model: residual = offset + fine / per_ma (truncating division).
struct Stepped {
    target: i32,
    offset: i32,
    per_ma: i32,
}

impl TrimProbe for Stepped {
    fn probe(&mut self, fine: i8) -> Result<i32> {
        Ok(self.target + self.offset + i32::from(fine) / self.per_ma)
    }
}

/// Linear model with a float gain, as a real source behaves.
struct Linear {
    target: i32,
    offset: f64,
    gain: f64,
}

impl TrimProbe for Linear {
    fn probe(&mut self, fine: i8) -> Result<i32> {
        Ok(self.target + (self.offset + self.gain * f64::from(fine)).trunc() as i32)
    }
}

/// Residual 2 mA per trim unit: the target falls between two trim values.
struct Coarse {
    offset: i32,
}

impl TrimProbe for Coarse {
    fn probe(&mut self, fine: i8) -> Result<i32> {
        Ok(self.offset + 2 * i32::from(fine))
    }
}

#[test]
fn incremental_walks_to_zero_residual() {
    let mut p = Stepped {
        target: 3000,
        offset: 4,
        per_ma: 10,
    };
    let out = incremental(&mut p, 3000, -25, 20, 0).unwrap();
    assert!(out.converged);
    assert_eq!(out.fine, -40);
    assert_eq!(out.probes, 16);
    assert_eq!(out.mode, SearchMode::Incremental);
}

#[test]
fn incremental_stops_on_direction_reversal() {
    let mut p = Coarse { offset: 5 };
    let out = incremental(&mut p, 0, 0, 20, 0).unwrap();
    assert_eq!(out.visited, vec![0, -1, -2, -3]);
    assert!(!out.converged);
    assert!(!out.saturated);
    assert_eq!(out.residual_ma, -1);
}

#[test]
fn incremental_respects_probe_budget() {
    let mut p = Stepped {
        target: 0,
        offset: 100,
        per_ma: 10,
    };
    let out = incremental(&mut p, 0, 0, 20, 1).unwrap();
    assert_eq!(out.probes, 20);
    assert!(!out.converged);
}

#[test]
fn incremental_stops_at_upper_bound() {
    let mut p = Stepped {
        target: 0,
        offset: -100,
        per_ma: 10,
    };
    let out = incremental(&mut p, 0, 125, 20, 1).unwrap();
    assert_eq!(out.fine, i8::MAX);
    assert!(out.saturated);
}

#[test]
fn binary_search_scenario_offset_four() {
    let mut p = Linear {
        target: 5000,
        offset: 4.0,
        gain: 0.1,
    };
    let out = binary_search(&mut p, 5000, 0, 7, 1).unwrap();
    assert!(out.converged || out.saturated);
    assert!(out.adjustments <= 7);
}

proptest! {
    #[test]
    fn binary_search_stays_in_range_and_budget(
        offset in -40.0f64..40.0,
        gain in 0.02f64..0.6,
        tol in 0i32..3,
    ) {
        let mut p = Linear { target: 1000, offset, gain };
        let out = binary_search(&mut p, 1000, 0, 7, tol).unwrap();
        prop_assert!(out.adjustments <= 8);
        prop_assert_eq!(out.probes as usize, out.visited.len());
        prop_assert_eq!(out.visited[0], 0);
        prop_assert_eq!(*out.visited.last().unwrap(), out.fine);
    }
}

fn trained_controller(
    strategy: FineStrategy,
) -> (
    SimulatedBench,
    Controller<helmcoil_hardware::SimulatedSource, helmcoil_hardware::SimulatedGaussmeter>,
) {
    let bench = SimulatedBench::new()
        .with_output_enabled(true)
        .with_offset_ma(4.0)
        .with_fine_gain(0.1);
    let c = Controller::builder()
        .with_source(bench.source())
        .with_sensor(bench.gaussmeter())
        .with_clock(Arc::new(ManualClock::new()))
        .with_fine(FineCfg {
            strategy,
            ..FineCfg::default()
        })
        .build()
        .unwrap();
    (bench, c)
}

#[test]
fn auto_switches_to_incremental_after_ten_calibrations() {
    let (_bench, mut c) = trained_controller(FineStrategy::Auto);
    for i in 0..10 {
        let target = if i % 2 == 0 { 1000 } else { 2000 };
        let out = c.ramp_to(target, 300, true).unwrap();
        assert_eq!(out.fine.unwrap().mode, SearchMode::Binary);
    }
    assert_eq!(c.session().history().len(), 10);

    let out = c.ramp_to(1000, 300, true).unwrap();
    let fine = out.fine.unwrap();
    assert_eq!(fine.mode, SearchMode::Incremental);
    assert_eq!(fine.visited[0], -32);
    assert!(fine.converged);
    assert_eq!(fine.probes, 1);
    // window stays bounded
    assert_eq!(c.session().history().len(), 10);
}

#[test]
fn binary_strategy_never_switches() {
    let (_bench, mut c) = trained_controller(FineStrategy::Binary);
    for i in 0..12 {
        let target = if i % 2 == 0 { 1000 } else { 2000 };
        let out = c.ramp_to(target, 300, true).unwrap();
        assert_eq!(out.fine.unwrap().mode, SearchMode::Binary);
    }
}
