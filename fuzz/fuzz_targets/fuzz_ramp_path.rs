#![no_main]
use helmcoil_core::RampCfg;
use helmcoil_core::path::transit_points;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (i32, i32, i32)| {
    let (from, to, requested) = input;
    // Keep paths to a sane length; the bench never spans more than ±10 A
    let from = from % 20_000;
    let to = to % 20_000;
    let step = RampCfg::default().effective_step(requested);
    let mut prev = from;
    for p in transit_points(from, to, step).into_iter().skip(1).chain([to]) {
        assert!((p - prev).abs() <= step);
        prev = p;
    }
});
