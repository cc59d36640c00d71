use criterion::{Criterion, black_box, criterion_group, criterion_main};
use helmcoil_core::fine::{binary_search, calibrate, incremental};
use helmcoil_core::{FineCalibrationHistory, FineCfg, Result, TrimProbe};

// Linear trim model with a little deterministic ripple
struct Model {
    target: i32,
    offset: f64,
    gain: f64,
    state: u32,
}

impl Model {
    fn new(offset: f64, gain: f64) -> Self {
        Self {
            target: 2500,
            offset,
            gain,
            state: 0x9e37_79b9,
        }
    }

    fn ripple(&mut self) -> f64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        (f64::from(x) / f64::from(u32::MAX) - 0.5) * 0.4
    }
}

impl TrimProbe for Model {
    fn probe(&mut self, fine: i8) -> Result<i32> {
        let r = self.offset + self.gain * f64::from(fine) + self.ripple();
        Ok(self.target + r.trunc() as i32)
    }
}

fn bench_fine_search(c: &mut Criterion) {
    c.bench_function("binary_search_offset_4", |b| {
        b.iter(|| {
            let mut m = Model::new(4.0, 0.1);
            black_box(binary_search(&mut m, 2500, 0, 7, 1).ok())
        })
    });

    c.bench_function("incremental_from_guess", |b| {
        b.iter(|| {
            let mut m = Model::new(4.0, 0.1);
            black_box(incremental(&mut m, 2500, -35, 20, 1).ok())
        })
    });

    c.bench_function("calibrate_trained_history", |b| {
        let cfg = FineCfg::default();
        b.iter(|| {
            let mut history = FineCalibrationHistory::new(10);
            for _ in 0..10 {
                history.record(-0.1);
            }
            let mut m = Model::new(black_box(6.0), 0.1);
            black_box(calibrate(&mut m, &cfg, &mut history, 2500, 6, 1).ok())
        })
    });
}

criterion_group!(benches, bench_fine_search);
criterion_main!(benches);
