//! Fine trim search.
//!
//! The source has a signed 8-bit trim (`IFINE`) that shifts the output by a
//! fraction of a milliamp per unit. After a coarse ramp lands on the target the
//! remaining offset is cancelled by searching for the trim value whose measured
//! current is closest to the target.
//!
//! The searches are written against [`TrimProbe`] so they run the same way on
//! the controller, on a simulated model and in benchmarks.

use crate::config::{FineCfg, FineStrategy};
use crate::error::Result;
use crate::history::FineCalibrationHistory;
use crate::units::{FINE_MAX, FINE_MIN, clamp_fine};

/// Deepest binary search that still fits the trim range (first correction 2^6 = 64).
pub const MAX_BINARY_BUDGET: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Binary,
    Incremental,
}

impl core::fmt::Display for SearchMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            SearchMode::Binary => "binary",
            SearchMode::Incremental => "incremental",
        })
    }
}

/// Applies a trim value and reports the measured current.
pub trait TrimProbe {
    /// Called once before a search starts; implementations pick their settle interval here.
    fn enter_mode(&mut self, _mode: SearchMode) {}

    /// Apply `fine`, wait for the output to settle and return the measured current (mA).
    fn probe(&mut self, fine: i8) -> Result<i32>;
}

impl<T: TrimProbe + ?Sized> TrimProbe for &mut T {
    fn enter_mode(&mut self, mode: SearchMode) {
        (**self).enter_mode(mode);
    }

    fn probe(&mut self, fine: i8) -> Result<i32> {
        (**self).probe(fine)
    }
}

/// Result of one trim search. Non-convergence is reported here, not as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FineOutcome {
    pub mode: SearchMode,
    /// Trim value left applied on the device (the last one probed).
    pub fine: i8,
    /// measured − target at `fine` (mA).
    pub residual_ma: i32,
    pub probes: u32,
    /// Trim changes after the starting probe.
    pub adjustments: u32,
    pub converged: bool,
    /// Search ended pinned at a trim bound without converging.
    pub saturated: bool,
    /// Trim values in probe order.
    pub visited: Vec<i8>,
}

impl FineOutcome {
    fn new(mode: SearchMode, start: i8) -> Self {
        Self {
            mode,
            fine: start,
            residual_ma: 0,
            probes: 0,
            adjustments: 0,
            converged: false,
            saturated: false,
            visited: Vec::new(),
        }
    }

    fn record(&mut self, fine: i8, residual_ma: i32) {
        self.fine = fine;
        self.residual_ma = residual_ma;
        self.probes += 1;
        self.adjustments = self.probes.saturating_sub(1);
        self.visited.push(fine);
    }

    fn finish(mut self) -> Self {
        self.saturated = !self.converged && (self.fine == FINE_MIN || self.fine == FINE_MAX);
        self
    }
}

/// Binary search starting at `start` with `budget` halving steps.
///
/// Each level moves the trim by 2^(remaining−1) toward the target. When the
/// budget runs out at −127 one extra probe at −128 is made, since halving can
/// never reach the lower bound on its own.
pub fn binary_search<T: TrimProbe + ?Sized>(
    probe: &mut T,
    target_ma: i32,
    start: i8,
    budget: u32,
    tolerance_ma: i32,
) -> Result<FineOutcome> {
    probe.enter_mode(SearchMode::Binary);
    let mut out = FineOutcome::new(SearchMode::Binary, start);
    bisect(
        probe,
        target_ma,
        start,
        budget.min(MAX_BINARY_BUDGET),
        tolerance_ma,
        &mut out,
    )?;
    Ok(out.finish())
}

fn bisect<T: TrimProbe + ?Sized>(
    probe: &mut T,
    target_ma: i32,
    fine: i8,
    remaining: u32,
    tolerance_ma: i32,
    out: &mut FineOutcome,
) -> Result<()> {
    let measured = probe.probe(fine)?;
    let residual = measured.saturating_sub(target_ma);
    out.record(fine, residual);
    tracing::debug!(fine, residual_ma = residual, remaining, "binary probe");

    if residual.abs() <= tolerance_ma {
        out.converged = true;
        return Ok(());
    }
    if remaining == 0 {
        if fine == FINE_MIN + 1 {
            let measured = probe.probe(FINE_MIN)?;
            let residual = measured.saturating_sub(target_ma);
            out.record(FINE_MIN, residual);
            out.converged = residual.abs() <= tolerance_ma;
        }
        return Ok(());
    }

    let raise = measured < target_ma;
    if (raise && fine == FINE_MAX) || (!raise && fine == FINE_MIN) {
        return Ok(());
    }
    let remaining = remaining - 1;
    let delta = 1i32 << remaining;
    let next = if raise {
        i32::from(fine) + delta
    } else {
        i32::from(fine) - delta
    };
    bisect(
        probe,
        target_ma,
        clamp_fine(next),
        remaining,
        tolerance_ma,
        out,
    )
}

/// Walk the trim one unit at a time from `start`.
///
/// Stops on convergence, at a trim bound, when the residual changes sign
/// (the target lies between two trim values) or after `max_probes` probes.
pub fn incremental<T: TrimProbe + ?Sized>(
    probe: &mut T,
    target_ma: i32,
    start: i8,
    max_probes: u32,
    tolerance_ma: i32,
) -> Result<FineOutcome> {
    probe.enter_mode(SearchMode::Incremental);
    let mut out = FineOutcome::new(SearchMode::Incremental, start);
    let max_probes = max_probes.max(1);
    let mut fine = start;
    let mut last_raise: Option<bool> = None;

    loop {
        let measured = probe.probe(fine)?;
        let residual = measured.saturating_sub(target_ma);
        out.record(fine, residual);
        tracing::debug!(fine, residual_ma = residual, "incremental probe");

        if residual.abs() <= tolerance_ma {
            out.converged = true;
            break;
        }
        if out.probes >= max_probes {
            break;
        }
        let raise = measured < target_ma;
        if last_raise.is_some_and(|prev| prev != raise) {
            break;
        }
        if (raise && fine == FINE_MAX) || (!raise && fine == FINE_MIN) {
            break;
        }
        last_raise = Some(raise);
        fine = if raise { fine + 1 } else { fine - 1 };
    }
    Ok(out.finish())
}

/// Trim value predicted from the learned residual/fine ratio.
///
/// Ratios are stored as residual per trim unit, so the trim that cancels a
/// residual is `residual / ratio`.
pub fn initial_guess(history: &FineCalibrationHistory, residual_ma: i32) -> Option<i8> {
    let avg = history.average()?;
    if avg == 0.0 {
        return None;
    }
    let guess = (f64::from(residual_ma) / avg).round();
    if !guess.is_finite() {
        return None;
    }
    Some(clamp_fine(
        guess.clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32,
    ))
}

/// Search mode and starting trim for the configured strategy.
pub fn select_mode(
    cfg: &FineCfg,
    history: &FineCalibrationHistory,
    residual_ma: i32,
) -> (SearchMode, i8) {
    let learned = if history.is_trained(cfg.min_history) {
        initial_guess(history, residual_ma)
    } else {
        None
    };
    match cfg.strategy {
        FineStrategy::Binary => (SearchMode::Binary, 0),
        FineStrategy::Auto => match learned {
            Some(guess) => (SearchMode::Incremental, guess),
            None => (SearchMode::Binary, 0),
        },
        FineStrategy::Incremental => (
            SearchMode::Incremental,
            learned.unwrap_or(cfg.incremental_base),
        ),
    }
}

/// Run the configured search for a residual observed at fine 0 and feed the
/// result back into `history`.
pub fn calibrate<T: TrimProbe + ?Sized>(
    probe: &mut T,
    cfg: &FineCfg,
    history: &mut FineCalibrationHistory,
    target_ma: i32,
    residual_ma: i32,
    tolerance_ma: i32,
) -> Result<FineOutcome> {
    let (mode, start) = select_mode(cfg, history, residual_ma);
    tracing::info!(%mode, start, target_ma, residual_ma, trained = history.len(), "fine search");
    let outcome = match mode {
        SearchMode::Binary => {
            binary_search(probe, target_ma, start, cfg.binary_budget, tolerance_ma)?
        }
        SearchMode::Incremental => incremental(
            probe,
            target_ma,
            start,
            cfg.incremental_max_probes,
            tolerance_ma,
        )?,
    };
    if outcome.fine != 0 && !outcome.saturated {
        history.record(f64::from(residual_ma) / f64::from(outcome.fine));
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Linear trim model: measured = target + offset + gain * fine, truncated to mA.
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

    #[test]
    fn guess_divides_by_learned_ratio() {
        let mut h = FineCalibrationHistory::new(10);
        for _ in 0..10 {
            h.record(-0.1);
        }
        assert_eq!(initial_guess(&h, 4), Some(-40));
        assert_eq!(initial_guess(&h, 100), Some(FINE_MIN));
    }

    #[test]
    fn auto_uses_binary_until_trained() {
        let cfg = FineCfg::default();
        let mut h = FineCalibrationHistory::new(10);
        assert_eq!(select_mode(&cfg, &h, 4), (SearchMode::Binary, 0));
        for _ in 0..10 {
            h.record(-0.1);
        }
        assert_eq!(select_mode(&cfg, &h, 4), (SearchMode::Incremental, -40));
    }

    #[test]
    fn incremental_without_history_starts_from_base() {
        let cfg = FineCfg {
            strategy: FineStrategy::Incremental,
            incremental_base: -25,
            ..FineCfg::default()
        };
        let h = FineCalibrationHistory::new(10);
        assert_eq!(select_mode(&cfg, &h, 4), (SearchMode::Incremental, -25));
    }

    #[test]
    fn forced_lower_bound_probe() {
        // Needs more than −127 to cancel, so halving ends at −127 and one extra probe hits −128.
        let mut p = Linear {
            target: 1000,
            offset: 20.0,
            gain: 0.1,
        };
        let out = binary_search(&mut p, 1000, 0, 7, 1).unwrap();
        assert_eq!(out.visited.last(), Some(&FINE_MIN));
        assert_eq!(out.visited.len(), 9);
        assert_eq!(out.adjustments, 8);
        assert!(out.saturated);
    }

    #[test]
    fn calibrate_records_ratio() {
        let cfg = FineCfg::default();
        let mut h = FineCalibrationHistory::new(10);
        let mut p = Linear {
            target: 2000,
            offset: 4.0,
            gain: 0.1,
        };
        let out = calibrate(&mut p, &cfg, &mut h, 2000, 4, 1).unwrap();
        assert!(out.converged);
        assert_eq!(h.len(), 1);
        let ratio = h.average().unwrap();
        assert!((ratio - 4.0 / f64::from(out.fine)).abs() < 1e-12);
    }
}
