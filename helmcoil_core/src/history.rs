//! Sliding window of observed fine-calibration gains.

use std::collections::VecDeque;

/// Recent `residual_ma / fine` ratios, oldest evicted first.
///
/// The average over the window is the learned scale factor used to seed an
/// incremental correction instead of a full binary search.
#[derive(Debug, Clone)]
pub struct FineCalibrationHistory {
    window: usize,
    ratios: VecDeque<f64>,
}

impl Default for FineCalibrationHistory {
    fn default() -> Self {
        Self::new(10)
    }
}

impl FineCalibrationHistory {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            ratios: VecDeque::with_capacity(window),
        }
    }

    /// Append a ratio; non-finite and zero ratios carry no gain information and are dropped.
    pub fn record(&mut self, ratio: f64) {
        if !ratio.is_finite() || ratio == 0.0 {
            return;
        }
        self.ratios.push_back(ratio);
        while self.ratios.len() > self.window {
            self.ratios.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.ratios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratios.is_empty()
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Enough samples to trust `average()`.
    pub fn is_trained(&self, min_samples: usize) -> bool {
        self.ratios.len() >= min_samples.max(1)
    }

    pub fn average(&self) -> Option<f64> {
        if self.ratios.is_empty() {
            return None;
        }
        Some(self.ratios.iter().sum::<f64>() / self.ratios.len() as f64)
    }

    /// Ratios in insertion order, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.ratios.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_evicts_oldest_first() {
        let mut h = FineCalibrationHistory::new(3);
        for r in [1.0, 2.0, 3.0, 4.0, 5.0] {
            h.record(r);
            assert!(h.len() <= 3);
        }
        assert_eq!(h.iter().collect::<Vec<_>>(), vec![3.0, 4.0, 5.0]);
        assert_eq!(h.average(), Some(4.0));
    }

    #[test]
    fn uninformative_ratios_are_dropped() {
        let mut h = FineCalibrationHistory::new(10);
        h.record(f64::NAN);
        h.record(f64::INFINITY);
        h.record(0.0);
        assert!(h.is_empty());
        assert_eq!(h.average(), None);
    }

    #[test]
    fn trained_after_min_samples() {
        let mut h = FineCalibrationHistory::new(10);
        for _ in 0..9 {
            h.record(-0.1);
        }
        assert!(!h.is_trained(10));
        h.record(-0.1);
        assert!(h.is_trained(10));
    }
}
