//! Sweep plans.

use crate::error::{ControlError, Result};

/// Quantity stepped along by a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepAxis {
    /// Checkpoints and mesh in mA.
    Current,
    /// Checkpoints and mesh in field units (Oe).
    Field,
}

/// Ordered checkpoints with a sampling interval (`mesh`) and a ramp step.
///
/// Checkpoints may repeat or reverse direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepPlan {
    pub axis: SweepAxis,
    pub checkpoints: Vec<i32>,
    pub mesh: i32,
    /// Ramp step between mesh points (mA).
    pub step: i32,
}

impl SweepPlan {
    pub fn current(checkpoints: Vec<i32>, mesh: i32, step: i32) -> Self {
        Self {
            axis: SweepAxis::Current,
            checkpoints,
            mesh,
            step,
        }
    }

    pub fn field(checkpoints: Vec<i32>, mesh: i32, step: i32) -> Self {
        Self {
            axis: SweepAxis::Field,
            checkpoints,
            mesh,
            step,
        }
    }

    /// Current sweep used by the bench: 0 → +5 A → 0 → −5 A → 0, sampled every 500 mA.
    pub fn standard_current() -> Self {
        Self::current(vec![0, 5000, 0, -5000, 0], 500, 100)
    }

    /// Field loop from zero: 0 → +100 → −100 → +100 Oe, sampled every 10 Oe.
    pub fn standard_field() -> Self {
        Self::field(vec![0, 100, -100, 100], 10, 200)
    }

    pub fn validate(&self) -> Result<()> {
        if self.checkpoints.is_empty() {
            return Err(eyre::Report::new(ControlError::Plan("no checkpoints")));
        }
        if self.mesh <= 0 {
            return Err(eyre::Report::new(ControlError::Plan("mesh must be > 0")));
        }
        if self.step <= 0 {
            return Err(eyre::Report::new(ControlError::Plan("step must be > 0")));
        }
        Ok(())
    }

    /// Number of samples the plan produces.
    pub fn sample_count(&self, sample_first: bool) -> usize {
        let mut n = usize::from(sample_first && !self.checkpoints.is_empty());
        for pair in self.checkpoints.windows(2) {
            n += crate::path::transit_points(pair[0], pair[1], self.mesh).len() + 1;
        }
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_current_sample_count() {
        let plan = SweepPlan::standard_current();
        assert_eq!(plan.sample_count(false), 44);
        assert_eq!(plan.sample_count(true), 45);
    }

    #[test]
    fn rejects_degenerate_plans() {
        assert!(SweepPlan::current(vec![], 500, 100).validate().is_err());
        assert!(SweepPlan::current(vec![0, 10], 0, 100).validate().is_err());
        assert!(SweepPlan::current(vec![0, 10], 5, -1).validate().is_err());
        assert!(SweepPlan::current(vec![7, 7], 5, 100).validate().is_ok());
    }
}
