//! Multi-checkpoint sweeps.
//!
//! A plan visits its checkpoints in order. Between two checkpoints the mesh
//! points of the path from the previous checkpoint are visited and sampled,
//! then the checkpoint itself. The first checkpoint is only moved to unless
//! `sample_first_checkpoint` is set.

use chrono::Local;
use helmcoil_traits::Instrument;

use crate::controller::Controller;
use crate::error::{ControlError, Result};
use crate::path::transit_points;
use crate::plan::{SweepAxis, SweepPlan};
use crate::sink::LogSink;
use crate::status::StatusSample;

impl<P: Instrument, G: Instrument> Controller<P, G> {
    /// Run `plan`, forwarding every sample to `sink` and returning them all.
    ///
    /// The output is enabled first; failure to do so aborts before anything
    /// is logged. Once the sink header is written the footer is written too,
    /// whether the sweep completes, is aborted or fails. The abort check is
    /// polled before each leg and yields `ControlError::Aborted`.
    pub fn run_sweep<S: LogSink + ?Sized>(
        &mut self,
        plan: &SweepPlan,
        use_fine: bool,
        sink: &mut S,
        memo: &str,
    ) -> Result<Vec<StatusSample>> {
        plan.validate()?;
        self.set_output(true)?;
        if let Some(range) = self.sensor_cfg.measure_range {
            self.select_sensor_range(range)?;
        }

        self.reset_epoch();
        sink.begin(Local::now(), memo)?;
        tracing::info!(
            axis = ?plan.axis,
            checkpoints = plan.checkpoints.len(),
            mesh = plan.mesh,
            step = plan.step,
            expected = plan.sample_count(self.sweep.sample_first_checkpoint),
            "sweep start"
        );

        let mut samples = Vec::with_capacity(plan.sample_count(self.sweep.sample_first_checkpoint));
        let swept = self.sweep_legs(plan, use_fine, sink, &mut samples);
        let finished = sink.finish(Local::now());
        match swept {
            Ok(()) => {
                finished?;
                tracing::info!(samples = samples.len(), "sweep done");
                Ok(samples)
            }
            Err(e) => {
                if let Err(fe) = finished {
                    tracing::warn!(error = %fe, "log footer not written");
                }
                Err(e)
            }
        }
    }

    fn sweep_legs<S: LogSink + ?Sized>(
        &mut self,
        plan: &SweepPlan,
        use_fine: bool,
        sink: &mut S,
        samples: &mut Vec<StatusSample>,
    ) -> Result<()> {
        let first = plan.checkpoints[0];
        self.move_to(plan, first, use_fine)?;
        if self.sweep.sample_first_checkpoint {
            self.settle_and_sample(plan, sink, samples)?;
        }

        for (i, leg) in plan.checkpoints.windows(2).enumerate() {
            let checkpoint = i + 1;
            if self.abort_requested() {
                tracing::warn!(checkpoint, samples = samples.len(), "sweep aborted");
                return Err(eyre::Report::new(ControlError::Aborted { checkpoint }));
            }
            let (from, to) = (leg[0], leg[1]);
            for point in transit_points(from, to, plan.mesh) {
                self.move_to(plan, point, use_fine)?;
                self.settle_and_sample(plan, sink, samples)?;
            }
            self.move_to(plan, to, use_fine)?;
            self.settle_and_sample(plan, sink, samples)?;
            tracing::info!(checkpoint, value = to, samples = samples.len(), "checkpoint reached");
        }
        Ok(())
    }

    fn move_to(&mut self, plan: &SweepPlan, point: i32, use_fine: bool) -> Result<()> {
        match plan.axis {
            SweepAxis::Current => self.ramp_to(point, plan.step, use_fine)?,
            SweepAxis::Field => self.set_field_with_step(f64::from(point), plan.step)?,
        };
        Ok(())
    }

    fn settle_and_sample<S: LogSink + ?Sized>(
        &mut self,
        plan: &SweepPlan,
        sink: &mut S,
        samples: &mut Vec<StatusSample>,
    ) -> Result<()> {
        let settle = match plan.axis {
            SweepAxis::Current => self.sweep.settle_ms,
            SweepAxis::Field => self.field.settle_ms,
        };
        self.sleep_ms(settle);
        let sample = self.read_status()?;
        sink.record(&sample)?;
        samples.push(sample);
        Ok(())
    }
}
