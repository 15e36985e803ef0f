//! Running loss averages and the training report.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Running sums of generator and discriminator losses between reports.
#[derive(Debug, Clone, Default)]
pub struct LossAverager {
    generator_total: f64,
    generator_steps: usize,
    discriminator_total: f64,
    discriminator_steps: usize,
}

impl LossAverager {
    /// Records the loss of one generator step.
    pub fn record_generator(&mut self, loss: f64) {
        self.generator_total += loss;
        self.generator_steps += 1;
    }

    /// Records the loss of one discriminator step.
    pub fn record_discriminator(&mut self, loss: f64) {
        self.discriminator_total += loss;
        self.discriminator_steps += 1;
    }

    /// Mean generator loss since the last reset; 0 with no steps.
    pub fn generator_mean(&self) -> f64 {
        self.generator_total / self.generator_steps.max(1) as f64
    }

    /// Mean discriminator loss since the last reset; 0 with no steps.
    pub fn discriminator_mean(&self) -> f64 {
        self.discriminator_total / self.discriminator_steps.max(1) as f64
    }

    /// Generator steps since the last reset.
    pub fn generator_steps(&self) -> usize {
        self.generator_steps
    }

    /// Discriminator steps since the last reset.
    pub fn discriminator_steps(&self) -> usize {
        self.discriminator_steps
    }

    /// Clears all sums.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Average losses reported at one point of training.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LossRecord {
    /// Global step at which the averages were reported.
    pub global_step: u64,
    /// Mean generator loss over the reporting window.
    pub generator_loss: f64,
    /// Mean discriminator loss over the reporting window.
    pub discriminator_loss: f64,
}

/// Summary of one call to [`GanTrainer::fit`](super::GanTrainer::fit).
#[derive(Debug, Clone, Default)]
pub struct TrainingReport {
    /// Global step after the last batch.
    pub global_step: u64,
    /// Discriminator steps taken (one per batch).
    pub discriminator_steps: usize,
    /// Generator steps taken.
    pub generator_steps: usize,
    /// Loss averages, one per reporting interval.
    pub history: Vec<LossRecord>,
    /// Checkpoints written, oldest first. Some may since have been pruned.
    pub checkpoints: Vec<PathBuf>,
    /// Wall time spent in `fit`.
    pub elapsed: Duration,
}

impl fmt::Display for TrainingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Training Report (global step {}) ===", self.global_step)?;
        writeln!(f, "  Discriminator steps:  {}", self.discriminator_steps)?;
        writeln!(f, "  Generator steps:      {}", self.generator_steps)?;
        writeln!(f, "  Checkpoints written:  {}", self.checkpoints.len())?;
        if let Some(last) = self.history.last() {
            writeln!(f, "  Last generator loss:      {:.4}", last.generator_loss)?;
            writeln!(f, "  Last discriminator loss:  {:.4}", last.discriminator_loss)?;
        }
        write!(f, "  Elapsed:              {:.3}s", self.elapsed.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averager_means() {
        let mut avg = LossAverager::default();
        avg.record_generator(1.0);
        avg.record_generator(3.0);
        avg.record_discriminator(0.5);
        assert_eq!(avg.generator_mean(), 2.0);
        assert_eq!(avg.discriminator_mean(), 0.5);
        assert_eq!(avg.generator_steps(), 2);
        assert_eq!(avg.discriminator_steps(), 1);
    }

    #[test]
    fn empty_averager_is_zero() {
        let avg = LossAverager::default();
        assert_eq!(avg.generator_mean(), 0.0);
        assert_eq!(avg.discriminator_mean(), 0.0);
    }

    #[test]
    fn reset_clears() {
        let mut avg = LossAverager::default();
        avg.record_generator(1.0);
        avg.record_discriminator(1.0);
        avg.reset();
        assert_eq!(avg.generator_steps(), 0);
        assert_eq!(avg.discriminator_steps(), 0);
    }

    #[test]
    fn report_display() {
        let report = TrainingReport {
            global_step: 10,
            discriminator_steps: 10,
            generator_steps: 5,
            history: vec![LossRecord {
                global_step: 10,
                generator_loss: 0.75,
                discriminator_loss: 1.25,
            }],
            ..TrainingReport::default()
        };
        let text = report.to_string();
        assert!(text.contains("global step 10"));
        assert!(text.contains("Generator steps:      5"));
        assert!(text.contains("0.7500"));
    }
}
