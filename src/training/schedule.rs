//! Generator-to-discriminator step ratio.

use crate::error::{GanError, Result};

/// Converts a fractional generator step ratio into whole steps per batch.
///
/// The fractional remainder carries over to later batches: a ratio of
/// `0.5` yields one generator step every two batches, `1.5` alternates
/// between one and two.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorStepSchedule {
    steps_per_batch: f64,
    pending: f64,
}

impl GeneratorStepSchedule {
    /// Creates a schedule performing `steps_per_batch` generator steps per
    /// batch on average.
    ///
    /// # Errors
    ///
    /// Returns [`GanError::InvalidConfig`] for a negative or non-finite
    /// ratio.
    pub fn new(steps_per_batch: f64) -> Result<Self> {
        if !steps_per_batch.is_finite() || steps_per_batch < 0.0 {
            return Err(GanError::InvalidConfig(format!(
                "generator_steps must be a finite non-negative number, got {steps_per_batch}"
            )));
        }
        Ok(Self {
            steps_per_batch,
            pending: 0.0,
        })
    }

    /// Number of generator steps to run for the next batch.
    pub fn steps_for_batch(&mut self) -> usize {
        if self.steps_per_batch == 0.0 {
            return 0;
        }
        self.pending += self.steps_per_batch;
        let steps = self.pending.floor();
        self.pending -= steps;
        steps as usize
    }

    /// Average steps per batch.
    pub fn steps_per_batch(&self) -> f64 {
        self.steps_per_batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(ratio: f64, batches: usize) -> Vec<usize> {
        let mut schedule = GeneratorStepSchedule::new(ratio).unwrap();
        (0..batches).map(|_| schedule.steps_for_batch()).collect()
    }

    #[test]
    fn one_step_per_batch() {
        assert_eq!(run(1.0, 4), vec![1, 1, 1, 1]);
    }

    #[test]
    fn whole_ratio_repeats() {
        assert_eq!(run(2.0, 3), vec![2, 2, 2]);
    }

    #[test]
    fn half_ratio_alternates() {
        assert_eq!(run(0.5, 4), vec![0, 1, 0, 1]);
    }

    #[test]
    fn fraction_accumulates() {
        assert_eq!(run(1.5, 4), vec![1, 2, 1, 2]);
        assert_eq!(run(0.25, 8), vec![0, 0, 0, 1, 0, 0, 0, 1]);
    }

    #[test]
    fn zero_ratio_never_steps() {
        assert_eq!(run(0.0, 3), vec![0, 0, 0]);
    }

    #[test]
    fn invalid_ratios_rejected() {
        assert!(GeneratorStepSchedule::new(-1.0).is_err());
        assert!(GeneratorStepSchedule::new(f64::NAN).is_err());
        assert!(GeneratorStepSchedule::new(f64::INFINITY).is_err());
    }
}
