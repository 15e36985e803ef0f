//! Adversarial training loop.
//!
//! Each batch trains the discriminators once, then the generators a
//! configurable number of times. The two sides have separate Adam
//! optimizers so a step only moves its own parameters; the generator
//! mixture logits have a third optimizer that both sides step.

use std::path::PathBuf;
use std::time::Instant;

use tch::nn::{self, OptimizerConfig};
use tracing::{info, warn};

use super::checkpoint::{Checkpoint, CheckpointManager};
use super::progress::{LossAverager, LossRecord, TrainingReport};
use super::schedule::GeneratorStepSchedule;
use crate::error::Result;
use crate::model::{Batch, GanArchitecture, GanModel};

/// Optimizer and persistence settings for a [`GanTrainer`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrainingConfig {
    /// Adam learning rate, shared by all optimizers.
    pub learning_rate: f64,
    /// Adam β₁.
    pub beta1: f64,
    /// Adam β₂.
    pub beta2: f64,
    /// Adam weight decay.
    pub weight_decay: f64,
    /// Directory for checkpoints. Without one, nothing is written.
    pub model_dir: Option<PathBuf>,
    /// Seed for the tch RNG, applied when the trainer is created.
    ///
    /// This seeds the noise drawn during training. Parameters are
    /// initialised when the [`GanModel`] is built, so a fully reproducible
    /// run also calls `tch::manual_seed` before constructing the model.
    pub seed: Option<i64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            learning_rate: 1e-3,
            beta1: 0.9,
            beta2: 0.999,
            weight_decay: 0.0,
            model_dir: None,
            seed: None,
        }
    }
}

/// Options for one call to [`GanTrainer::fit`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FitOptions {
    /// Generator steps per batch. Fractions accumulate across batches:
    /// `2.0` runs two steps every batch, `0.5` one step every two batches.
    pub generator_steps: f64,
    /// Batches between checkpoints and progress reports; 0 disables both.
    pub checkpoint_interval: usize,
    /// Checkpoints retained on disk; 0 keeps all.
    pub max_checkpoints_to_keep: usize,
    /// Restore the latest checkpoint before the first batch.
    pub restore: bool,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            generator_steps: 1.0,
            checkpoint_interval: 1000,
            max_checkpoints_to_keep: 5,
            restore: false,
        }
    }
}

/// Trains a [`GanModel`] by alternating discriminator and generator steps.
pub struct GanTrainer<A: GanArchitecture> {
    model: GanModel<A>,
    config: TrainingConfig,
    generator_opt: nn::Optimizer,
    discriminator_opt: nn::Optimizer,
    mixture_opt: Option<nn::Optimizer>,
    global_step: u64,
}

impl<A: GanArchitecture> GanTrainer<A> {
    /// Creates a trainer and its optimizers.
    ///
    /// # Errors
    ///
    /// Returns an error if tch fails to build an optimizer.
    pub fn new(model: GanModel<A>, config: TrainingConfig) -> Result<Self> {
        if let Some(seed) = config.seed {
            tch::manual_seed(seed);
        }

        let adam = || nn::adam(config.beta1, config.beta2, config.weight_decay);
        let generator_opt = adam().build(model.generator_var_store(), config.learning_rate)?;
        let discriminator_opt =
            adam().build(model.discriminator_var_store(), config.learning_rate)?;
        let mixture_opt = model
            .mixture_var_store()
            .map(|vs| adam().build(vs, config.learning_rate))
            .transpose()?;

        Ok(Self {
            model,
            config,
            generator_opt,
            discriminator_opt,
            mixture_opt,
            global_step: 0,
        })
    }

    /// Trains on every batch of `batches`.
    ///
    /// Per batch: one discriminator step, then the number of generator
    /// steps the `generator_steps` ratio calls for, each with fresh noise.
    /// Every `checkpoint_interval` batches the average losses are logged
    /// and recorded and a checkpoint is written. When the interval is
    /// non-zero a final report and checkpoint follow the last batch.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid `generator_steps` ratio, a batch
    /// that does not match the model, or a failed checkpoint write or
    /// restore.
    pub fn fit<I>(&mut self, batches: I, options: &FitOptions) -> Result<TrainingReport>
    where
        I: IntoIterator<Item = Batch>,
    {
        let mut schedule = GeneratorStepSchedule::new(options.generator_steps)?;
        let checkpoints = self.checkpoint_manager(options.max_checkpoints_to_keep)?;
        if options.checkpoint_interval > 0 && checkpoints.is_none() {
            warn!("checkpoint_interval is set without a model_dir; no checkpoints will be written");
        }
        let mut saved_step = None;
        if options.restore {
            saved_step = self.restore_from(checkpoints.as_ref())?;
        }

        let start = Instant::now();
        let mut averages = LossAverager::default();
        let mut report = TrainingReport::default();

        for batch in batches {
            let batch = batch.prepared(self.model.device());
            let batch_size = self.model.validate_batch(&batch)?;

            let discrim_loss = self.discriminator_step(&batch, batch_size)?;
            averages.record_discriminator(discrim_loss);
            report.discriminator_steps += 1;

            for _ in 0..schedule.steps_for_batch() {
                let gen_loss = self.generator_step(&batch, batch_size)?;
                averages.record_generator(gen_loss);
                report.generator_steps += 1;
            }

            self.global_step += 1;

            if options.checkpoint_interval > 0
                && averages.discriminator_steps() == options.checkpoint_interval
            {
                self.write_checkpoint(checkpoints.as_ref(), &mut report)?;
                saved_step = Some(self.global_step);
                self.record_progress(&averages, &mut report);
                averages.reset();
            }
        }

        if options.checkpoint_interval > 0 {
            if averages.discriminator_steps() > 0 && averages.generator_steps() > 0 {
                self.record_progress(&averages, &mut report);
            }
            if saved_step != Some(self.global_step) {
                self.write_checkpoint(checkpoints.as_ref(), &mut report)?;
            }
        }

        report.global_step = self.global_step;
        report.elapsed = start.elapsed();
        info!(
            global_step = self.global_step,
            elapsed_secs = report.elapsed.as_secs_f64(),
            "model fitting finished"
        );
        Ok(report)
    }

    /// Restores the latest checkpoint from the configured model directory.
    ///
    /// Returns the restored step, or `None` when there is no directory or
    /// no checkpoint in it.
    pub fn restore_latest(&mut self) -> Result<Option<u64>> {
        let checkpoints = self.checkpoint_manager(0)?;
        self.restore_from(checkpoints.as_ref())
    }

    /// Writes a checkpoint for the current global step, keeping at most
    /// `max_checkpoints_to_keep` (0 keeps all).
    ///
    /// Returns `None` when no model directory is configured.
    pub fn save_checkpoint(&self, max_checkpoints_to_keep: usize) -> Result<Option<Checkpoint>> {
        match self.checkpoint_manager(max_checkpoints_to_keep)? {
            Some(manager) => Ok(Some(
                manager.save(self.global_step, &self.model.named_var_stores())?,
            )),
            None => Ok(None),
        }
    }

    /// Returns the model being trained.
    pub fn model(&self) -> &GanModel<A> {
        &self.model
    }

    /// Consumes the trainer and returns the model.
    pub fn into_model(self) -> GanModel<A> {
        self.model
    }

    /// Returns the training configuration.
    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Number of batches trained so far, including restored progress.
    pub fn global_step(&self) -> u64 {
        self.global_step
    }

    fn discriminator_step(&mut self, batch: &Batch, batch_size: i64) -> Result<f64> {
        let noise = self.model.noise_batch(batch_size);
        let losses = self.model.losses(&noise, batch, true)?;

        self.discriminator_opt.zero_grad();
        if let Some(opt) = self.mixture_opt.as_mut() {
            opt.zero_grad();
        }
        losses.discriminator.backward();
        self.discriminator_opt.step();
        if let Some(opt) = self.mixture_opt.as_mut() {
            opt.step();
        }

        Ok(f64::try_from(&losses.discriminator)?)
    }

    fn generator_step(&mut self, batch: &Batch, batch_size: i64) -> Result<f64> {
        let noise = self.model.noise_batch(batch_size);
        let losses = self.model.losses(&noise, batch, true)?;

        self.generator_opt.zero_grad();
        if let Some(opt) = self.mixture_opt.as_mut() {
            opt.zero_grad();
        }
        losses.generator.backward();
        self.generator_opt.step();
        if let Some(opt) = self.mixture_opt.as_mut() {
            opt.step();
        }

        Ok(f64::try_from(&losses.generator)?)
    }

    fn checkpoint_manager(&self, max_to_keep: usize) -> Result<Option<CheckpointManager>> {
        self.config
            .model_dir
            .as_ref()
            .map(|dir| CheckpointManager::new(dir, max_to_keep))
            .transpose()
    }

    fn restore_from(&mut self, checkpoints: Option<&CheckpointManager>) -> Result<Option<u64>> {
        let Some(manager) = checkpoints else {
            warn!("restore requested but no model_dir is configured");
            return Ok(None);
        };
        let Some(checkpoint) = manager.latest()? else {
            warn!(dir = %manager.dir().display(), "no checkpoint to restore, starting fresh");
            return Ok(None);
        };
        manager.restore(&checkpoint, &mut self.model.named_var_stores_mut())?;
        self.global_step = checkpoint.step;
        info!(global_step = checkpoint.step, "restored checkpoint");
        Ok(Some(checkpoint.step))
    }

    fn write_checkpoint(
        &self,
        checkpoints: Option<&CheckpointManager>,
        report: &mut TrainingReport,
    ) -> Result<()> {
        if let Some(manager) = checkpoints {
            let checkpoint = manager.save(self.global_step, &self.model.named_var_stores())?;
            report.checkpoints.push(checkpoint.path);
        }
        Ok(())
    }

    fn record_progress(&self, averages: &LossAverager, report: &mut TrainingReport) {
        let record = LossRecord {
            global_step: self.global_step,
            generator_loss: averages.generator_mean(),
            discriminator_loss: averages.discriminator_mean(),
        };
        info!(
            global_step = record.global_step,
            generator_loss = record.generator_loss,
            discriminator_loss = record.discriminator_loss,
            "training progress"
        );
        report.history.push(record);
    }
}
