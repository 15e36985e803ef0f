//! Drawing samples from a trained generator.

use tch::{Kind, Tensor};

use super::{check_inputs, check_shape, leading_dim, GanArchitecture, GanModel};
use crate::error::{GanError, Result};

/// Parameters for [`GanModel::predict_generator`].
///
/// When `noise` or `conditional` inputs are given, the batch size is taken
/// from them and `batch_size` is ignored.
#[derive(Debug)]
pub struct SampleRequest {
    /// Number of samples to draw when no explicit inputs are given.
    pub batch_size: i64,
    /// Explicit noise batch; drawn fresh when `None`.
    pub noise: Option<Tensor>,
    /// Conditional inputs; required if the model has any.
    pub conditional: Vec<Tensor>,
    /// Which generator to sample from.
    pub generator_index: usize,
}

impl SampleRequest {
    /// Requests `batch_size` samples from generator 0 with fresh noise.
    pub fn new(batch_size: i64) -> Self {
        Self {
            batch_size,
            ..Self::default()
        }
    }

    /// Uses the given noise instead of a fresh draw.
    pub fn with_noise(mut self, noise: Tensor) -> Self {
        self.noise = Some(noise);
        self
    }

    /// Sets the conditional inputs.
    pub fn with_conditional(mut self, conditional: Vec<Tensor>) -> Self {
        self.conditional = conditional;
        self
    }

    /// Selects the generator to sample from.
    pub fn with_generator(mut self, generator_index: usize) -> Self {
        self.generator_index = generator_index;
        self
    }
}

impl Default for SampleRequest {
    fn default() -> Self {
        Self {
            batch_size: 1,
            noise: None,
            conditional: Vec::new(),
            generator_index: 0,
        }
    }
}

impl<A: GanArchitecture> GanModel<A> {
    /// Generates a batch of samples in inference mode.
    ///
    /// No gradients are tracked and the returned tensors are detached, one
    /// per data input of the model.
    ///
    /// # Errors
    ///
    /// Returns [`GanError::InvalidGeneratorIndex`] for an unknown
    /// generator, [`GanError::MissingConditionalInputs`] when the model is
    /// conditional and none were given, and [`GanError::ShapeMismatch`]
    /// for inputs that do not fit the config.
    pub fn predict_generator(&self, request: SampleRequest) -> Result<Vec<Tensor>> {
        let SampleRequest {
            batch_size,
            noise,
            conditional,
            generator_index,
        } = request;

        let generator =
            self.generators
                .get(generator_index)
                .ok_or(GanError::InvalidGeneratorIndex {
                    index: generator_index,
                    count: self.generators.len(),
                })?;
        if !self.config.conditional_shapes.is_empty() && conditional.is_empty() {
            return Err(GanError::MissingConditionalInputs);
        }

        let batch_size = noise
            .as_ref()
            .or(conditional.first())
            .and_then(leading_dim)
            .unwrap_or(batch_size);
        if batch_size <= 0 {
            return Err(GanError::InvalidConfig(format!(
                "batch size must be positive, got {batch_size}"
            )));
        }

        let noise = match noise {
            Some(noise) => noise.to_device(self.device).to_kind(Kind::Float),
            None => self.noise_batch(batch_size),
        };
        let mut expected_noise = vec![batch_size];
        expected_noise.extend_from_slice(&self.config.noise_shape);
        check_shape("noise".to_string(), &expected_noise, &noise.size())?;

        let conditional: Vec<Tensor> = conditional
            .iter()
            .map(|c| c.to_device(self.device).to_kind(Kind::Float))
            .collect();
        check_inputs(
            "conditional inputs",
            "conditional input",
            &conditional,
            &self.config.conditional_shapes,
            batch_size,
        )?;

        let outputs = tch::no_grad(|| generator.generate(&noise, &conditional, false));
        check_inputs(
            "generator outputs",
            &format!("generator {generator_index} output"),
            &outputs,
            &self.config.data_shapes,
            batch_size,
        )?;
        Ok(outputs.into_iter().map(|t| t.detach()).collect())
    }
}
