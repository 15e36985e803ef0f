//! The adversarial model: generators, discriminators and their losses.
//!
//! [`GanModel`] owns every sub-model and the variable stores holding their
//! parameters. Parameters are split across three stores so each training
//! step can update exactly its own share:
//!
//! - `generators`: all generator parameters;
//! - `discriminators`: all discriminator parameters and the
//!   discriminator mixture logits;
//! - `mixture`: the generator mixture logits, updated by both steps.

pub mod loss;
pub mod mixture;
pub mod mlp;
pub mod sampling;
pub mod trait_;

use tch::{nn, Device, Kind, Tensor};
use tracing::debug;

use crate::config::GanConfig;
use crate::error::{GanError, Result};

pub use loss::GanLosses;
pub use mixture::MixtureWeights;
pub use mlp::{MlpArchitecture, MlpDiscriminator, MlpGenerator};
pub use sampling::SampleRequest;
pub use trait_::{Discriminator, GanArchitecture, Generator};

/// Batch size used by the construction-time shape probe.
const PROBE_BATCH: i64 = 2;

/// One batch of training data.
///
/// Every tensor shares the leading batch dimension.
#[derive(Debug)]
pub struct Batch {
    /// Values for the data inputs, in config order.
    pub data: Vec<Tensor>,
    /// Values for the conditional inputs, in config order.
    pub conditional: Vec<Tensor>,
}

impl Batch {
    /// Creates an unconditional batch.
    pub fn new(data: Vec<Tensor>) -> Self {
        Self {
            data,
            conditional: Vec::new(),
        }
    }

    /// Sets the conditional inputs.
    pub fn with_conditional(mut self, conditional: Vec<Tensor>) -> Self {
        self.conditional = conditional;
        self
    }

    /// Leading dimension of the first data tensor.
    pub fn batch_size(&self) -> Option<i64> {
        self.data.first().and_then(leading_dim)
    }

    /// Moves every tensor to `device` as 32-bit floats.
    pub fn prepared(&self, device: Device) -> Self {
        let prepare = |t: &Tensor| t.to_device(device).to_kind(Kind::Float);
        Self {
            data: self.data.iter().map(prepare).collect(),
            conditional: self.conditional.iter().map(prepare).collect(),
        }
    }
}

/// A GAN with one or more generators and discriminators.
pub struct GanModel<A: GanArchitecture> {
    architecture: A,
    config: GanConfig,
    generators: Vec<Box<dyn Generator>>,
    discriminators: Vec<Box<dyn Discriminator>>,
    mixture: Option<MixtureWeights>,
    generator_vs: nn::VarStore,
    discriminator_vs: nn::VarStore,
    mixture_vs: nn::VarStore,
    device: Device,
}

impl<A: GanArchitecture> GanModel<A> {
    /// Builds every sub-model and checks that their shapes agree.
    ///
    /// # Errors
    ///
    /// Returns [`GanError::InvalidConfig`] for an unusable config, and
    /// [`GanError::ShapeMismatch`] when a generator's outputs do not match
    /// the data shapes or a discriminator does not produce one probability
    /// per sample.
    pub fn new(architecture: A, config: GanConfig, device: Device) -> Result<Self> {
        config.validate()?;

        let generator_vs = nn::VarStore::new(device);
        let discriminator_vs = nn::VarStore::new(device);
        let mixture_vs = nn::VarStore::new(device);

        let generators = (0..config.n_generators)
            .map(|i| {
                architecture.create_generator(
                    &(&generator_vs.root() / format!("generator_{i}")),
                    &config,
                )
            })
            .collect();
        let discriminators = (0..config.n_discriminators)
            .map(|i| {
                architecture.create_discriminator(
                    &(&discriminator_vs.root() / format!("discriminator_{i}")),
                    &config,
                )
            })
            .collect();

        let mixture = config.is_mixture().then(|| {
            MixtureWeights::new(
                &(&mixture_vs.root() / "mixture"),
                &(&discriminator_vs.root() / "mixture"),
                config.n_generators,
                config.n_discriminators,
            )
        });

        let model = Self {
            architecture,
            config,
            generators,
            discriminators,
            mixture,
            generator_vs,
            discriminator_vs,
            mixture_vs,
            device,
        };
        model.probe()?;
        debug!(
            n_generators = model.config.n_generators,
            n_discriminators = model.config.n_discriminators,
            ?device,
            "built GAN model"
        );
        Ok(model)
    }

    /// Computes the total generator and discriminator losses for a batch.
    ///
    /// Every generator runs on `noise`; every discriminator scores the real
    /// data and each generator's output. With a single generator and
    /// discriminator the pairwise losses are returned as is, otherwise they
    /// are combined through the mixture weights.
    ///
    /// # Arguments
    ///
    /// * `noise` - Noise batch, shape `[batch, ...noise_shape]`
    /// * `batch` - Real data and conditional inputs
    /// * `train` - Whether sub-models run in training mode
    pub fn losses(&self, noise: &Tensor, batch: &Batch, train: bool) -> Result<GanLosses> {
        let batch_size = self.validate_batch(batch)?;
        self.check_noise(noise, batch_size)?;

        let generated = self
            .generators
            .iter()
            .enumerate()
            .map(|(j, gen)| {
                let outputs = gen.generate(noise, &batch.conditional, train);
                check_inputs(
                    "generator outputs",
                    &format!("generator {j} output"),
                    &outputs,
                    &self.config.data_shapes,
                    batch_size,
                )?;
                Ok(outputs)
            })
            .collect::<Result<Vec<_>>>()?;

        let n_pairs = self.config.n_pairs();
        let mut gen_losses = Vec::with_capacity(n_pairs);
        let mut discrim_losses = Vec::with_capacity(n_pairs);

        for (i, disc) in self.discriminators.iter().enumerate() {
            let real = disc.discriminate(&batch.data, &batch.conditional, train);
            let real = probabilities(i, real, batch_size)?;
            for fake_inputs in &generated {
                let fake = disc.discriminate(fake_inputs, &batch.conditional, train);
                let fake = probabilities(i, fake, batch_size)?;
                gen_losses.push(self.architecture.generator_loss(&fake));
                discrim_losses.push(self.architecture.discriminator_loss(&real, &fake));
            }
        }

        Ok(match &self.mixture {
            Some(mixture) => mixture.combine(&gen_losses, &discrim_losses),
            None => GanLosses {
                generator: gen_losses.swap_remove(0),
                discriminator: discrim_losses.swap_remove(0),
            },
        })
    }

    /// Checks a batch against the config and returns its batch size.
    pub fn validate_batch(&self, batch: &Batch) -> Result<i64> {
        if batch.data.len() != self.config.data_shapes.len() {
            return Err(GanError::InputCount {
                what: "data inputs",
                expected: self.config.data_shapes.len(),
                actual: batch.data.len(),
            });
        }
        if !self.config.conditional_shapes.is_empty() && batch.conditional.is_empty() {
            return Err(GanError::MissingConditionalInputs);
        }

        let batch_size = batch.batch_size().unwrap_or(0);
        if batch_size <= 0 {
            return Err(GanError::InvalidConfig(
                "batches must hold at least one sample".to_string(),
            ));
        }
        check_inputs(
            "data inputs",
            "data input",
            &batch.data,
            &self.config.data_shapes,
            batch_size,
        )?;
        check_inputs(
            "conditional inputs",
            "conditional input",
            &batch.conditional,
            &self.config.conditional_shapes,
            batch_size,
        )?;
        Ok(batch_size)
    }

    /// Draws a fresh noise batch from the architecture's distribution.
    pub fn noise_batch(&self, batch_size: i64) -> Tensor {
        self.architecture
            .noise_batch(batch_size, &self.config, self.device)
    }

    /// Returns the model configuration.
    pub fn config(&self) -> &GanConfig {
        &self.config
    }

    /// Returns the architecture the sub-models were built from.
    pub fn architecture(&self) -> &A {
        &self.architecture
    }

    /// Returns the device holding the parameters.
    pub fn device(&self) -> Device {
        self.device
    }

    /// Number of generators.
    pub fn n_generators(&self) -> usize {
        self.generators.len()
    }

    /// Number of discriminators.
    pub fn n_discriminators(&self) -> usize {
        self.discriminators.len()
    }

    /// Mixture weights, present when the model has more than one
    /// generator or discriminator.
    pub fn mixture(&self) -> Option<&MixtureWeights> {
        self.mixture.as_ref()
    }

    /// Variable store holding the generator parameters.
    pub fn generator_var_store(&self) -> &nn::VarStore {
        &self.generator_vs
    }

    /// Variable store holding the discriminator parameters and
    /// discriminator mixture logits.
    pub fn discriminator_var_store(&self) -> &nn::VarStore {
        &self.discriminator_vs
    }

    /// Variable store holding the generator mixture logits, if the model
    /// has a mixture.
    pub fn mixture_var_store(&self) -> Option<&nn::VarStore> {
        self.mixture.as_ref().map(|_| &self.mixture_vs)
    }

    /// Named variable stores, in the layout used by checkpoints.
    pub fn named_var_stores(&self) -> Vec<(&'static str, &nn::VarStore)> {
        let mut stores = vec![
            ("generators", &self.generator_vs),
            ("discriminators", &self.discriminator_vs),
        ];
        if self.mixture.is_some() {
            stores.push(("mixture", &self.mixture_vs));
        }
        stores
    }

    /// Mutable counterpart of [`named_var_stores`](Self::named_var_stores).
    pub fn named_var_stores_mut(&mut self) -> Vec<(&'static str, &mut nn::VarStore)> {
        let mut stores = vec![
            ("generators", &mut self.generator_vs),
            ("discriminators", &mut self.discriminator_vs),
        ];
        if self.mixture.is_some() {
            stores.push(("mixture", &mut self.mixture_vs));
        }
        stores
    }

    fn check_noise(&self, noise: &Tensor, batch_size: i64) -> Result<()> {
        check_shape(
            "noise".to_string(),
            &with_batch(batch_size, &self.config.noise_shape),
            &noise.size(),
        )
    }

    /// Runs a gradient-free forward pass on zero inputs so shape errors
    /// surface at construction.
    fn probe(&self) -> Result<()> {
        let zeros = |shape: &[i64]| {
            Tensor::zeros(with_batch(PROBE_BATCH, shape).as_slice(), (Kind::Float, self.device))
        };
        let batch = Batch {
            data: self
                .config
                .data_shapes
                .iter()
                .map(|s| zeros(s.as_slice()))
                .collect(),
            conditional: self
                .config
                .conditional_shapes
                .iter()
                .map(|s| zeros(s.as_slice()))
                .collect(),
        };
        let noise = zeros(self.config.noise_shape.as_slice());
        tch::no_grad(|| self.losses(&noise, &batch, false)).map(|_| ())
    }
}

/// Normalizes a discriminator output to shape `[batch]`.
fn probabilities(index: usize, output: Tensor, batch_size: i64) -> Result<Tensor> {
    let size = output.size();
    if size != [batch_size] && size != [batch_size, 1] {
        return Err(GanError::ShapeMismatch {
            what: format!("discriminator {index} output"),
            expected: vec![batch_size],
            actual: size,
        });
    }
    Ok(output.reshape([batch_size]))
}

pub(crate) fn check_inputs(
    what: &'static str,
    label: &str,
    tensors: &[Tensor],
    shapes: &[Vec<i64>],
    batch_size: i64,
) -> Result<()> {
    if tensors.len() != shapes.len() {
        return Err(GanError::InputCount {
            what,
            expected: shapes.len(),
            actual: tensors.len(),
        });
    }
    for (k, (tensor, shape)) in tensors.iter().zip(shapes).enumerate() {
        check_shape(
            format!("{label} {k}"),
            &with_batch(batch_size, shape),
            &tensor.size(),
        )?;
    }
    Ok(())
}

pub(crate) fn check_shape(what: String, expected: &[i64], actual: &[i64]) -> Result<()> {
    if expected != actual {
        return Err(GanError::ShapeMismatch {
            what,
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        });
    }
    Ok(())
}

pub(crate) fn leading_dim(tensor: &Tensor) -> Option<i64> {
    tensor.size().first().copied()
}

fn with_batch(batch_size: i64, shape: &[i64]) -> Vec<i64> {
    let mut full = Vec::with_capacity(shape.len() + 1);
    full.push(batch_size);
    full.extend_from_slice(shape);
    full
}
