//! Sub-model traits and the architecture factory.

use tch::{nn, Device, Kind, Tensor};

use super::loss;
use crate::config::GanConfig;

/// Maps a batch of noise (plus any conditional inputs) to generated data.
pub trait Generator {
    /// Generates one tensor per data input of the GAN.
    ///
    /// # Arguments
    ///
    /// * `noise` - Noise batch, shape `[batch, ...noise_shape]`
    /// * `conditional` - Conditional inputs, each `[batch, ...]`
    /// * `train` - Whether layers such as dropout run in training mode
    fn generate(&self, noise: &Tensor, conditional: &[Tensor], train: bool) -> Vec<Tensor>;
}

/// Estimates the probability that each sample is real training data.
pub trait Discriminator {
    /// Returns one probability per sample, shaped `[batch]` or `[batch, 1]`.
    fn discriminate(&self, data: &[Tensor], conditional: &[Tensor], train: bool) -> Tensor;
}

/// Builds the generators and discriminators of a GAN.
///
/// Implementors supply the two factories. The noise distribution and the
/// loss functions have defaults suited to conventional GANs and can be
/// overridden for variants.
pub trait GanArchitecture {
    /// Creates one generator whose parameters live under `path`.
    fn create_generator(&self, path: &nn::Path, config: &GanConfig) -> Box<dyn Generator>;

    /// Creates one discriminator whose parameters live under `path`.
    fn create_discriminator(&self, path: &nn::Path, config: &GanConfig)
        -> Box<dyn Discriminator>;

    /// Draws a noise batch of shape `[batch_size, ...noise_shape]`.
    ///
    /// Defaults to a standard normal distribution.
    fn noise_batch(&self, batch_size: i64, config: &GanConfig, device: Device) -> Tensor {
        let mut shape = Vec::with_capacity(config.noise_shape.len() + 1);
        shape.push(batch_size);
        shape.extend_from_slice(&config.noise_shape);
        Tensor::randn(shape.as_slice(), (Kind::Float, device))
    }

    /// Loss minimized by a generator, given the discriminator's output on
    /// its samples.
    fn generator_loss(&self, discrim_output_gen: &Tensor) -> Tensor {
        loss::generator_loss(discrim_output_gen)
    }

    /// Loss minimized by a discriminator, given its outputs on real and
    /// generated samples.
    fn discriminator_loss(
        &self,
        discrim_output_train: &Tensor,
        discrim_output_gen: &Tensor,
    ) -> Tensor {
        loss::discriminator_loss(discrim_output_train, discrim_output_gen)
    }
}
