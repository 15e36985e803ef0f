//! Default adversarial loss functions.
//!
//! Both losses take discriminator outputs, i.e. the estimated probability
//! that each sample is real training data.

use tch::{Kind, Tensor};

/// Added inside every logarithm so a saturated discriminator cannot
/// produce `log(0)`.
pub const EPSILON: f64 = 1e-10;

/// Generator and discriminator losses for one training step.
pub struct GanLosses {
    /// Total loss minimized by the generators.
    pub generator: Tensor,
    /// Total loss minimized by the discriminators.
    pub discriminator: Tensor,
}

/// Generator loss: `-mean(log(D(G(z)) + ε))`.
///
/// Falls as the discriminator assigns a higher probability of being real
/// to generated samples.
pub fn generator_loss(discrim_output_gen: &Tensor) -> Tensor {
    -(discrim_output_gen + EPSILON).log().mean(Kind::Float)
}

/// Discriminator loss: `-mean(log(D(x) + ε) + log(1 - D(G(z)) + ε))`.
pub fn discriminator_loss(discrim_output_train: &Tensor, discrim_output_gen: &Tensor) -> Tensor {
    let real = (discrim_output_train + EPSILON).log();
    let fake = (discrim_output_gen.neg() + (1.0 + EPSILON)).log();
    -(real + fake).mean(Kind::Float)
}
